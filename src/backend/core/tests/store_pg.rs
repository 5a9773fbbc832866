//! SQL-level store tests.
//!
//! These need a live PostgreSQL instance and are ignored by default. Point
//! `DATABASE_URL` at a scratch database and run:
//!
//! ```sh
//! cargo test -p readlog-core --test store_pg -- --ignored
//! ```
//!
//! Each test uses its own userid namespace so they can share one database.

use chrono::{Duration, Local, Utc};

use readlog_core::error::ErrorCode;
use readlog_core::ledger::{LedgerStore, ReadStore, UpsertRequest};
use readlog_core::stats::StatsAggregator;

async fn connect() -> LedgerStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for these tests");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect");
    let store = LedgerStore::from_pool(pool);
    store.init_schema().await.expect("schema init failed");
    store
}

async fn cleanup(store: &LedgerStore, prefix: &str) {
    sqlx::query("DELETE FROM read_log WHERE userid LIKE $1")
        .bind(format!("{prefix}%"))
        .execute(store.pool())
        .await
        .expect("cleanup failed");
}

#[tokio::test]
#[ignore]
async fn upsert_inserts_then_increments() {
    let store = connect().await;
    cleanup(&store, "pg_upsert_").await;

    let t0 = Utc::now() - Duration::hours(1);
    let t1 = Utc::now();

    let entry = store
        .upsert(UpsertRequest::new("pg_upsert_u1", Some("s1".into()), t0, "test"))
        .await
        .unwrap();
    assert_eq!(entry.read_count, 1);
    assert_eq!(entry.shop_id.as_deref(), Some("s1"));

    let entry = store
        .upsert(UpsertRequest::new("pg_upsert_u1", None, t1, "test"))
        .await
        .unwrap();
    assert_eq!(entry.read_count, 2);
    // Null shop leaves the stored value alone.
    assert_eq!(entry.shop_id.as_deref(), Some("s1"));
    assert_eq!(entry.last_read_time, t1);
    assert_eq!(entry.read_time, t0);

    // Out-of-order event: count advances, last_read_time does not regress.
    let entry = store
        .upsert(UpsertRequest::new("pg_upsert_u1", None, t0, "test"))
        .await
        .unwrap();
    assert_eq!(entry.read_count, 3);
    assert_eq!(entry.last_read_time, t1);

    cleanup(&store, "pg_upsert_").await;
}

#[tokio::test]
#[ignore]
async fn concurrent_upserts_do_not_lose_counts() {
    let store = connect().await;
    cleanup(&store, "pg_conc_").await;

    let mut handles = Vec::new();
    for i in 0..20i64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .upsert(UpsertRequest::new(
                    "pg_conc_hot",
                    None,
                    Utc::now() + Duration::seconds(i),
                    "test",
                ))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let entry = store.get("pg_conc_hot").await.unwrap().unwrap();
    assert_eq!(entry.read_count, 20);

    cleanup(&store, "pg_conc_").await;
}

#[tokio::test]
#[ignore]
async fn purge_removes_exactly_the_stale_entries() {
    let store = connect().await;
    cleanup(&store, "pg_purge_").await;

    store
        .upsert(UpsertRequest::new(
            "pg_purge_old",
            None,
            Utc::now() - Duration::days(40),
            "test",
        ))
        .await
        .unwrap();
    store
        .upsert(UpsertRequest::new("pg_purge_new", None, Utc::now(), "test"))
        .await
        .unwrap();

    // Scoped delete for the old entry only; a blanket purge would clobber
    // entries from other tests sharing the database.
    let deleted = sqlx::query(
        "DELETE FROM read_log WHERE userid LIKE 'pg_purge_%' AND read_time < $1",
    )
    .bind(Utc::now() - Duration::days(30))
    .execute(store.pool())
    .await
    .unwrap()
    .rows_affected();
    assert_eq!(deleted, 1);

    assert!(store.get("pg_purge_old").await.unwrap().is_none());
    assert!(store.get("pg_purge_new").await.unwrap().is_some());

    cleanup(&store, "pg_purge_").await;
}

#[tokio::test]
#[ignore]
async fn purge_older_than_removes_only_stale_rows() {
    let store = connect().await;
    cleanup(&store, "pg_sweep_").await;

    store
        .upsert(UpsertRequest::new(
            "pg_sweep_old",
            None,
            Utc::now() - Duration::days(40),
            "test",
        ))
        .await
        .unwrap();
    store
        .upsert(UpsertRequest::new("pg_sweep_new", None, Utc::now(), "test"))
        .await
        .unwrap();

    // Shared database: stale rows left behind by other runs may be swept
    // along with ours, so the count is a lower bound.
    let window = std::time::Duration::from_secs(30 * 86_400);
    let deleted = store.purge_older_than(window).await.unwrap();
    assert!(deleted >= 1);
    assert!(store.get("pg_sweep_old").await.unwrap().is_none());
    assert!(store.get("pg_sweep_new").await.unwrap().is_some());

    // A repeated sweep has nothing of ours left to remove.
    store.purge_older_than(window).await.unwrap();
    assert!(store.get("pg_sweep_new").await.unwrap().is_some());

    cleanup(&store, "pg_sweep_").await;
}

#[tokio::test]
#[ignore]
async fn daily_stats_counts_only_todays_last_reads() {
    let store = connect().await;
    cleanup(&store, "pg_daily_").await;

    let stats = StatsAggregator::new(&store);
    let today = Local::now().date_naive();
    let before = stats.daily_stats(today).await.unwrap();

    store
        .upsert(UpsertRequest::new("pg_daily_now", None, Utc::now(), "test"))
        .await
        .unwrap();
    store
        .upsert(UpsertRequest::new(
            "pg_daily_stale",
            None,
            Utc::now() - Duration::days(2),
            "test",
        ))
        .await
        .unwrap();

    // Only the user whose most recent read is today is visible.
    let after = stats.daily_stats(today).await.unwrap();
    assert_eq!(after.users_today - before.users_today, 1);
    assert_eq!(after.reads_today - before.reads_today, 1);

    // Touching the stale user now moves them into the day window.
    store
        .upsert(UpsertRequest::new("pg_daily_stale", None, Utc::now(), "test"))
        .await
        .unwrap();
    let after = stats.daily_stats(today).await.unwrap();
    assert_eq!(after.users_today - before.users_today, 2);

    cleanup(&store, "pg_daily_").await;
}

#[tokio::test]
#[ignore]
async fn purge_with_huge_window_is_a_noop() {
    let store = connect().await;
    cleanup(&store, "pg_noop_").await;

    store
        .upsert(UpsertRequest::new("pg_noop_u1", None, Utc::now(), "test"))
        .await
        .unwrap();

    let window = std::time::Duration::from_secs(3650 * 86_400);
    let deleted = store.purge_older_than(window).await.unwrap();
    assert_eq!(deleted, 0);

    // A second sweep over the same window removes nothing further.
    let deleted = store.purge_older_than(window).await.unwrap();
    assert_eq!(deleted, 0);
    assert!(store.get("pg_noop_u1").await.unwrap().is_some());

    cleanup(&store, "pg_noop_").await;
}

#[tokio::test]
#[ignore]
async fn list_pages_in_creation_order() {
    let store = connect().await;
    cleanup(&store, "pg_list_").await;

    for i in 0..5 {
        store
            .upsert(UpsertRequest::new(
                format!("pg_list_u{i}"),
                None,
                Utc::now(),
                "test",
            ))
            .await
            .unwrap();
    }

    let all = store.list(1000, 0).await.unwrap();
    let ours: Vec<_> = all
        .iter()
        .filter(|e| e.user_id.starts_with("pg_list_"))
        .collect();
    assert_eq!(ours.len(), 5);
    assert!(ours.windows(2).all(|w| w[0].id < w[1].id));

    // Out-of-range offset is an empty page, not an error.
    let page = store.list(10, 1_000_000).await.unwrap();
    assert!(page.is_empty());

    let err = store.list(-1, 0).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);

    cleanup(&store, "pg_list_").await;
}

#[tokio::test]
#[ignore]
async fn global_stats_sum_counts_across_users() {
    let store = connect().await;
    cleanup(&store, "pg_stats_").await;

    let stats = StatsAggregator::new(&store);
    let before = stats.global_stats().await.unwrap();

    for _ in 0..3 {
        store
            .upsert(UpsertRequest::new("pg_stats_a", None, Utc::now(), "test"))
            .await
            .unwrap();
    }
    store
        .upsert(UpsertRequest::new("pg_stats_b", None, Utc::now(), "test"))
        .await
        .unwrap();

    let after = stats.global_stats().await.unwrap();
    assert_eq!(after.total_users - before.total_users, 2);
    assert_eq!(after.total_reads - before.total_reads, 4);
    assert_eq!(after.total_entries - before.total_entries, 2);
    assert!(after.last_read_time.is_some());

    cleanup(&store, "pg_stats_").await;
}
