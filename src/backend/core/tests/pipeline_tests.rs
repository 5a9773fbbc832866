//! Ledger merge-semantics and ingestion pipeline tests.
//!
//! These run against an in-memory `ReadStore` double that applies the same
//! atomic merge rules as the Postgres store: insert with count 1, otherwise
//! count + 1, last-read = max, shop overwritten only by non-null values.
//! SQL-level behavior is covered separately in `store_pg.rs`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use readlog_core::error::{ErrorCode, LedgerError, Result};
use readlog_core::ingest::{IngestionPipeline, ReadEvent};
use readlog_core::ledger::{LedgerEntry, ReadStore, UpsertRequest};

/// In-memory store with the ledger's merge semantics.
#[derive(Default)]
struct MemStore {
    entries: Mutex<HashMap<String, LedgerEntry>>,
    next_id: AtomicI64,
    /// Upserts for this user fail with `StoreUnavailable`.
    poison_user: Option<String>,
}

impl MemStore {
    fn new() -> Self {
        Self::default()
    }

    fn with_poison(user: &str) -> Self {
        Self {
            poison_user: Some(user.to_string()),
            ..Self::default()
        }
    }

    fn get(&self, user_id: &str) -> Option<LedgerEntry> {
        self.entries.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl ReadStore for MemStore {
    async fn upsert(&self, req: UpsertRequest) -> Result<LedgerEntry> {
        if req.user_id.trim().is_empty() {
            return Err(LedgerError::invalid_input("userid must not be empty"));
        }
        if self.poison_user.as_deref() == Some(req.user_id.as_str()) {
            return Err(LedgerError::store_unavailable("injected failure"));
        }

        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(req.user_id.clone())
            .and_modify(|e| {
                e.read_count += 1;
                e.last_read_time = e.last_read_time.max(req.event_time);
                if req.shop_id.is_some() {
                    e.shop_id = req.shop_id.clone();
                }
                e.source = req.source.clone();
            })
            .or_insert_with(|| LedgerEntry {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                user_id: req.user_id.clone(),
                shop_id: req.shop_id.clone(),
                read_time: req.event_time,
                read_count: 1,
                last_read_time: req.event_time,
                source: req.source.clone(),
            });

        Ok(entry.clone())
    }
}

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn event(user: Option<&str>, shop: Option<&str>, t: Option<DateTime<Utc>>) -> ReadEvent {
    ReadEvent {
        user_id: user.map(str::to_string),
        shop_id: shop.map(str::to_string),
        timestamp: t,
    }
}

// ── Store merge semantics ───────────────────────────────────────────────────

#[tokio::test]
async fn n_upserts_yield_count_n() {
    let store = MemStore::new();
    for i in 0..7 {
        let entry = store
            .upsert(UpsertRequest::new("u1", None, ts(i), "test"))
            .await
            .unwrap();
        assert_eq!(entry.read_count, i as i32 + 1);
    }
    assert_eq!(store.get("u1").unwrap().read_count, 7);
}

#[tokio::test]
async fn last_read_time_is_max_of_event_times() {
    let store = MemStore::new();
    for secs in [30, 10, 50, 20] {
        store
            .upsert(UpsertRequest::new("u1", None, ts(secs), "test"))
            .await
            .unwrap();
    }
    let entry = store.get("u1").unwrap();
    assert_eq!(entry.last_read_time, ts(50));
    // First read stays at the creation-time event.
    assert_eq!(entry.read_time, ts(30));
}

#[tokio::test]
async fn shop_id_overwritten_only_by_non_null() {
    let store = MemStore::new();

    let e = store
        .upsert(UpsertRequest::new("u1", Some("s1".into()), ts(0), "test"))
        .await
        .unwrap();
    assert_eq!((e.read_count, e.shop_id.as_deref()), (1, Some("s1")));
    assert_eq!(e.last_read_time, ts(0));

    let e = store
        .upsert(UpsertRequest::new("u1", Some("s2".into()), ts(1), "test"))
        .await
        .unwrap();
    assert_eq!((e.read_count, e.shop_id.as_deref()), (2, Some("s2")));
    assert_eq!(e.last_read_time, ts(1));

    let e = store
        .upsert(UpsertRequest::new("u1", None, ts(2), "test"))
        .await
        .unwrap();
    assert_eq!((e.read_count, e.shop_id.as_deref()), (3, Some("s2")));
    assert_eq!(e.last_read_time, ts(2));
}

#[tokio::test]
async fn empty_user_id_rejected() {
    let store = MemStore::new();
    let err = store
        .upsert(UpsertRequest::new("  ", None, ts(0), "test"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);
}

#[tokio::test]
async fn concurrent_upserts_converge_without_lost_updates() {
    let store = Arc::new(MemStore::new());

    let mut handles = Vec::new();
    for i in 0..50i64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .upsert(UpsertRequest::new("hot", None, ts(i), "test"))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let entry = store.get("hot").unwrap();
    assert_eq!(entry.read_count, 50);
    assert_eq!(entry.last_read_time, ts(49));
}

// ── Ingestion pipeline ──────────────────────────────────────────────────────

#[tokio::test]
async fn missing_user_id_fails_item_not_batch() {
    let store = Arc::new(MemStore::new());
    let pipeline = IngestionPipeline::new(store.clone(), "test");

    let report = pipeline
        .ingest(vec![
            event(Some("a"), None, Some(ts(0))),
            event(None, Some("x"), Some(ts(0))),
        ])
        .await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].index, 1);
    assert_eq!(report.errors[0].code, ErrorCode::InvalidInput);
    assert!(store.get("a").is_some());
}

#[tokio::test]
async fn repeated_user_in_one_batch_increments_each_time() {
    let store = Arc::new(MemStore::new());
    let pipeline = IngestionPipeline::new(store.clone(), "test");

    let report = pipeline
        .ingest(vec![
            event(Some("u1"), Some("s1"), Some(ts(0))),
            event(Some("u1"), None, Some(ts(1))),
            event(Some("u1"), None, Some(ts(2))),
        ])
        .await;

    assert_eq!(report.succeeded, 3);
    assert_eq!(store.get("u1").unwrap().read_count, 3);
}

#[tokio::test]
async fn missing_timestamp_defaults_to_ingest_time() {
    let store = Arc::new(MemStore::new());
    let pipeline = IngestionPipeline::new(store.clone(), "test");

    let before = Utc::now() - Duration::seconds(1);
    pipeline.ingest(vec![event(Some("u1"), None, None)]).await;
    let after = Utc::now() + Duration::seconds(1);

    let entry = store.get("u1").unwrap();
    assert!(entry.last_read_time > before && entry.last_read_time < after);
    assert_eq!(entry.read_time, entry.last_read_time);
}

#[tokio::test]
async fn store_failure_does_not_abort_siblings() {
    let store = Arc::new(MemStore::with_poison("bad"));
    let pipeline = IngestionPipeline::new(store.clone(), "test");

    let report = pipeline
        .ingest(vec![
            event(Some("good1"), None, Some(ts(0))),
            event(Some("bad"), None, Some(ts(0))),
            event(Some("good2"), None, Some(ts(0))),
        ])
        .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors[0].code, ErrorCode::StoreUnavailable);
    assert_eq!(report.errors[0].user_id.as_deref(), Some("bad"));
    assert!(store.get("good1").is_some());
    assert!(store.get("good2").is_some());
}

#[tokio::test]
async fn empty_batch_yields_empty_report() {
    let store = Arc::new(MemStore::new());
    let pipeline = IngestionPipeline::new(store, "test");

    let report = pipeline.ingest(Vec::new()).await;
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed, 0);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn source_tag_stamped_on_entries() {
    let store = Arc::new(MemStore::new());
    let pipeline = IngestionPipeline::new(store.clone(), "batch_job");

    pipeline
        .ingest(vec![event(Some("u1"), None, Some(ts(0)))])
        .await;

    assert_eq!(store.get("u1").unwrap().source, "batch_job");
}
