//! Aggregate statistics over the ledger.
//!
//! Both queries read the store's committed snapshot; counts only grow, so a
//! slightly stale view relative to concurrent writers is acceptable.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::error::Result;
use crate::ledger::LedgerStore;

/// Whole-ledger aggregates. Numeric fields are zero and timestamps `None`
/// when the ledger is empty; an empty ledger is never an error.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    pub total_users: i64,
    pub total_reads: i64,
    pub total_entries: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_read_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_read_time: Option<DateTime<Utc>>,
}

/// Aggregates restricted to one calendar day.
///
/// A user counts as "today" only if their *most recent* read falls on the
/// day; earlier touches on the same day by since-updated users are not
/// visible in the single-timestamp schema.
#[derive(Debug, Clone, Serialize)]
pub struct DailyStats {
    pub users_today: i64,
    pub reads_today: i64,
}

/// Computes statistics directly from the ledger's current state.
#[derive(Clone)]
pub struct StatsAggregator {
    pool: PgPool,
}

impl StatsAggregator {
    pub fn new(store: &LedgerStore) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Global aggregates in a single query.
    pub async fn global_stats(&self) -> Result<GlobalStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(DISTINCT userid)        AS total_users,
                COALESCE(SUM(read_count), 0)  AS total_reads,
                COUNT(*)                      AS total_entries,
                MIN(read_time)                AS first_read_time,
                MAX(last_read_time)           AS last_read_time
            FROM read_log
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(GlobalStats {
            total_users: row.get("total_users"),
            total_reads: row.get("total_reads"),
            total_entries: row.get("total_entries"),
            first_read_time: row.get("first_read_time"),
            last_read_time: row.get("last_read_time"),
        })
    }

    /// Aggregates for entries whose last read falls on `date` in the
    /// server's local calendar.
    pub async fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        let (start, end) = local_day_bounds(date);

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(DISTINCT userid)        AS users_today,
                COALESCE(SUM(read_count), 0)  AS reads_today
            FROM read_log
            WHERE last_read_time >= $1 AND last_read_time < $2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(DailyStats {
            users_today: row.get("users_today"),
            reads_today: row.get("reads_today"),
        })
    }
}

/// Half-open UTC bounds `[start, end)` of a local calendar day.
///
/// The range form keeps the timestamp comparison index-friendly, unlike
/// `DATE(last_read_time) = $1`.
fn local_day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let to_utc = |naive: chrono::NaiveDateTime| {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            // Fall back to treating the wall time as UTC if the local zone
            // skips it (DST gap).
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    };

    let start = date.and_time(NaiveTime::MIN);
    let end = start + ChronoDuration::days(1);
    (to_utc(start), to_utc(end))
}
