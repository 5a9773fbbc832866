//! Read-activity ledger backed by PostgreSQL.
//!
//! One row per distinct user identifier in the `read_log` table. All writes
//! funnel through [`ReadStore::upsert`]; the insert-or-increment is a single
//! `INSERT ... ON CONFLICT` statement so concurrent upserts for the same
//! user never lose counts. Entries are removed only by
//! [`LedgerStore::purge_older_than`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{LedgerError, Result};

/// Source tag stamped on entries written through the HTTP API.
pub const SOURCE_API: &str = "http_api";
/// Source tag stamped on entries written through the CLI path.
pub const SOURCE_CLI: &str = "cli";

/// One persisted ledger row.
///
/// `read_time` is the first occurrence and never changes after creation;
/// `last_read_time` is monotonically non-decreasing.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: String,
    pub shop_id: Option<String>,
    pub read_time: DateTime<Utc>,
    pub read_count: i32,
    pub last_read_time: DateTime<Utc>,
    pub source: String,
}

/// Input to a single upsert.
#[derive(Debug, Clone)]
pub struct UpsertRequest {
    pub user_id: String,
    pub shop_id: Option<String>,
    pub event_time: DateTime<Utc>,
    pub source: String,
}

impl UpsertRequest {
    pub fn new(
        user_id: impl Into<String>,
        shop_id: Option<String>,
        event_time: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            shop_id,
            event_time,
            source: source.into(),
        }
    }
}

/// Write seam for the ledger.
///
/// The ingestion pipeline only needs the upsert contract, so it is generic
/// over this trait; tests exercise it against an in-memory double with the
/// same merge semantics.
#[async_trait]
pub trait ReadStore: Send + Sync {
    /// Insert a new entry (`read_count = 1`, both timestamps = event time)
    /// or atomically merge into the existing one: `read_count += 1`,
    /// `last_read_time = max(last_read_time, event_time)`, `shop_id`
    /// overwritten only by a non-null value. Returns post-upsert state.
    async fn upsert(&self, req: UpsertRequest) -> Result<LedgerEntry>;
}

#[async_trait]
impl<S: ReadStore + ?Sized> ReadStore for std::sync::Arc<S> {
    async fn upsert(&self, req: UpsertRequest) -> Result<LedgerEntry> {
        (**self).upsert(req).await
    }
}

const SELECT_COLUMNS: &str =
    "id, userid AS user_id, shopid AS shop_id, read_time, read_count, last_read_time, source";

/// Postgres-backed ledger store.
#[derive(Clone)]
pub struct LedgerStore {
    pool: PgPool,
}

impl LedgerStore {
    /// Connect a new pool using the given configuration.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .min_connections(cfg.min_connections)
            .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
            .connect(&cfg.url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests, shared collaborators).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `read_log` table and its indexes if they do not exist.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS read_log (
                id              BIGSERIAL PRIMARY KEY,
                userid          VARCHAR(255) NOT NULL,
                shopid          VARCHAR(255),
                read_time       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                read_count      INTEGER NOT NULL DEFAULT 1,
                last_read_time  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                source          VARCHAR(50) NOT NULL DEFAULT 'http_api',
                CONSTRAINT read_log_userid_key UNIQUE (userid)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_read_log_userid ON read_log (userid)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_read_log_read_time ON read_log (read_time)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Connectivity probe.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Point lookup by user identifier. `Ok(None)` is a miss, not an error.
    pub async fn get(&self, user_id: &str) -> Result<Option<LedgerEntry>> {
        let entry = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {SELECT_COLUMNS} FROM read_log WHERE userid = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Paged listing in creation order. An out-of-range offset yields an
    /// empty page.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<LedgerEntry>> {
        if limit < 0 || offset < 0 {
            return Err(LedgerError::invalid_input(
                "limit and offset must be non-negative",
            ));
        }

        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {SELECT_COLUMNS} FROM read_log ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Remove every entry whose first read is older than `now - max_age`.
    ///
    /// One bulk statement; returns the number of rows removed. Safe to run
    /// concurrently with upserts.
    pub async fn purge_older_than(&self, max_age: Duration) -> Result<u64> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).map_err(|e| {
                LedgerError::invalid_input(format!("retention window out of range: {e}"))
            })?;

        let result = sqlx::query("DELETE FROM read_log WHERE read_time < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        counter!("readlog_purged_entries_total").increment(removed);
        tracing::info!(removed, %cutoff, "Purged stale ledger entries");
        Ok(removed)
    }
}

#[async_trait]
impl ReadStore for LedgerStore {
    async fn upsert(&self, req: UpsertRequest) -> Result<LedgerEntry> {
        if req.user_id.trim().is_empty() {
            return Err(LedgerError::invalid_input("userid must not be empty"));
        }

        // Single conditional write keyed on the userid uniqueness constraint;
        // a read-then-write here would lose counts under concurrency.
        let entry = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            INSERT INTO read_log (userid, shopid, read_time, read_count, last_read_time, source)
            VALUES ($1, $2, $3, 1, $3, $4)
            ON CONFLICT (userid) DO UPDATE SET
                read_count = read_log.read_count + 1,
                last_read_time = GREATEST(read_log.last_read_time, EXCLUDED.last_read_time),
                shopid = COALESCE(EXCLUDED.shopid, read_log.shopid),
                source = EXCLUDED.source
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(&req.user_id)
        .bind(&req.shop_id)
        .bind(req.event_time)
        .bind(&req.source)
        .fetch_one(&self.pool)
        .await?;

        counter!("readlog_upserts_total").increment(1);
        Ok(entry)
    }
}
