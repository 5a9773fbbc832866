//! Content Source collaborator: paged reads over the source dataset.
//!
//! The source table lives in the same database as the ledger, so the reader
//! shares the store's pool. Its only contract is `fetch_page(limit, offset)`;
//! pagination policy and retries belong to the caller.

use serde::Serialize;
use sqlx::PgPool;

use crate::config::SourceConfig;
use crate::error::{LedgerError, Result};
use crate::ledger::LedgerStore;

/// One candidate user record from the source dataset.
///
/// `user_id` is optional because the source view can contain rows without
/// one; the ingestion pipeline counts those as failed events.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SourceRecord {
    pub user_id: Option<String>,
    pub shop_id: Option<String>,
}

/// Paged reader over the configured source table.
#[derive(Clone)]
pub struct ContentSource {
    pool: PgPool,
    table: String,
}

impl ContentSource {
    /// Build a reader over `cfg.table`, sharing the store's pool.
    ///
    /// The table name is interpolated into queries, so it must be a bare SQL
    /// identifier; anything else is rejected up front.
    pub fn new(store: &LedgerStore, cfg: &SourceConfig) -> Result<Self> {
        if !is_bare_identifier(&cfg.table) {
            return Err(LedgerError::configuration(format!(
                "source table is not a valid identifier: {:?}",
                cfg.table
            )));
        }

        Ok(Self {
            pool: store.pool().clone(),
            table: cfg.table.clone(),
        })
    }

    /// Fetch one page of source records in table order.
    pub async fn fetch_page(&self, limit: i64, offset: i64) -> Result<Vec<SourceRecord>> {
        if limit < 0 || offset < 0 {
            return Err(LedgerError::invalid_input(
                "limit and offset must be non-negative",
            ));
        }

        let records = sqlx::query_as::<_, SourceRecord>(&format!(
            "SELECT userid AS user_id, shopid AS shop_id FROM {} LIMIT $1 OFFSET $2",
            self.table
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
