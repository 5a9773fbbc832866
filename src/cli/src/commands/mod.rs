//! CLI command implementations.

pub mod config;
pub mod fetch;
pub mod health;
pub mod logs;
pub mod purge;
pub mod stats;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One ledger entry as returned by the API.
#[derive(Debug, Deserialize, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: String,
    #[serde(default)]
    pub shop_id: Option<String>,
    pub read_time: chrono::DateTime<chrono::Utc>,
    pub read_count: i32,
    pub last_read_time: chrono::DateTime<chrono::Utc>,
    pub source: String,
}

/// Table row for ledger entry listings.
#[derive(Debug, Deserialize, Serialize, Tabled)]
pub struct EntryRow {
    #[tabled(rename = "User")]
    pub user_id: String,
    #[tabled(rename = "Shop")]
    pub shop_id: String,
    #[tabled(rename = "Reads")]
    pub read_count: i32,
    #[tabled(rename = "First Read")]
    pub first_read: String,
    #[tabled(rename = "Last Read")]
    pub last_read: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

impl From<LedgerEntry> for EntryRow {
    fn from(e: LedgerEntry) -> Self {
        Self {
            user_id: e.user_id,
            shop_id: e.shop_id.unwrap_or_else(|| "-".to_string()),
            read_count: e.read_count,
            first_read: e.read_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            last_read: e.last_read_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            source: e.source,
        }
    }
}

/// Per-batch ingestion outcome as returned by the API.
#[derive(Debug, Deserialize, Serialize)]
pub struct IngestReport {
    pub succeeded: usize,
    pub failed: usize,
    #[serde(default)]
    pub errors: Vec<IngestFailure>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IngestFailure {
    pub index: usize,
    #[serde(default)]
    pub user_id: Option<String>,
    pub code: String,
    pub reason: String,
}
