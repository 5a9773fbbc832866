//! # Readlog Core
//!
//! Durable read-activity ledger: one row per user identifier tracking
//! how many times that user read shop content, when it first and last
//! happened, and the most recently observed shop.
//!
//! ## Architecture
//!
//! - **Ledger**: Postgres-backed store with an atomic insert-or-increment upsert
//! - **Stats**: global and per-day aggregates computed over the ledger snapshot
//! - **Ingest**: batch pipeline feeding candidate read events into the ledger
//! - **Source**: paged reader over the external source dataset
//! - **Retention**: interval-driven pruning of entries past their age window
//! - **Api**: axum HTTP surface with CORS, tracing, and compression
//! - **Observability**: structured logging, optional OTLP export, Prometheus metrics

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod observability;
pub mod retention;
pub mod source;
pub mod stats;

pub use error::{ErrorCode, LedgerError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, RetentionConfig, SourceConfig};
    pub use crate::error::{ErrorCode, LedgerError, Result};
    pub use crate::ingest::{IngestReport, IngestionPipeline, ReadEvent};
    pub use crate::ledger::{LedgerEntry, LedgerStore, ReadStore, UpsertRequest};
    pub use crate::source::{ContentSource, SourceRecord};
    pub use crate::stats::{DailyStats, GlobalStats, StatsAggregator};
}
