//! Batch ingestion of candidate read events.
//!
//! The pipeline feeds each event to the ledger's upsert and tracks per-item
//! outcomes. One bad event never aborts its siblings: validation failures and
//! store failures alike are captured in the report and the loop continues.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ErrorCode, Result};
use crate::ledger::{ReadStore, UpsertRequest};
use crate::source::{ContentSource, SourceRecord};

/// One candidate read event, as supplied by callers or the source dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadEvent {
    /// User identifier; events without one are counted as failed, the
    /// deserialization itself does not reject them.
    #[serde(default, alias = "userid")]
    pub user_id: Option<String>,
    #[serde(default, alias = "shopid")]
    pub shop_id: Option<String>,
    /// Event time; defaults to the pipeline's current time when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<SourceRecord> for ReadEvent {
    fn from(record: SourceRecord) -> Self {
        Self {
            user_id: record.user_id,
            shop_id: record.shop_id,
            timestamp: None,
        }
    }
}

/// Why one event in a batch failed.
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    /// Position of the event within the submitted batch.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub code: ErrorCode,
    pub reason: String,
}

/// Per-batch outcome summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub succeeded: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<IngestFailure>,
}

/// Drives batches of read events into a [`ReadStore`].
pub struct IngestionPipeline<S> {
    store: S,
    source_tag: String,
}

impl<S: ReadStore> IngestionPipeline<S> {
    pub fn new(store: S, source_tag: impl Into<String>) -> Self {
        Self {
            store,
            source_tag: source_tag.into(),
        }
    }

    /// Upsert every event in the batch, one increment per event.
    ///
    /// Repeated user identifiers within one batch are not deduplicated; each
    /// occurrence increments the counter, consistent with repeated upserts.
    /// The report is always produced, even when every event fails.
    pub async fn ingest(&self, events: Vec<ReadEvent>) -> IngestReport {
        let now = Utc::now();
        let mut report = IngestReport::default();

        for (index, event) in events.into_iter().enumerate() {
            let user_id = match event.user_id {
                Some(ref id) if !id.trim().is_empty() => id.clone(),
                other => {
                    debug!(index, "Skipping event without userid");
                    report.failed += 1;
                    report.errors.push(IngestFailure {
                        index,
                        user_id: other,
                        code: ErrorCode::InvalidInput,
                        reason: "userid is missing or empty".to_string(),
                    });
                    continue;
                }
            };

            let req = UpsertRequest::new(
                &user_id,
                event.shop_id,
                event.timestamp.unwrap_or(now),
                &self.source_tag,
            );

            match self.store.upsert(req).await {
                Ok(entry) => {
                    debug!(
                        user_id = %entry.user_id,
                        read_count = entry.read_count,
                        "Recorded read activity"
                    );
                    report.succeeded += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    report.errors.push(IngestFailure {
                        index,
                        user_id: Some(user_id),
                        code: e.code(),
                        reason: e.user_message().to_string(),
                    });
                }
            }
        }

        counter!("readlog_ingest_events_total", "outcome" => "succeeded")
            .increment(report.succeeded as u64);
        counter!("readlog_ingest_events_total", "outcome" => "failed")
            .increment(report.failed as u64);
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            source = %self.source_tag,
            "Ingested read-activity batch"
        );

        report
    }

    /// Pull one page from the source dataset and ingest it.
    ///
    /// A failed fetch propagates; retrying the page is the caller's call.
    pub async fn ingest_from_source(
        &self,
        source: &ContentSource,
        limit: i64,
        offset: i64,
    ) -> Result<IngestReport> {
        let records = source.fetch_page(limit, offset).await?;
        let events = records.into_iter().map(ReadEvent::from).collect();
        Ok(self.ingest(events).await)
    }
}
