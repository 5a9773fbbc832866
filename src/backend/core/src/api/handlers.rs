//! API request handlers.
//!
//! All fallible handlers return `Result<impl IntoResponse, LedgerError>`;
//! errors are converted to status codes by `LedgerError`'s `IntoResponse`.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Local, Utc};
use metrics::gauge;
use serde::Deserialize;

use super::{ApiResponse, AppState};
use crate::error::LedgerError;
use crate::ingest::ReadEvent;

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics.render();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

/// Database connectivity probe.
pub async fn test_connection(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, LedgerError> {
    state.store.ping().await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "connection ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct SourcePageParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    /// Also record a read event for every fetched user.
    #[serde(default)]
    pub record: bool,
}

/// Page of source user records, optionally logged to the ledger.
pub async fn list_source_users(
    State(state): State<AppState>,
    Query(params): Query<SourcePageParams>,
) -> Result<impl IntoResponse, LedgerError> {
    if params.limit < 0 || params.offset < 0 {
        return Err(LedgerError::invalid_input(
            "limit and offset must be non-negative",
        ));
    }

    let users = state.source.fetch_page(params.limit, params.offset).await?;
    let count = users.len();

    let report = if params.record {
        let events: Vec<ReadEvent> = users.iter().cloned().map(ReadEvent::from).collect();
        Some(state.pipeline.ingest(events).await)
    } else {
        None
    };

    Ok(Json(ApiResponse::success(serde_json::json!({
        "users": users,
        "count": count,
        "report": report,
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub logs: Vec<ReadEvent>,
}

/// Ingest a batch of read events. The batch always completes; per-event
/// failures are reported, not raised.
pub async fn ingest_logs(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    if req.logs.is_empty() {
        return Err(LedgerError::invalid_input("logs must not be empty"));
    }

    let report = state.pipeline.ingest(req.logs).await;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, LedgerError> {
    let entries = state.store.list(params.limit, params.offset).await?;
    let count = entries.len();
    Ok(Json(ApiResponse::success(serde_json::json!({
        "entries": entries,
        "count": count,
    }))))
}

pub async fn get_log(
    State(state): State<AppState>,
    Path(userid): Path<String>,
) -> Result<impl IntoResponse, LedgerError> {
    let entry = state
        .store
        .get(&userid)
        .await?
        .ok_or_else(|| LedgerError::not_found(&userid))?;

    Ok(Json(ApiResponse::success(entry)))
}

#[derive(Debug, Deserialize)]
pub struct PurgeParams {
    #[serde(default = "default_purge_days")]
    pub days: i64,
}

fn default_purge_days() -> i64 {
    30
}

/// Retention window for a purge request. Rejects negative values and
/// windows too large to express in seconds.
fn purge_window(days: i64) -> Result<std::time::Duration, LedgerError> {
    if days < 0 {
        return Err(LedgerError::invalid_input("days must be non-negative"));
    }
    (days as u64)
        .checked_mul(86_400)
        .map(std::time::Duration::from_secs)
        .ok_or_else(|| LedgerError::invalid_input("days is out of range"))
}

/// Remove ledger entries first read more than `days` ago.
pub async fn purge_logs(
    State(state): State<AppState>,
    Query(params): Query<PurgeParams>,
) -> Result<impl IntoResponse, LedgerError> {
    let max_age = purge_window(params.days)?;
    let deleted = state.store.purge_older_than(max_age).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted_count": deleted,
    }))))
}

/// Global and today's aggregates, merged into one flat object.
pub async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, LedgerError> {
    let global = state.stats.global_stats().await?;
    let today = state.stats.daily_stats(Local::now().date_naive()).await?;

    gauge!("readlog_ledger_entries").set(global.total_entries as f64);

    Ok(Json(ApiResponse::success(serde_json::json!({
        "total_users": global.total_users,
        "total_reads": global.total_reads,
        "total_entries": global.total_entries,
        "first_read_time": global.first_read_time.map(|t| t.to_rfc3339()),
        "last_read_time": global.last_read_time.map(|t| t.to_rfc3339()),
        "today_users": today.users_today,
        "today_reads": today.reads_today,
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}
