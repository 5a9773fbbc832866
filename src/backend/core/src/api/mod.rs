//! HTTP surface for the read-activity ledger.
//!
//! Thin layer over the core operations: handlers validate parameters, call
//! the store/pipeline/aggregator, and wrap results in the `ApiResponse`
//! envelope. Error mapping lives on `LedgerError`'s `IntoResponse`
//! (`InvalidInput` -> 400, `RecordNotFound` -> 404, store failures -> 500).

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::ingest::IngestionPipeline;
use crate::ledger::LedgerStore;
use crate::source::ContentSource;
use crate::stats::StatsAggregator;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: LedgerStore,
    pub stats: StatsAggregator,
    pub pipeline: Arc<IngestionPipeline<LedgerStore>>,
    pub source: ContentSource,
    pub metrics: PrometheusHandle,
}

/// Build the API router.
///
/// # Endpoints
///
/// - `GET /health` - liveness
/// - `GET /metrics` - Prometheus metrics
/// - `GET /api/test` - database connectivity probe
/// - `GET /api/users` - page of source user records (optionally recorded)
/// - `POST /api/logs` - ingest a batch of read events
/// - `GET /api/logs` - list ledger entries
/// - `GET /api/logs/:userid` - one ledger entry
/// - `DELETE /api/logs` - purge entries older than `days`
/// - `GET /api/stats` - global and today's aggregates
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/api/test", get(handlers::test_connection))
        .route("/api/users", get(handlers::list_source_users))
        .route(
            "/api/logs",
            post(handlers::ingest_logs)
                .get(handlers::list_logs)
                .delete(handlers::purge_logs),
        )
        .route("/api/logs/:userid", get(handlers::get_log))
        .route("/api/stats", get(handlers::get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// API response wrapper.
#[derive(Debug, serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
