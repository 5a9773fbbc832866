//! Error handling for the read-activity ledger.
//!
//! The taxonomy is deliberately small:
//! - `InvalidInput`: bad event data; recovered locally, the batch continues
//! - `RecordNotFound`: lookup miss; a valid empty result at the store level,
//!   surfaced as 404 only at the HTTP boundary
//! - `StoreUnavailable`: the persistence layer cannot be reached; the
//!   individual call fails, retry policy belongs to the caller
//!
//! Everything else is an internal failure. Errors map to HTTP status codes
//! via the `IntoResponse` implementation so handlers can return
//! `Result<_, LedgerError>` directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

/// A specialized Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Machine-readable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or empty user identifier, malformed parameters.
    InvalidInput,
    /// Lookup miss for a user identifier.
    RecordNotFound,
    /// Persistence layer unreachable (pool exhausted, connection refused).
    StoreUnavailable,
    /// Query or statement failed against a reachable store.
    DatabaseError,
    /// JSON encode/decode failure.
    SerializationError,
    /// Bad or missing configuration.
    ConfigurationError,
    /// Catch-all internal failure.
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    ///
    /// `StoreUnavailable` maps to 500, not 503: existing clients treat any
    /// store failure as a plain server error.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::RecordNotFound => StatusCode::NOT_FOUND,
            Self::StoreUnavailable
            | Self::DatabaseError
            | Self::SerializationError
            | Self::ConfigurationError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if a caller could reasonably retry the failed operation.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable | Self::DatabaseError)
    }

    /// Wire form of the code, identical to its serde representation. Used
    /// for metric labels and log fields so they match API responses.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type for the ledger service.
///
/// Carries a user-safe message plus an optional internal message that is
/// logged but never sent to clients.
#[derive(Error, Debug)]
pub struct LedgerError {
    code: ErrorCode,
    user_message: Cow<'static, str>,
    internal_message: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl LedgerError {
    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let err = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            source: None,
        };
        counter!("readlog_errors_total", "code" => err.code.to_string()).increment(1);
        err
    }

    /// Create an error with both user and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(code, user_message);
        err.internal_message = Some(internal_message.into());
        err
    }

    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a not-found error for a ledger entry.
    pub fn not_found(user_id: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No read log entry for user: {}", user_id.into()),
        )
    }

    /// Create a store-unavailable error.
    pub fn store_unavailable(internal: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::StoreUnavailable,
            "The ledger store is unreachable",
            internal,
        )
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::ConfigurationError,
            "Configuration error",
            message,
        )
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::InternalError, "An internal error occurred", message)
    }

    /// Attach a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the user-facing message.
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Log this error at a severity matching its code.
    pub fn log(&self) {
        let code = self.code.to_string();
        let status = self.http_status().as_u16();
        match self.code {
            ErrorCode::InvalidInput | ErrorCode::RecordNotFound => {
                debug!(
                    error_code = %code,
                    http_status = status,
                    user_message = %self.user_message,
                    "Client error"
                );
            }
            ErrorCode::StoreUnavailable => {
                error!(
                    error_code = %code,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    source = ?self.source,
                    "Store unreachable"
                );
            }
            _ => {
                warn!(
                    error_code = %code,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    "Server error"
                );
            }
        }
    }
}

/// Error envelope for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&LedgerError> for ErrorResponse {
    fn from(error: &LedgerError) -> Self {
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                message: error.user_message.to_string(),
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.http_status();
        let body = ErrorResponse::from(&self);
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(error: sqlx::Error) -> Self {
        let (code, user_msg) = match &error {
            sqlx::Error::RowNotFound => {
                (ErrorCode::RecordNotFound, "The requested record was not found")
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                (ErrorCode::StoreUnavailable, "The ledger store is unreachable")
            }
            _ => (ErrorCode::DatabaseError, "A database error occurred"),
        };
        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_internal(
            ErrorCode::SerializationError,
            "Failed to process JSON data",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<config::ConfigError> for LedgerError {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(error.to_string())
    }
}
