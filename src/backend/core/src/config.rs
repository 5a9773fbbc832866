//! Configuration management.
//!
//! All runtime settings live in explicit structs; the database settings are
//! handed to `LedgerStore::connect` rather than read from process-wide state.

use serde::Deserialize;
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Source dataset configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Retention (purge) configuration
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of pooled connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a connection from the pool
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

/// Where candidate read events come from.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Table (or view) holding the source user records
    #[serde(default = "default_source_table")]
    pub table: String,

    /// Default page size when the caller does not specify one
    #[serde(default = "default_page_limit")]
    pub page_limit: i64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            table: default_source_table(),
            page_limit: default_page_limit(),
        }
    }
}

/// Age-based pruning of ledger entries.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Entries whose first read is older than this many days are eligible
    /// for pruning
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,

    /// How often the background sweeper runs; unset disables it
    /// (e.g. "1h", "30m")
    #[serde(default, with = "humantime_serde")]
    pub sweep_interval: Option<Duration>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            sweep_interval: None,
        }
    }
}

impl RetentionConfig {
    /// The retention window as a duration.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days * 86_400)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// OpenTelemetry OTLP endpoint
    pub otlp_endpoint: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 5 }
fn default_acquire_timeout_secs() -> u64 { 5 }
fn default_source_table() -> String { "users_filtered_with_shopid".to_string() }
fn default_page_limit() -> i64 { 100 }
fn default_max_age_days() -> u64 { 30 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

impl Config {
    /// Load configuration from the environment (prefix `READLOG`, `__` as
    /// section separator, e.g. `READLOG__DATABASE__URL`).
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("READLOG").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with the environment layered on top.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("READLOG").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}
