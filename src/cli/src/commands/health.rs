//! Health check command.
//!
//! Queries `/health` and the database connectivity probe.

use anyhow::Result;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

pub async fn execute(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: serde_json::Value = client.get_raw("/health").await?;

    match format {
        OutputFormat::Table => {
            let status = health
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            output::print_header("Service Health");
            output::print_detail("Status", status);
            output::print_detail("API URL", client.base_url());

            if let Some(version) = health.get("version").and_then(|v| v.as_str()) {
                output::print_detail("Version", version);
            }

            match client.get::<serde_json::Value>("/api/test").await {
                Ok(_) => output::print_detail("Database", "reachable"),
                Err(e) => output::print_detail("Database", &format!("unreachable ({:#})", e)),
            }

            if status == "healthy" {
                output::print_success("Service operational");
            } else {
                output::print_error(&format!("Service status: {}", status));
            }
        }
        _ => output::print_item(&health, format),
    }

    Ok(())
}
