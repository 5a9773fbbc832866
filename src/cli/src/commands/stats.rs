//! Statistics command.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Debug, Deserialize, Serialize)]
struct StatsResponse {
    total_users: i64,
    total_reads: i64,
    total_entries: i64,
    #[serde(default)]
    first_read_time: Option<String>,
    #[serde(default)]
    last_read_time: Option<String>,
    today_users: i64,
    today_reads: i64,
}

pub async fn execute(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats: StatsResponse = client.get("/api/stats").await?;

    match format {
        OutputFormat::Table => {
            output::print_header("Ledger Statistics");
            output::print_detail("Total users", &stats.total_users.to_string());
            output::print_detail("Total reads", &stats.total_reads.to_string());
            output::print_detail(
                "First read",
                stats.first_read_time.as_deref().unwrap_or("-"),
            );
            output::print_detail(
                "Last read",
                stats.last_read_time.as_deref().unwrap_or("-"),
            );
            println!();
            output::print_detail("Users today", &stats.today_users.to_string());
            output::print_detail("Reads today", &stats.today_reads.to_string());
        }
        _ => output::print_item(&stats, format),
    }

    Ok(())
}
