//! Fetch command.
//!
//! Pulls a page of user records from the source dataset via the API and
//! optionally records a read event for each one.

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use super::IngestReport;
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct FetchArgs {
    /// Maximum number of users to fetch
    #[arg(short, long, default_value = "100")]
    limit: i64,

    /// Number of users to skip
    #[arg(long, default_value = "0")]
    offset: i64,

    /// Also record a read event for every fetched user
    #[arg(short, long)]
    record: bool,

    /// Write the fetched users to a JSON file instead of stdout
    #[arg(short, long)]
    file: Option<String>,
}

#[derive(Deserialize)]
struct FetchResponse {
    users: Vec<SourceUser>,
    count: usize,
    #[serde(default)]
    report: Option<IngestReport>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SourceUser {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    shop_id: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    #[tabled(rename = "User")]
    user_id: String,
    #[tabled(rename = "Shop")]
    shop_id: String,
}

pub async fn execute(args: FetchArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let path = format!(
        "/api/users?limit={}&offset={}&record={}",
        args.limit, args.offset, args.record
    );
    let resp: FetchResponse = client.get(&path).await?;

    if let Some(path) = args.file {
        let json = serde_json::to_string_pretty(&resp.users)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path))?;
        output::print_success(&format!("Wrote {} users to {}", resp.count, path));
        if let Some(report) = resp.report {
            output::print_success(&format!(
                "Recorded {} read events ({} failed)",
                report.succeeded, report.failed
            ));
        }
        return Ok(());
    }

    let rows: Vec<UserRow> = resp
        .users
        .into_iter()
        .map(|u| UserRow {
            user_id: u.user_id.unwrap_or_else(|| "-".to_string()),
            shop_id: u.shop_id.unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    output::print_list(&rows, format);

    if matches!(format, OutputFormat::Table) {
        output::print_info(&format!("{} users (offset {})", resp.count, args.offset));
        if let Some(report) = resp.report {
            output::print_success(&format!(
                "Recorded {} read events ({} failed)",
                report.succeeded, report.failed
            ));
        }
    }

    Ok(())
}
