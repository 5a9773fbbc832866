//! Ledger entry commands.
//!
//! Provides record, list, and get operations for ledger entries.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};

use super::{EntryRow, IngestReport, LedgerEntry};
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Record read events for one or more users
    Record {
        /// User identifiers to record a read for
        #[arg(required_unless_present = "file")]
        userids: Vec<String>,

        /// Shop identifier to attach to every event
        #[arg(short, long)]
        shopid: Option<String>,

        /// Read events from a JSON file (array of {userid, shopid, timestamp})
        #[arg(short, long, conflicts_with = "userids")]
        file: Option<String>,
    },

    /// List ledger entries
    List {
        /// Maximum number of results
        #[arg(short, long, default_value = "100")]
        limit: i64,

        /// Number of entries to skip
        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// Show one ledger entry
    Get {
        /// User identifier
        userid: String,
    },
}

#[derive(Serialize)]
struct IngestRequest {
    logs: Vec<EventBody>,
}

#[derive(Serialize, Deserialize)]
struct EventBody {
    userid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shopid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Deserialize)]
struct ListResponse {
    entries: Vec<LedgerEntry>,
    count: usize,
}

pub async fn execute(cmd: LogsCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        LogsCommands::Record {
            userids,
            shopid,
            file,
        } => {
            let logs = match file {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read events file: {}", path))?;
                    serde_json::from_str::<Vec<EventBody>>(&content)
                        .with_context(|| "Failed to parse events JSON")?
                }
                None => userids
                    .into_iter()
                    .map(|userid| EventBody {
                        userid,
                        shopid: shopid.clone(),
                        timestamp: None,
                    })
                    .collect(),
            };

            let count = logs.len();
            let report: IngestReport = client.post("/api/logs", &IngestRequest { logs }).await?;

            match format {
                OutputFormat::Table => {
                    output::print_success(&format!(
                        "Recorded {}/{} read events",
                        report.succeeded, count
                    ));
                    for failure in &report.errors {
                        output::print_error(&format!(
                            "event {} ({}): {}",
                            failure.index,
                            failure.user_id.as_deref().unwrap_or("?"),
                            failure.reason
                        ));
                    }
                }
                _ => output::print_item(&report, format),
            }
        }

        LogsCommands::List { limit, offset } => {
            let resp: ListResponse = client
                .get(&format!("/api/logs?limit={}&offset={}", limit, offset))
                .await?;

            let rows: Vec<EntryRow> = resp.entries.into_iter().map(EntryRow::from).collect();
            output::print_list(&rows, format);

            if matches!(format, OutputFormat::Table) && resp.count > 0 {
                output::print_info(&format!("{} entries (offset {})", resp.count, offset));
            }
        }

        LogsCommands::Get { userid } => {
            let entry: LedgerEntry = client.get(&format!("/api/logs/{}", userid)).await?;

            match format {
                OutputFormat::Table => {
                    output::print_header(&format!("User: {}", entry.user_id));
                    output::print_detail("Shop", entry.shop_id.as_deref().unwrap_or("-"));
                    output::print_detail("Read count", &entry.read_count.to_string());
                    output::print_detail("First read", &entry.read_time.to_rfc3339());
                    output::print_detail("Last read", &entry.last_read_time.to_rfc3339());
                    output::print_detail("Source", &entry.source);
                }
                _ => output::print_item(&entry, format),
            }
        }
    }

    Ok(())
}
