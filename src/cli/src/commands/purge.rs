//! Purge command.
//!
//! Removes ledger entries whose first read is older than the retention
//! window. Destructive, so it asks for `--force` unless confirmed.

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct PurgeArgs {
    /// Remove entries first read more than this many days ago
    #[arg(short, long, default_value = "30")]
    days: i64,

    /// Skip confirmation
    #[arg(short, long)]
    force: bool,
}

#[derive(Debug, Deserialize, Serialize)]
struct PurgeResponse {
    deleted_count: u64,
}

pub async fn execute(args: PurgeArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    if !args.force {
        output::print_info(&format!(
            "This will permanently delete entries older than {} days. Use --force to confirm.",
            args.days
        ));
        return Ok(());
    }

    let resp: PurgeResponse = client
        .delete(&format!("/api/logs?days={}", args.days))
        .await?;

    match format {
        OutputFormat::Table => {
            output::print_success(&format!(
                "Purged {} entries older than {} days",
                resp.deleted_count, args.days
            ));
        }
        _ => output::print_item(&resp, format),
    }

    Ok(())
}
