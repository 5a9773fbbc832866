//! Readlog CLI - command-line interface for the read-activity ledger.
//!
//! Provides commands for ingesting read events, inspecting ledger entries,
//! viewing aggregate statistics, and purging stale data.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config, fetch, health, logs, purge, stats};
use output::OutputFormat;

/// Readlog - read-activity ledger CLI
#[derive(Parser)]
#[command(
    name = "readlog",
    version,
    about = "Readlog - read-activity ledger",
    long_about = "CLI tool for recording read events, browsing ledger entries, \
                  and managing retention of the readlog service.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// API server URL
    #[arg(long, global = true, env = "READLOG_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch source users and optionally record read events for them
    Fetch(fetch::FetchArgs),

    /// Ledger entry operations
    #[command(subcommand)]
    Logs(logs::LogsCommands),

    /// Show global and today's statistics
    Stats,

    /// Purge ledger entries older than a retention window
    Purge(purge::PurgeArgs),

    /// Check service health
    Health,

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(config::load_api_url)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = client::ApiClient::new(&api_url)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Fetch(args) => fetch::execute(args, &client, format).await,
        Commands::Logs(cmd) => logs::execute(cmd, &client, format).await,
        Commands::Stats => stats::execute(&client, format).await,
        Commands::Purge(args) => purge::execute(args, &client, format).await,
        Commands::Health => health::execute(&client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
