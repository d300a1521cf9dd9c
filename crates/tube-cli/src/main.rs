//! Tube CLI - command line host for Tube Core
//!
//! Features:
//! - Proxy URL inspection
//! - Fetches through the proxy and cache-busting stack
//! - Offline manifest resolution of captured metadata snapshots

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Tube CLI - playback session toolkit
#[derive(Parser)]
#[command(name = "tube-cli")]
#[command(version)]
#[command(about = "Inspect proxy routing and manifest resolution for Tube Player", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the proxy URL a platform request is rewritten to
    ProxyUrl {
        /// Target URL
        url: String,

        /// Proxy session id (PROXY_SESSION_ID wins when set)
        #[arg(short, long)]
        session: Option<String>,

        /// Request header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },

    /// Fetch a URL through the player's transport stack
    Fetch {
        /// Target URL
        url: String,

        /// Skip the forwarding proxy
        #[arg(long)]
        direct: bool,

        /// Print the response body
        #[arg(long)]
        body: bool,
    },

    /// Resolve the manifest for a captured metadata snapshot
    Resolve {
        /// Snapshot JSON file
        snapshot: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .init();

    tube_core::init();

    match cli.command {
        Commands::ProxyUrl { url, session, headers } => {
            commands::proxy_url(&url, session, &headers, &cli.format)?;
        }
        Commands::Fetch { url, direct, body } => {
            commands::fetch(&url, direct, body, &cli.format).await?;
        }
        Commands::Resolve { snapshot } => {
            commands::resolve(&snapshot, &cli.format).await?;
        }
    }

    Ok(())
}
