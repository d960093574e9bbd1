//! Livecast CLI - Headless HLS Player
//!
//! Features:
//! - Manifest probing (quality ladder, selector preview)
//! - Headless playback through the full player engine
//! - Live-edge autoplay and policy-block simulation

use anyhow::Context;
use clap::{Parser, Subcommand};
use livecast_core::{PlayerConfig, QualitySelection};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod sink;

/// Livecast CLI - Adaptive streaming player
#[derive(Parser)]
#[command(name = "livecast")]
#[command(version)]
#[command(about = "Headless adaptive HLS player", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    /// Player configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a manifest and show its quality ladder
    Probe {
        /// Manifest URL
        url: String,
    },

    /// Play a stream headlessly
    Play {
        /// Manifest URL
        url: String,

        /// Treat the source as a live stream
        #[arg(long)]
        live: bool,

        /// Quality level index, or "auto"
        #[arg(short, long, default_value = "auto")]
        quality: QualitySelection,

        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Reject the first play request as a platform autoplay policy would
        #[arg(long)]
        block_autoplay: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);
    livecast_core::init();

    let config = match &cli.config {
        Some(path) => PlayerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PlayerConfig::default(),
    };

    match cli.command {
        Commands::Probe { url } => {
            commands::probe(&url, &config, &cli.format).await?;
        }
        Commands::Play {
            url,
            live,
            quality,
            duration,
            block_autoplay,
        } => {
            let options = commands::PlayOptions {
                url,
                live,
                quality,
                duration,
                block_autoplay,
            };
            commands::play(options, config, &cli.format).await?;
        }
    }

    Ok(())
}
