//! CLI module for Rostrum
//!
//! Provides:
//! - `practice`: timed debate against the AI opponent
//! - `quota status` / `quota reset`: inspect or clear today's AI usage

use crate::settings::AppConfig;
use clap::{Parser, Subcommand};
use rostrum_core::Side;
use rostrum_llm::{FileStore, KeyValueStore, QuotaGovernor, SystemClock};
use std::sync::Arc;
use tracing::debug;

pub mod practice;
pub mod quota;

/// Rostrum debate practice CLI
#[derive(Parser, Debug)]
#[command(name = "rostrum")]
#[command(about = "Practice debating against an AI opponent")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a timed practice debate
    Practice {
        /// Motion to debate
        #[arg(long)]
        topic: String,
        /// Side you argue: proposition or opposition
        #[arg(long, default_value = "proposition")]
        side: Side,
        /// Session length in minutes (defaults to the configured value)
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Inspect or reset the daily AI quota
    Quota {
        #[command(subcommand)]
        command: QuotaCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum QuotaCommand {
    /// Show remaining calls and tokens
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Zero today's counters
    Reset,
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Practice {
            topic,
            side,
            minutes,
        }) => practice::run(&config, topic, side, minutes).await,
        Some(Commands::Quota { command }) => match command {
            QuotaCommand::Status { json } => quota::status(&config, json).await,
            QuotaCommand::Reset => quota::reset(&config).await,
        },
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Build the process-wide quota governor from configuration
pub(crate) async fn open_governor(config: &AppConfig) -> Arc<QuotaGovernor> {
    let store = match config.storage.data_dir() {
        Some(dir) => FileStore::with_path(dir),
        None => FileStore::new(),
    };
    debug!(data_dir = %store.data_dir().display(), "Opening quota store");

    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    Arc::new(QuotaGovernor::load(config.quota.clone(), store, Arc::new(SystemClock)).await)
}
