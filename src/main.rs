//! Rostrum - debate practice against an AI opponent
//!
//! CLI entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    init_tracing(cli.json_logs);

    debug!("Starting Rostrum v{}", env!("CARGO_PKG_VERSION"));
    if !std::path::Path::new(".env").exists() && std::env::var("GEMINI_API_KEY").is_err() {
        warn!(".env file not found and GEMINI_API_KEY is not set");
    }

    let config = settings::load_config()?;
    cli::run(cli, config).await
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "rostrum=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
