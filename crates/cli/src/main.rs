//! Parley CLI — the main entry point.
//!
//! Commands:
//! - `run`       — Run a debate between configured AI participants
//! - `providers` — List known providers/models or test credentials

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Parley — multi-model AI debate orchestration",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (default: ~/.parley/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a debate
    Run(commands::run::RunArgs),

    /// Inspect providers and credentials
    Providers {
        #[command(subcommand)]
        action: commands::providers::ProvidersAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => parley_config::AppConfig::load_from(path)?,
        None => parley_config::AppConfig::load()?,
    };

    match cli.command {
        Commands::Run(args) => commands::run::run(config, args).await?,
        Commands::Providers { action } => commands::providers::run(config, action).await?,
    }

    Ok(())
}
