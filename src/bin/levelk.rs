//! levelk CLI - level-k curriculum training for two-player pursuit games
//!
//! This CLI provides:
//! - Training a super agent against a ladder of frozen opponents
//! - Inspecting the training curves a run leaves behind

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "levelk")]
#[command(version, about = "Level-k curriculum training for multi-agent RL", long_about = None)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. `info` or `levelk=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a super agent against opponent levels 0..=K
    Train(Box<levelk::cli::commands::train::TrainArgs>),

    /// Print saved training curves
    Inspect(levelk::cli::commands::inspect::InspectArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Train(args) => levelk::cli::commands::train::execute(*args),
        Commands::Inspect(args) => levelk::cli::commands::inspect::execute(args),
    }
}
