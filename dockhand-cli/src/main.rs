//! Dockhand CLI
//!
//! Command-line interface for submitting docking jobs and following them.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(about = "Dockhand docking job CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(
        long = "url",
        env = "DOCKHAND_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
    };

    handle_command(cli.command, &config).await
}
