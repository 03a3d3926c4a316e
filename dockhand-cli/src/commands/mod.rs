//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod health;
mod job;

use anyhow::Result;
use clap::Subcommand;
use uuid::Uuid;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a docking job
    Submit {
        /// Protein structure reference (e.g. a UniProt accession)
        #[arg(long)]
        input_ref: String,

        /// Ligand as a SMILES string
        #[arg(long)]
        payload: String,

        /// URL that receives the completion callback
        #[arg(long)]
        callback_url: String,

        /// Block until the job finishes
        #[arg(short, long)]
        wait: bool,
    },
    /// Show the current status of a job
    Status {
        /// Job ID
        id: Uuid,

        /// Print the raw JSON view
        #[arg(long)]
        json: bool,
    },
    /// Poll a job until it succeeds or fails
    Wait {
        /// Job ID
        id: Uuid,

        /// Seconds between polls
        #[arg(short, long, default_value_t = 5)]
        interval: u64,

        /// Print the raw JSON view once finished
        #[arg(long)]
        json: bool,
    },
    /// Check that the service is up and show job counts
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        Commands::Submit {
            input_ref,
            payload,
            callback_url,
            wait,
        } => job::submit(&client, input_ref, payload, callback_url, wait).await,
        Commands::Status { id, json } => job::status(&client, id, json).await,
        Commands::Wait { id, interval, json } => job::wait(&client, id, interval, json).await,
        Commands::Health => health::health(&client).await,
    }
}
