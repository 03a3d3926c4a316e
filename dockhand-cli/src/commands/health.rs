//! Health command handler

use anyhow::Result;
use colored::*;
use dockhand_client::DockhandClient;

pub async fn health(client: &DockhandClient) -> Result<()> {
    let health = client.health().await?;

    println!(
        "{} {} ({})",
        "✓".green(),
        health.message.bold(),
        client.base_url().dimmed()
    );
    println!("  Queued:    {}", health.jobs.queued);
    println!("  Running:   {}", health.jobs.running.to_string().cyan());
    println!("  Succeeded: {}", health.jobs.succeeded.to_string().green());
    println!("  Failed:    {}", health.jobs.failed.to_string().red());

    Ok(())
}
