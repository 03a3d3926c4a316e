//! Job command handlers
//!
//! Submitting docking jobs and following them to completion.

use std::time::Duration;

use anyhow::{Result, bail};
use colored::*;
use dockhand_client::DockhandClient;
use dockhand_core::domain::JobState;
use dockhand_core::dto::job::{JobView, SubmitJob};
use uuid::Uuid;

/// Submit a job, optionally waiting for it to finish
pub async fn submit(
    client: &DockhandClient,
    input_ref: String,
    payload: String,
    callback_url: String,
    block: bool,
) -> Result<()> {
    let request = SubmitJob {
        input_ref,
        payload,
        callback_url,
    };
    let submitted = client.submit_job(&request).await?;

    println!(
        "{} Submitted job {}",
        "✓".green(),
        submitted.job_id.to_string().cyan()
    );

    if block {
        println!();
        wait(client, submitted.job_id, 5, false).await?;
    }

    Ok(())
}

/// Get and display a single job
pub async fn status(client: &DockhandClient, id: Uuid, json: bool) -> Result<()> {
    let job = client.get_job(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        print_job_details(&job);
    }

    Ok(())
}

/// Poll until the job is terminal
///
/// Exits with an error when the job failed so scripts can branch on it.
pub async fn wait(client: &DockhandClient, id: Uuid, interval: u64, json: bool) -> Result<()> {
    let interval = Duration::from_secs(interval.max(1));
    let mut last = None;

    let job = loop {
        let job = client.get_job(id).await?;
        if job.status.is_terminal() {
            break job;
        }
        if last != Some(job.status) {
            println!("  {} {}", "▸".cyan(), colorize_status(&job.status));
            last = Some(job.status);
        }
        tokio::time::sleep(interval).await;
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        print_job_details(&job);
    }

    if job.status == JobState::Failed {
        bail!("job {} failed", id);
    }
    Ok(())
}

/// Print detailed job information
fn print_job_details(job: &JobView) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.job_id.to_string().cyan());
    println!("  Status:      {}", colorize_status(&job.status));
    println!(
        "  Created:     {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(started) = job.started_at {
        println!("  Started:     {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(finished) = job.finished_at {
        println!("  Finished:    {}", finished.format("%Y-%m-%d %H:%M:%S"));
        if let Some(started) = job.started_at {
            let took = finished.signed_duration_since(started);
            println!(
                "  Duration:    {}",
                format!("{:.1}s", took.num_milliseconds() as f64 / 1000.0).dimmed()
            );
        }
    }

    if let Some(result) = &job.result {
        println!();
        println!("{}", "Result:".bold());
        println!("  Protein:     {}", result.input_ref);
        println!("  Ligand:      {}", result.payload);
        println!("  Score:       {}", result.docking_score);
        println!("  Confidence:  {}", result.docking_confidence.to_string().green());
        println!(
            "  Pose:        {}",
            format!("{} bytes", result.pose.len()).dimmed()
        );
    }

    if let Some(error) = &job.error {
        println!();
        println!("{}", "Error:".bold());
        println!("  Type:        {}", error.kind.to_string().red());
        println!("  Message:     {}", error.message);
        if let Some(diagnostic) = &error.diagnostic {
            println!("  Diagnostic:");
            for line in diagnostic.lines().take(20) {
                println!("    {}", line.dimmed());
            }
        }
    }

    if let Some(delivery) = &job.delivery {
        println!();
        let status = if delivery.is_delivered() {
            "delivered".green()
        } else {
            "failed".red()
        };
        println!(
            "  Callback:    {} after {} attempt(s)",
            status, delivery.attempts
        );
        if let Some(err) = &delivery.last_error {
            println!("    {}", err.dimmed());
        }
    }
}

/// Colorize job status for display
fn colorize_status(status: &JobState) -> ColoredString {
    match status {
        JobState::Queued => "Queued".yellow(),
        JobState::Running => "Running".cyan(),
        JobState::Succeeded => "Succeeded".green(),
        JobState::Failed => "Failed".red(),
    }
}
