//! Callback notifier
//!
//! Delivers terminal job payloads to the caller's URL. Delivery outcomes are
//! returned as values and recorded next to the job; they never feed back into
//! the job's state.

use dockhand_core::domain::{DeliveryOutcome, Job};
use dockhand_core::dto::callback::CallbackPayload;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::repository::JobStore;

const INITIAL_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 30_000;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("callback request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("callback endpoint returned {status}")]
    Status { status: reqwest::StatusCode },
}

/// Sends callback requests with a bounded number of attempts
#[derive(Debug, Clone)]
pub struct CallbackNotifier {
    client: reqwest::Client,
    max_attempts: u32,
    initial_delay: Duration,
}

impl CallbackNotifier {
    /// # Arguments
    /// * `timeout` - Limit for each individual attempt
    /// * `max_attempts` - Total attempts, at least one
    pub fn new(timeout: Duration, max_attempts: u32) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
        })
    }

    /// Overrides the first retry delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Posts `payload` to `url`, retrying with exponential backoff on failure
    pub async fn notify(&self, url: &str, payload: &CallbackPayload) -> DeliveryOutcome {
        let mut attempt = 0;
        let mut delay = self.initial_delay;

        loop {
            attempt += 1;

            match self.send_once(url, payload).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!("Callback to {} delivered after {} attempt(s)", url, attempt);
                    }
                    return DeliveryOutcome::delivered(attempt);
                }
                Err(e) => {
                    if attempt >= self.max_attempts {
                        warn!(
                            "Callback to {} failed after {} attempt(s): {}",
                            url, attempt, e
                        );
                        return DeliveryOutcome::failed(attempt, e.to_string());
                    }

                    warn!(
                        "Callback to {} failed (attempt {}/{}): {}",
                        url, attempt, self.max_attempts, e
                    );
                    tokio::time::sleep(delay).await;

                    // Exponential backoff with cap
                    delay = (delay * 2).min(Duration::from_millis(MAX_DELAY_MS));
                }
            }
        }
    }

    async fn send_once(&self, url: &str, payload: &CallbackPayload) -> Result<(), NotifyError> {
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(NotifyError::Status { status });
        }

        debug!("Callback to {} accepted with {}", url, status);
        Ok(())
    }
}

/// Notifies the callback of a terminal job and records the outcome
///
/// Non-terminal jobs are ignored. A failure to record the outcome is logged
/// and otherwise dropped.
pub async fn deliver(store: &dyn JobStore, notifier: &CallbackNotifier, job: &Job) {
    let Some(payload) = CallbackPayload::for_job(job) else {
        debug!("Job {} is {}, nothing to deliver", job.id, job.state);
        return;
    };

    let outcome = notifier.notify(&job.callback_url, &payload).await;
    if outcome.is_delivered() {
        info!(job_id = %job.id, "Callback delivered");
    } else {
        warn!(
            job_id = %job.id,
            "Callback delivery failed: {}",
            outcome.last_error.as_deref().unwrap_or("unknown error")
        );
    }

    if let Err(e) = store.record_delivery(job.id, &outcome).await {
        warn!("Failed to record delivery outcome for job {}: {}", job.id, e);
    }
}
