//! Worker loop
//!
//! A worker claims one job at a time. Each job executes inside its own task
//! so a panic surfaces as a `JoinError` and becomes a `WorkerCrash` failure
//! instead of taking the worker down. A companion task renews the lease while
//! the job runs.

use dockhand_core::domain::{Job, JobFailure, JobOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::notifier::{self, CallbackNotifier};
use crate::repository::{JobStore, StoreError};
use crate::service::ExecutionService;

/// Collaborators shared by every worker and the supervisor
pub(crate) struct WorkerContext {
    pub store: Arc<dyn JobStore>,
    pub execution: Arc<dyn ExecutionService>,
    pub notifier: CallbackNotifier,
    pub wake: Arc<Notify>,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
}

pub(crate) struct Worker {
    id: String,
    ctx: Arc<WorkerContext>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(id: String, ctx: Arc<WorkerContext>, cancel: CancellationToken) -> Self {
        Self { id, ctx, cancel }
    }

    /// Claims and runs jobs until cancelled; the job in hand is always finished
    pub async fn run(self) {
        info!(worker_id = %self.id, "Worker started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.ctx.store.claim_next(&self.id).await {
                Ok(Some(job)) => {
                    self.run_job(job).await;
                    continue;
                }
                Ok(None) => debug!(worker_id = %self.id, "No queued jobs"),
                Err(e) => error!(worker_id = %self.id, "Failed to claim job: {}", e),
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.ctx.wake.notified() => {}
                _ = time::sleep(self.ctx.poll_interval) => {}
            }
        }

        info!(worker_id = %self.id, "Worker stopped");
    }

    async fn run_job(&self, job: Job) {
        info!(job_id = %job.id, worker_id = %self.id, "Claimed job for input {}", job.input_ref);

        let heartbeat = self.spawn_heartbeat(&job);

        let execution = Arc::clone(&self.ctx.execution);
        let claimed = job.clone();
        let outcome = match tokio::spawn(async move { execution.execute(&claimed).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(job_id = %job.id, worker_id = %self.id, "Job task terminated: {}", e);
                JobOutcome::Failed(JobFailure::worker_crash(format!(
                    "worker {} terminated while running the job: {}",
                    self.id, e
                )))
            }
        };

        heartbeat.abort();

        match self.ctx.store.finish(job.id, outcome).await {
            Ok(done) => {
                info!(job_id = %done.id, worker_id = %self.id, "Job {}", done.state);
                notifier::deliver(self.ctx.store.as_ref(), &self.ctx.notifier, &done).await;
            }
            Err(StoreError::InvalidTransition { from, .. }) => {
                warn!(
                    job_id = %job.id,
                    worker_id = %self.id,
                    "Job is already {}, discarding late result",
                    from
                );
            }
            Err(e) => {
                error!(job_id = %job.id, worker_id = %self.id, "Failed to record outcome: {}", e);
            }
        }
    }

    fn spawn_heartbeat(&self, job: &Job) -> JoinHandle<()> {
        let store = Arc::clone(&self.ctx.store);
        let job_id = job.id;
        let worker_id = self.id.clone();
        let period = self.ctx.heartbeat_interval;

        tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                match store.heartbeat(job_id, &worker_id).await {
                    Ok(true) => debug!(job_id = %job_id, worker_id = %worker_id, "Lease renewed"),
                    Ok(false) => {
                        warn!(job_id = %job_id, worker_id = %worker_id, "Lease lost, stopping heartbeat");
                        break;
                    }
                    Err(e) => warn!(job_id = %job_id, worker_id = %worker_id, "Heartbeat failed: {}", e),
                }
            }
        })
    }
}
