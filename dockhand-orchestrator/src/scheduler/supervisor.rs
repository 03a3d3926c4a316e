//! Lease supervisor
//!
//! Fails `Running` jobs whose lease has expired, which covers workers that
//! died in this process as well as jobs left behind by a previous process.
//! Swept jobs get their failure callback from here.

use chrono::TimeDelta;
use dockhand_core::domain::{JobFailure, now_micros};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::worker::WorkerContext;
use crate::notifier;
use crate::repository::StoreResult;

pub struct Supervisor {
    ctx: Arc<WorkerContext>,
    lease_timeout: Duration,
    interval: Duration,
}

impl Supervisor {
    pub(crate) fn new(ctx: Arc<WorkerContext>, lease_timeout: Duration, interval: Duration) -> Self {
        Self {
            ctx,
            lease_timeout,
            interval,
        }
    }

    /// Sweeps immediately, then every `interval` until cancelled
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "Supervisor started (lease timeout: {:?}, interval: {:?})",
            self.lease_timeout, self.interval
        );

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!("Lease sweep failed: {}", e);
                    }
                }
            }
        }

        info!("Supervisor stopped");
    }

    /// Fails every expired lease and delivers the failure callbacks
    ///
    /// Returns the number of jobs failed.
    pub async fn sweep(&self) -> StoreResult<usize> {
        let lease = TimeDelta::from_std(self.lease_timeout).unwrap_or(TimeDelta::MAX);
        let before = now_micros()
            .checked_sub_signed(lease)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);

        let failure = JobFailure::worker_crash(format!(
            "worker stopped renewing its lease for more than {}s",
            self.lease_timeout.as_secs()
        ));

        let expired = self.ctx.store.fail_stale(before, &failure).await?;
        for job in &expired {
            warn!(
                job_id = %job.id,
                worker_id = job.worker_id.as_deref().unwrap_or("unknown"),
                "Lease expired, job failed as worker crash"
            );
            notifier::deliver(self.ctx.store.as_ref(), &self.ctx.notifier, job).await;
        }

        Ok(expired.len())
    }
}
