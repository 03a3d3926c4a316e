//! In-memory job store
//!
//! Records live in a map behind a lock and are replaced whole on every
//! write, so readers never see a half-applied transition.
//!
//! Nothing survives a restart. Terminal jobs, pose text included, are kept up
//! to a retention limit; past it the oldest finished job is evicted and its id
//! reads as unknown. Queued and running jobs are never evicted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dockhand_core::domain::{
    DeliveryOutcome, Job, JobFailure, JobOutcome, JobState, now_micros, strictly_after,
};
use dockhand_core::dto::health::JobCounts;
use std::collections::{HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::{JobStore, StoreError, StoreResult};

/// Terminal jobs kept by [`MemoryJobStore::new`]
pub const DEFAULT_RETAINED_JOBS: usize = 10_000;

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, Job>,
    /// Queued ids in submission order
    queue: VecDeque<Uuid>,
    /// Terminal ids in finishing order
    finished: VecDeque<Uuid>,
}

impl Inner {
    fn retire(&mut self, id: Uuid, limit: usize) {
        self.finished.push_back(id);
        while self.finished.len() > limit {
            if let Some(oldest) = self.finished.pop_front() {
                self.jobs.remove(&oldest);
            }
        }
    }
}

pub struct MemoryJobStore {
    inner: RwLock<Inner>,
    retained: usize,
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETAINED_JOBS)
    }
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `retained` terminal jobs (at least one)
    pub fn with_retention(retained: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            retained: retained.max(1),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("job store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("job store lock poisoned".to_string()))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: &Job) -> StoreResult<()> {
        let mut inner = self.write()?;
        if job.state == JobState::Queued {
            inner.queue.push_back(job.id);
        }
        inner.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Job>> {
        Ok(self.read()?.jobs.get(&id).cloned())
    }

    async fn claim_next(&self, worker_id: &str) -> StoreResult<Option<Job>> {
        let mut inner = self.write()?;

        while let Some(id) = inner.queue.pop_front() {
            let Some(current) = inner.jobs.get(&id) else {
                continue;
            };

            let mut claimed = current.clone();
            if claimed.start(worker_id, now_micros()).is_err() {
                // Not queued anymore; drop the stale queue entry
                continue;
            }

            inner.jobs.insert(id, claimed.clone());
            return Ok(Some(claimed));
        }

        Ok(None)
    }

    async fn heartbeat(&self, id: Uuid, worker_id: &str) -> StoreResult<bool> {
        let mut inner = self.write()?;
        let job = inner.jobs.get(&id).ok_or(StoreError::NotFound(id))?;

        if job.state != JobState::Running || job.worker_id.as_deref() != Some(worker_id) {
            return Ok(false);
        }

        let mut renewed = job.clone();
        let previous = renewed.last_seen().unwrap_or(renewed.created_at);
        renewed.heartbeat_at = Some(strictly_after(previous, now_micros()));
        inner.jobs.insert(id, renewed);
        Ok(true)
    }

    async fn finish(&self, id: Uuid, outcome: JobOutcome) -> StoreResult<Job> {
        let mut inner = self.write()?;
        let job = inner.jobs.get(&id).ok_or(StoreError::NotFound(id))?;

        let mut finished = job.clone();
        finished
            .finish(outcome, now_micros())
            .map_err(|e| StoreError::InvalidTransition { id, from: e.from })?;

        inner.jobs.insert(id, finished.clone());
        inner.retire(id, self.retained);
        Ok(finished)
    }

    async fn fail_stale(&self, before: DateTime<Utc>, failure: &JobFailure) -> StoreResult<Vec<Job>> {
        let mut inner = self.write()?;
        let now = now_micros();

        let stale: Vec<Uuid> = inner
            .jobs
            .values()
            .filter(|job| job.state == JobState::Running)
            .filter(|job| job.last_seen().is_none_or(|seen| seen < before))
            .map(|job| job.id)
            .collect();

        let mut failed = Vec::with_capacity(stale.len());
        for id in stale {
            if let Some(job) = inner.jobs.get(&id) {
                let mut expired = job.clone();
                if expired
                    .finish(JobOutcome::Failed(failure.clone()), now)
                    .is_ok()
                {
                    inner.jobs.insert(id, expired.clone());
                    inner.retire(id, self.retained);
                    failed.push(expired);
                }
            }
        }

        Ok(failed)
    }

    async fn record_delivery(&self, id: Uuid, outcome: &DeliveryOutcome) -> StoreResult<()> {
        let mut inner = self.write()?;
        let job = inner.jobs.get(&id).ok_or(StoreError::NotFound(id))?;

        if !job.state.is_terminal() {
            return Err(StoreError::InvalidTransition { id, from: job.state });
        }

        let mut annotated = job.clone();
        annotated.delivery = Some(outcome.clone());
        inner.jobs.insert(id, annotated);
        Ok(())
    }

    async fn counts(&self) -> StoreResult<JobCounts> {
        let inner = self.read()?;
        let mut counts = JobCounts::default();
        for job in inner.jobs.values() {
            match job.state {
                JobState::Queued => counts.queued += 1,
                JobState::Running => counts.running += 1,
                JobState::Succeeded => counts.succeeded += 1,
                JobState::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}
