//! Repository Module
//!
//! Job persistence for the orchestrator. The store is the single writer of
//! job state; every transition goes through the `Job` state machine methods
//! so both implementations enforce the same rules.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dockhand_core::domain::{DeliveryOutcome, Job, JobFailure, JobOutcome, JobState};
use dockhand_core::dto::health::JobCounts;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    /// The job is not in a state that allows the requested transition
    #[error("job {id} is {from}")]
    InvalidTransition { id: Uuid, from: JobState },

    #[error("job store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to encode job field: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt job record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable home of job records
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persists a freshly created `Queued` job
    async fn insert(&self, job: &Job) -> StoreResult<()>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Job>>;

    /// Atomically moves the oldest `Queued` job to `Running` for `worker_id`
    async fn claim_next(&self, worker_id: &str) -> StoreResult<Option<Job>>;

    /// Renews the lease; `false` when the job is no longer running for this worker
    async fn heartbeat(&self, id: Uuid, worker_id: &str) -> StoreResult<bool>;

    /// Applies the terminal transition and returns the stored record
    async fn finish(&self, id: Uuid, outcome: JobOutcome) -> StoreResult<Job>;

    /// Fails every `Running` job whose lease was last renewed before `before`
    async fn fail_stale(&self, before: DateTime<Utc>, failure: &JobFailure) -> StoreResult<Vec<Job>>;

    /// Annotates a terminal job with its callback delivery outcome
    async fn record_delivery(&self, id: Uuid, outcome: &DeliveryOutcome) -> StoreResult<()>;

    async fn counts(&self) -> StoreResult<JobCounts>;
}
