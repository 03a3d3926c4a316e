//! Job Service
//!
//! Admission and status queries. Submission validates the request, checks
//! that the input can be resolved, persists a `Queued` job and wakes an idle
//! worker; the id is returned before any execution starts.

use dockhand_core::domain::Job;
use dockhand_core::dto::health::JobCounts;
use dockhand_core::dto::job::SubmitJob;
use dockhand_core::validation::{PayloadValidator, ValidationError, validate_input_ref};
use dockhand_runner::InputPreparer;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::repository::{JobStore, StoreError};

/// Service error type
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no structure available for input '{0}'")]
    InputNotFound(String),

    #[error("job {0} not found")]
    JobNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    preparer: Arc<dyn InputPreparer>,
    validator: Arc<dyn PayloadValidator>,
    wake: Arc<Notify>,
}

impl JobService {
    pub fn new(
        store: Arc<dyn JobStore>,
        preparer: Arc<dyn InputPreparer>,
        validator: Arc<dyn PayloadValidator>,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            store,
            preparer,
            validator,
            wake,
        }
    }

    /// Create and enqueue a new job
    pub async fn submit(&self, req: SubmitJob) -> Result<Job, ServiceError> {
        let input_ref = req.input_ref.trim();
        validate_input_ref(input_ref)?;
        self.validator.validate(&req.payload)?;
        validate_callback_url(&req.callback_url)?;

        if !self.preparer.resolvable(input_ref).await {
            return Err(ServiceError::InputNotFound(input_ref.to_string()));
        }

        let job = Job::new(input_ref.to_string(), req.payload, req.callback_url);
        self.store.insert(&job).await?;

        tracing::info!(job_id = %job.id, "Job queued for input {}", job.input_ref);
        self.wake.notify_one();

        Ok(job)
    }

    /// Get a job by its textual id; malformed ids are reported as not found
    pub async fn get_status(&self, job_id: &str) -> Result<Job, ServiceError> {
        let id = Uuid::parse_str(job_id.trim())
            .map_err(|_| ServiceError::JobNotFound(job_id.to_string()))?;

        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::JobNotFound(job_id.to_string()))
    }

    pub async fn counts(&self) -> Result<JobCounts, ServiceError> {
        Ok(self.store.counts().await?)
    }
}

fn validate_callback_url(raw: &str) -> Result<(), ValidationError> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| ValidationError::CallbackUrl(format!("'{}' is not a valid URL: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ValidationError::CallbackUrl(format!(
            "unsupported scheme '{}', expected http or https",
            url.scheme()
        )));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::CallbackUrl(format!("'{}' has no host", raw)));
    }

    Ok(())
}
