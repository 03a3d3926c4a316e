//! Callback payloads delivered to caller endpoints

use serde::{Deserialize, Serialize};

use crate::domain::{DockingResult, ErrorKind, Job, JobState};

/// Terminal notification body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CallbackPayload {
    Completed {
        result: DockingResult,
    },
    Failed {
        error_type: ErrorKind,
        input_ref: String,
        payload: String,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostic: Option<String>,
    },
}

impl CallbackPayload {
    /// Builds the payload for a terminal job; `None` while it is still queued or running.
    pub fn for_job(job: &Job) -> Option<Self> {
        match job.state {
            JobState::Succeeded => job.result.clone().map(|result| CallbackPayload::Completed { result }),
            JobState::Failed => job.error.as_ref().map(|failure| CallbackPayload::Failed {
                error_type: failure.kind,
                input_ref: job.input_ref.clone(),
                payload: job.payload_ref.clone(),
                error: failure.message.clone(),
                diagnostic: failure.diagnostic.clone(),
            }),
            JobState::Queued | JobState::Running => None,
        }
    }
}
