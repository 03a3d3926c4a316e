//! Job DTOs for the submission and status API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DeliveryOutcome, DockingResult, Job, JobFailure, JobState};

/// Request to submit a new docking job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJob {
    pub input_ref: String,
    pub payload: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
}

/// Snapshot of a job as returned by status queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: Uuid,
    pub status: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DockingResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryOutcome>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.state,
            result: job.result,
            error: job.error,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
            delivery: job.delivery,
        }
    }
}

/// Submission shape of the legacy single-endpoint API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyDockingRequest {
    pub uniprot_id: String,
    pub ligand: String,
    pub callback_url: String,
}

impl From<LegacyDockingRequest> for SubmitJob {
    fn from(req: LegacyDockingRequest) -> Self {
        Self {
            input_ref: req.uniprot_id,
            payload: req.ligand,
            callback_url: req.callback_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyDockingResponse {
    pub task_id: Uuid,
    pub status: JobState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, JobOutcome};

    #[test]
    fn test_queued_view_omits_terminal_fields() {
        let job = Job::new(
            "P12345".to_string(),
            "CCO".to_string(),
            "http://localhost/cb".to_string(),
        );
        let json = serde_json::to_value(JobView::from(job.clone())).unwrap();

        assert_eq!(json["job_id"], job.id.to_string());
        assert_eq!(json["status"], "queued");
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
        assert!(json.get("started_at").is_none());
    }

    #[test]
    fn test_failed_view_carries_error() {
        let mut job = Job::new(
            "P12345".to_string(),
            "CCO".to_string(),
            "http://localhost/cb".to_string(),
        );
        job.start("worker-0", Utc::now()).unwrap();
        job.finish(
            JobOutcome::Failed(JobFailure::new(
                ErrorKind::NoPoseGenerated,
                "No docking pose generated",
            )),
            Utc::now(),
        )
        .unwrap();

        let json = serde_json::to_value(JobView::from(job)).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["error_type"], "no_pose_generated");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_legacy_request_maps_fields() {
        let legacy: LegacyDockingRequest = serde_json::from_value(serde_json::json!({
            "uniprot_id": "P12345",
            "ligand": "CCO",
            "callback_url": "http://localhost/cb"
        }))
        .unwrap();

        let submit = SubmitJob::from(legacy);
        assert_eq!(submit.input_ref, "P12345");
        assert_eq!(submit.payload, "CCO");
    }
}
