//! Job and health API endpoints

use crate::DockhandClient;
use crate::error::Result;
use dockhand_core::dto::health::HealthResponse;
use dockhand_core::dto::job::{JobView, SubmitJob, SubmitJobResponse};
use uuid::Uuid;

impl DockhandClient {
    /// Submit a new docking job
    ///
    /// # Returns
    /// The id of the queued job
    pub async fn submit_job(&self, req: &SubmitJob) -> Result<SubmitJobResponse> {
        let url = format!("{}/jobs", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Get the current status of a job
    pub async fn get_job(&self, job_id: Uuid) -> Result<JobView> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Service liveness and job counts
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
