//! Job API Handlers
//!
//! HTTP endpoints for job submission and status.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use dockhand_core::dto::job::{
    JobView, LegacyDockingRequest, LegacyDockingResponse, SubmitJob, SubmitJobResponse,
};

use crate::api::error::ApiResult;
use crate::state::AppState;

/// POST /jobs
/// Validate and enqueue a docking job
pub async fn submit_job(
    State(state): State<AppState>,
    body: Result<Json<SubmitJob>, JsonRejection>,
) -> ApiResult<Json<SubmitJobResponse>> {
    let Json(req) = body?;
    tracing::debug!("Submitting job for input: {}", req.input_ref);

    let job = state.jobs.submit(req).await?;

    Ok(Json(SubmitJobResponse { job_id: job.id }))
}

/// GET /jobs/{job_id}
/// Current snapshot of a job
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    tracing::debug!("Getting job: {}", job_id);

    let job = state.jobs.get_status(&job_id).await?;

    Ok(Json(JobView::from(job)))
}

/// POST /start_docking_uniprot
/// Legacy single-endpoint submission
pub async fn start_docking_uniprot(
    State(state): State<AppState>,
    body: Result<Json<LegacyDockingRequest>, JsonRejection>,
) -> ApiResult<Json<LegacyDockingResponse>> {
    let Json(req) = body?;
    let job = state.jobs.submit(SubmitJob::from(req)).await?;

    Ok(Json(LegacyDockingResponse {
        task_id: job.id,
        status: job.state,
    }))
}
