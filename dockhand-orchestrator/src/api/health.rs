//! Health Check API Handlers
//!
//! Liveness with queue counts, and the static tool descriptor.

use axum::{Json, extract::State};
use dockhand_core::dto::health::{HealthResponse, ToolDescriptor};

use crate::api::error::ApiResult;
use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let jobs = state.jobs.counts().await?;

    Ok(Json(HealthResponse {
        status: "OK".to_string(),
        message: "Docking service is running".to_string(),
        jobs,
    }))
}

/// GET /.well-known/tool.json
pub async fn tool_descriptor(State(state): State<AppState>) -> Json<ToolDescriptor> {
    Json(state.tool.as_ref().clone())
}
