//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;
pub mod openapi;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/.well-known/tool.json", get(health::tool_descriptor))
        .route("/openapi.json", get(openapi::openapi))
        // Job endpoints
        .route("/jobs", post(job::submit_job))
        .route("/jobs/{job_id}", get(job::get_job))
        .route("/start_docking_uniprot", post(job::start_docking_uniprot))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
