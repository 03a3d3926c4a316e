//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services sit between the API/workers and the job store.

pub mod execution;
pub mod job;

pub use execution::{ExecutionService, StandardExecutionService};
pub use job::{JobService, ServiceError};
