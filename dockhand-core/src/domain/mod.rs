//! Core domain types
//!
//! This module contains the domain structures shared by the Dockhand services.
//! The orchestrator persists and transitions them, the runner produces results
//! and failures, and the client reads them back.

pub mod delivery;
pub mod failure;
pub mod job;
pub mod result;

pub use delivery::{DeliveryOutcome, DeliveryStatus};
pub use failure::{ErrorKind, JobFailure};
pub use job::{Job, JobOutcome, JobState, TransitionError, now_micros, strictly_after};
pub use result::{Confidence, DockingResult};
