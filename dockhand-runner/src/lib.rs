//! Dockhand Runner
//!
//! Execution side of a docking job:
//! - Input preparation: resolve an input reference to a local structure file
//! - Compute backends: run the external docking process in a scratch directory
//! - Compute runner: enforce the deadline, read the artifact, type the outcome
//!
//! The orchestrator's worker pool drives these pieces; nothing in this crate
//! touches job state.

pub mod artifact;
pub mod backend;
pub mod compute;
pub mod diffdock;
pub mod preparer;
pub mod scratch;

pub use backend::{Artifact, ComputeBackend, ComputeFault};
pub use compute::{ComputeError, ComputeRunner};
pub use diffdock::DiffDockBackend;
pub use preparer::{InputPreparer, LocalStructureStore, PrepareError};
pub use scratch::ScratchDir;
