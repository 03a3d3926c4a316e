//! Compute backend abstraction
//!
//! A backend runs one docking computation and reports where its artifact is.
//! Substituting a backend lets the rest of the pipeline run without the real
//! docking binary.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Result artifact written by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Score reported for the top-ranked pose
    pub score: f64,
    /// Location of the pose file inside the work directory
    pub path: PathBuf,
}

/// Ways a backend run can end without an artifact
#[derive(Debug, Error)]
pub enum ComputeFault {
    /// The process exited non-zero (or was killed by a signal)
    #[error("docking process exited with {}", describe_exit(.exit_code))]
    ProcessFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The process exited cleanly but created no result directory
    #[error("No docking pose generated: result directory {0} was not created")]
    NoResultDir(PathBuf),

    /// The result directory exists but holds no matching artifact
    #[error("No docking pose generated: no artifact in {0}")]
    NoArtifact(PathBuf),

    /// An artifact was found but its name carries no usable score
    #[error("Malformed artifact name: {0}")]
    MalformedArtifact(String),

    /// The deadline expired; the process and everything it started are gone
    #[error("docking process exceeded its {0:?} deadline")]
    TimedOut(Duration),

    /// The process could not be started
    #[error("Failed to start docking process: {0}")]
    Spawn(#[source] std::io::Error),

    /// The backend's runtime is missing or broken
    #[error("Compute backend unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

/// An external docking program
#[async_trait]
pub trait ComputeBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Verifies the backend can run at all
    ///
    /// Called once when the worker pool starts; a failure aborts startup.
    async fn check_available(&self) -> Result<(), ComputeFault>;

    /// Runs one computation
    ///
    /// Nothing the backend started may still touch `workdir` once this
    /// returns, including after `deadline` expires.
    ///
    /// # Arguments
    /// * `input` - Path to the prepared structure file
    /// * `params` - Ligand descriptor
    /// * `workdir` - Scratch directory owned by the caller; outputs go here
    /// * `deadline` - Wall-clock limit; expiry is reported as `TimedOut`
    async fn run(
        &self,
        input: &Path,
        params: &str,
        workdir: &Path,
        deadline: Duration,
    ) -> Result<Artifact, ComputeFault>;
}
