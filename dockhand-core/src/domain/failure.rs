//! Job failure types

use serde::{Deserialize, Serialize};

/// Classification of a job-time failure
///
/// Serialized names are the `error_type` values of the failure callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The compute process ran but produced no usable pose
    NoPoseGenerated,
    /// The compute process crashed or exited non-zero
    ExecutionFailed,
    /// The compute process exceeded its deadline
    #[serde(rename = "timeout")]
    ExecutionTimeout,
    /// The worker owning the job terminated without completing it
    WorkerCrash,
    /// The input reference could not be resolved to a usable structure
    InputNotFound,
    /// Anything else that went wrong inside the service
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoPoseGenerated => "no_pose_generated",
            ErrorKind::ExecutionFailed => "execution_failed",
            ErrorKind::ExecutionTimeout => "timeout",
            ErrorKind::WorkerCrash => "worker_crash",
            ErrorKind::InputNotFound => "input_not_found",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error attached to a `Failed` job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    #[serde(rename = "error_type")]
    pub kind: ErrorKind,
    pub message: String,
    /// Captured stderr or other trace output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl JobFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        let diagnostic = diagnostic.into();
        if !diagnostic.trim().is_empty() {
            self.diagnostic = Some(diagnostic);
        }
        self
    }

    pub fn worker_crash(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WorkerCrash, message)
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
