//! Compute runner
//!
//! Wraps a [`ComputeBackend`] with the job-level contract: a fresh scratch
//! directory per run, an enforced deadline, verbatim pose capture and a typed
//! failure for every way the run can end badly.

use dockhand_core::domain::{DockingResult, ErrorKind, JobFailure};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{ComputeBackend, ComputeFault};
use crate::scratch::ScratchDir;

/// Typed failure of a compute run
#[derive(Debug, Error)]
pub enum ComputeError {
    /// The tool broke: non-zero exit, spawn failure or unreadable output
    #[error("{message}")]
    ExecutionFailed {
        message: String,
        stderr: Option<String>,
    },

    /// The tool ran and found nothing
    #[error("{0}")]
    NoPoseGenerated(String),

    #[error("docking process exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("{0}")]
    Internal(String),
}

impl ComputeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComputeError::ExecutionFailed { .. } => ErrorKind::ExecutionFailed,
            ComputeError::NoPoseGenerated(_) => ErrorKind::NoPoseGenerated,
            ComputeError::Timeout(_) => ErrorKind::ExecutionTimeout,
            ComputeError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<ComputeFault> for ComputeError {
    fn from(fault: ComputeFault) -> Self {
        match fault {
            ComputeFault::ProcessFailed { ref stderr, .. } => ComputeError::ExecutionFailed {
                message: fault.to_string(),
                stderr: Some(stderr.clone()),
            },
            ComputeFault::NoResultDir(_) | ComputeFault::NoArtifact(_) => {
                ComputeError::NoPoseGenerated(fault.to_string())
            }
            ComputeFault::MalformedArtifact(_)
            | ComputeFault::Spawn(_)
            | ComputeFault::Unavailable(_) => ComputeError::ExecutionFailed {
                message: fault.to_string(),
                stderr: None,
            },
            ComputeFault::TimedOut(deadline) => ComputeError::Timeout(deadline),
            ComputeFault::Io(e) => ComputeError::Internal(format!("I/O error: {}", e)),
        }
    }
}

impl From<ComputeError> for JobFailure {
    fn from(err: ComputeError) -> Self {
        let kind = err.kind();
        match err {
            ComputeError::ExecutionFailed { message, stderr } => {
                let failure = JobFailure::new(kind, message);
                match stderr {
                    Some(stderr) => failure.with_diagnostic(stderr),
                    None => failure,
                }
            }
            other => JobFailure::new(kind, other.to_string()),
        }
    }
}

/// Extra time a backend gets past the deadline to tear its process down
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// Runs docking computations for the worker pool
#[derive(Clone)]
pub struct ComputeRunner {
    backend: Arc<dyn ComputeBackend>,
    scratch_base: PathBuf,
    timeout: Duration,
    stop_grace: Duration,
}

impl ComputeRunner {
    /// # Arguments
    /// * `backend` - The docking program to drive
    /// * `scratch_base` - Directory under which per-job scratch directories are created
    /// * `timeout` - Wall-clock limit for a single run
    pub fn new(backend: Arc<dyn ComputeBackend>, scratch_base: PathBuf, timeout: Duration) -> Self {
        Self {
            backend,
            scratch_base,
            timeout,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Overrides how long a backend that ignores its deadline is waited for
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn backend(&self) -> &Arc<dyn ComputeBackend> {
        &self.backend
    }

    /// Docks `payload` against the structure at `input_path`
    ///
    /// `input_ref` is echoed into the result. The scratch directory is gone
    /// when this returns, whatever the outcome.
    pub async fn execute(
        &self,
        job_id: Uuid,
        input_ref: &str,
        input_path: &Path,
        payload: &str,
    ) -> Result<DockingResult, ComputeError> {
        let scratch = ScratchDir::create(&self.scratch_base, job_id).map_err(|e| {
            ComputeError::Internal(format!("Failed to create scratch directory: {}", e))
        })?;

        info!(
            "Running {} for job {} in {}",
            self.backend.name(),
            job_id,
            scratch.path().display()
        );

        // The backend enforces the deadline itself; the outer limit only
        // catches one that does not
        let run = self
            .backend
            .run(input_path, payload, scratch.path(), self.timeout);
        let artifact = match tokio::time::timeout(self.timeout + self.stop_grace, run).await {
            Ok(Err(ComputeFault::TimedOut(deadline))) => {
                warn!("Job {} timed out after {:?}", job_id, deadline);
                return Err(ComputeError::Timeout(deadline));
            }
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "Job {} overran its {:?} deadline and was abandoned by {}",
                    job_id,
                    self.timeout,
                    self.backend.name()
                );
                return Err(ComputeError::Timeout(self.timeout));
            }
        };

        let pose = tokio::fs::read_to_string(&artifact.path).await.map_err(|e| {
            ComputeError::ExecutionFailed {
                message: format!(
                    "Failed to read artifact {}: {}",
                    artifact.path.display(),
                    e
                ),
                stderr: None,
            }
        })?;

        info!(
            "Job {} produced a pose with score {}",
            job_id, artifact.score
        );

        Ok(DockingResult::new(
            input_ref.to_string(),
            payload.to_string(),
            artifact.score,
            pose,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::RESULT_SUBDIR;
    use crate::backend::Artifact;
    use async_trait::async_trait;
    use dockhand_core::domain::Confidence;
    use std::sync::Mutex;

    /// What the fake backend should do in its work directory
    #[derive(Clone)]
    enum Script {
        Artifact { name: &'static str, body: &'static str },
        EmptyResultDir,
        Nothing,
        Fail { code: i32, stderr: &'static str },
        /// Honours the deadline like a well-behaved backend
        Hang,
        /// Never returns on its own
        IgnoreDeadline,
    }

    struct FakeBackend {
        script: Script,
        seen_workdir: Mutex<Option<PathBuf>>,
    }

    impl FakeBackend {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                seen_workdir: Mutex::new(None),
            })
        }

        fn workdir(&self) -> PathBuf {
            self.seen_workdir.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl ComputeBackend for FakeBackend {
        fn name(&self) -> &str {
            "fake"
        }

        async fn check_available(&self) -> Result<(), ComputeFault> {
            Ok(())
        }

        async fn run(
            &self,
            _input: &Path,
            _params: &str,
            workdir: &Path,
            deadline: Duration,
        ) -> Result<Artifact, ComputeFault> {
            *self.seen_workdir.lock().unwrap() = Some(workdir.to_path_buf());
            match &self.script {
                Script::Artifact { name, body } => {
                    let dir = workdir.join(RESULT_SUBDIR);
                    std::fs::create_dir_all(&dir)?;
                    std::fs::write(dir.join(name), body)?;
                    crate::artifact::locate(workdir)
                }
                Script::EmptyResultDir => {
                    std::fs::create_dir_all(workdir.join(RESULT_SUBDIR))?;
                    crate::artifact::locate(workdir)
                }
                Script::Nothing => crate::artifact::locate(workdir),
                Script::Fail { code, stderr } => Err(ComputeFault::ProcessFailed {
                    exit_code: Some(*code),
                    stderr: stderr.to_string(),
                }),
                Script::Hang => {
                    tokio::time::sleep(deadline).await;
                    Err(ComputeFault::TimedOut(deadline))
                }
                Script::IgnoreDeadline => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
            }
        }
    }

    fn runner(backend: Arc<FakeBackend>, base: &Path, timeout: Duration) -> ComputeRunner {
        ComputeRunner::new(backend, base.to_path_buf(), timeout)
    }

    async fn execute(runner: &ComputeRunner) -> Result<DockingResult, ComputeError> {
        runner
            .execute(
                Uuid::new_v4(),
                "P12345",
                Path::new("/structures/P12345.pdb"),
                "CCO",
            )
            .await
    }

    #[tokio::test]
    async fn test_success_reads_pose_and_classifies() {
        let base = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(Script::Artifact {
            name: "rank1_confidence0.42.sdf",
            body: "RDKit 3D\n$$$$\n",
        });
        let runner = runner(backend.clone(), base.path(), Duration::from_secs(5));

        let result = execute(&runner).await.unwrap();
        assert_eq!(result.input_ref, "P12345");
        assert_eq!(result.payload, "CCO");
        assert_eq!(result.docking_score, 0.42);
        assert_eq!(result.docking_confidence, Confidence::High);
        assert_eq!(result.pose, "RDKit 3D\n$$$$\n");
        assert!(!backend.workdir().exists());
    }

    #[tokio::test]
    async fn test_no_result_dir_and_empty_dir_are_distinct_no_pose() {
        let base = tempfile::tempdir().unwrap();

        let backend = FakeBackend::new(Script::Nothing);
        let err = execute(&runner(backend.clone(), base.path(), Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoPoseGenerated);
        assert!(err.to_string().contains("was not created"));
        assert!(!backend.workdir().exists());

        let backend = FakeBackend::new(Script::EmptyResultDir);
        let err = execute(&runner(backend.clone(), base.path(), Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoPoseGenerated);
        assert!(err.to_string().contains("no artifact"));
        assert!(!backend.workdir().exists());
    }

    #[tokio::test]
    async fn test_process_failure_carries_stderr() {
        let base = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(Script::Fail {
            code: 1,
            stderr: "RuntimeError: bad ligand",
        });
        let err = execute(&runner(backend.clone(), base.path(), Duration::from_secs(5)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExecutionFailed);
        let failure = JobFailure::from(err);
        assert_eq!(failure.kind, ErrorKind::ExecutionFailed);
        assert_eq!(failure.diagnostic.as_deref(), Some("RuntimeError: bad ligand"));
        assert!(!backend.workdir().exists());
    }

    #[tokio::test]
    async fn test_deadline_is_enforced() {
        let base = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(Script::Hang);
        let err = execute(&runner(backend.clone(), base.path(), Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExecutionTimeout);
        assert_eq!(err.to_string(), "docking process exceeded its 50ms deadline");
        assert!(!backend.workdir().exists());
    }

    #[tokio::test]
    async fn test_backend_ignoring_deadline_is_abandoned() {
        let base = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(Script::IgnoreDeadline);
        let runner = runner(backend.clone(), base.path(), Duration::from_millis(50))
            .with_stop_grace(Duration::from_millis(50));

        let err = execute(&runner).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionTimeout);
        assert!(!backend.workdir().exists());
    }

    #[tokio::test]
    async fn test_timeout_leaves_no_scratch_behind_forked_writers() {
        let base = tempfile::tempdir().unwrap();
        let backend = crate::DiffDockBackend::new(
            "sh",
            vec![
                "-c".to_string(),
                r#"( sleep 1; mkdir -p "$6/complex_0"; echo x > "$6/complex_0/partial" ) & sleep 30"#
                    .to_string(),
                "diffdock".to_string(),
            ],
        );
        let runner = ComputeRunner::new(
            Arc::new(backend),
            base.path().to_path_buf(),
            Duration::from_millis(300),
        );

        let err = execute(&runner).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionTimeout);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let left: Vec<_> = std::fs::read_dir(base.path()).unwrap().collect();
        assert!(left.is_empty(), "scratch recreated: {:?}", left);
    }

    #[tokio::test]
    async fn test_malformed_artifact_is_execution_failure() {
        let base = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(Script::Artifact {
            name: "rank1_confidenceoops.sdf",
            body: "",
        });
        let err = execute(&runner(backend, base.path(), Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionFailed);
    }

    #[tokio::test]
    async fn test_low_confidence_score() {
        let base = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(Script::Artifact {
            name: "rank1_confidence-2.00.sdf",
            body: "pose",
        });
        let result = execute(&runner(backend, base.path(), Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(result.docking_confidence, Confidence::Low);
    }
}
