//! Execution service
//!
//! Turns a claimed job into its terminal outcome:
//! - Resolving the input reference through the preparer
//! - Running the docking computation
//! - Mapping every failure onto a `JobFailure`
//!
//! Workers only see `JobOutcome`; nothing here touches the store.

use async_trait::async_trait;
use dockhand_core::domain::{Job, JobFailure, JobOutcome};
use dockhand_runner::{ComputeFault, ComputeRunner, InputPreparer};
use std::sync::Arc;
use tracing::{info, warn};

/// Service trait for executing docking jobs
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Verifies the execution runtime once, before any job is claimed
    async fn check_ready(&self) -> Result<(), ComputeFault>;

    /// Executes a running job and returns its terminal outcome
    async fn execute(&self, job: &Job) -> JobOutcome;
}

/// Standard implementation of ExecutionService
pub struct StandardExecutionService {
    preparer: Arc<dyn InputPreparer>,
    runner: ComputeRunner,
}

impl StandardExecutionService {
    pub fn new(preparer: Arc<dyn InputPreparer>, runner: ComputeRunner) -> Self {
        Self { preparer, runner }
    }
}

#[async_trait]
impl ExecutionService for StandardExecutionService {
    async fn check_ready(&self) -> Result<(), ComputeFault> {
        self.runner.backend().check_available().await
    }

    async fn execute(&self, job: &Job) -> JobOutcome {
        let input_path = match self.preparer.prepare(&job.input_ref).await {
            Ok(path) => path,
            Err(e) => {
                warn!(job_id = %job.id, "Input preparation failed: {}", e);
                return JobOutcome::Failed(JobFailure::from(e));
            }
        };

        match self
            .runner
            .execute(job.id, &job.input_ref, &input_path, &job.payload_ref)
            .await
        {
            Ok(result) => {
                info!(
                    job_id = %job.id,
                    "Docking finished with score {} ({})",
                    result.docking_score, result.docking_confidence
                );
                JobOutcome::Succeeded(result)
            }
            Err(e) => {
                warn!(job_id = %job.id, "Docking failed: {}", e);
                JobOutcome::Failed(JobFailure::from(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockhand_core::domain::{Confidence, ErrorKind};
    use dockhand_runner::{DiffDockBackend, LocalStructureStore};
    use std::time::Duration;

    fn structure(dir: &std::path::Path, id: &str) {
        std::fs::write(dir.join(format!("{}.pdb", id)), "ATOM\n".repeat(200)).unwrap();
    }

    fn service(structures: &std::path::Path, scratch: &std::path::Path, script: &str) -> StandardExecutionService {
        let backend = DiffDockBackend::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "diffdock".to_string()],
        );
        StandardExecutionService::new(
            Arc::new(LocalStructureStore::new(structures)),
            ComputeRunner::new(Arc::new(backend), scratch.to_path_buf(), Duration::from_secs(10)),
        )
    }

    fn job(input_ref: &str) -> Job {
        Job::new(
            input_ref.to_string(),
            "CCO".to_string(),
            "http://localhost/cb".to_string(),
        )
    }

    #[tokio::test]
    async fn test_successful_run() {
        let structures = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        structure(structures.path(), "P12345");

        let service = service(
            structures.path(),
            scratch.path(),
            r#"mkdir -p "$6/complex_0" && echo pose > "$6/complex_0/rank1_confidence-0.50.sdf""#,
        );

        match service.execute(&job("P12345")).await {
            JobOutcome::Succeeded(result) => {
                assert_eq!(result.docking_score, -0.5);
                assert_eq!(result.docking_confidence, Confidence::Moderate);
                assert_eq!(result.pose, "pose\n");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_input_fails_without_running() {
        let structures = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let marker = scratch.path().join("ran");
        let script = format!("touch {}", marker.display());

        let service = service(structures.path(), scratch.path(), &script);
        match service.execute(&job("P99999")).await {
            JobOutcome::Failed(failure) => assert_eq!(failure.kind, ErrorKind::InputNotFound),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_process_failure_maps_to_execution_failed() {
        let structures = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        structure(structures.path(), "P12345");

        let service = service(structures.path(), scratch.path(), "echo boom >&2; exit 1");
        match service.execute(&job("P12345")).await {
            JobOutcome::Failed(failure) => {
                assert_eq!(failure.kind, ErrorKind::ExecutionFailed);
                assert!(failure.diagnostic.unwrap().contains("boom"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_check_ready_asks_backend() {
        let dir = tempfile::tempdir().unwrap();
        let ready = StandardExecutionService::new(
            Arc::new(LocalStructureStore::new(dir.path())),
            ComputeRunner::new(
                Arc::new(DiffDockBackend::new("true", vec![])),
                dir.path().to_path_buf(),
                Duration::from_secs(1),
            ),
        );
        assert!(ready.check_ready().await.is_ok());

        let missing = StandardExecutionService::new(
            Arc::new(LocalStructureStore::new(dir.path())),
            ComputeRunner::new(
                Arc::new(DiffDockBackend::new("dockhand-no-such-program", vec![])),
                dir.path().to_path_buf(),
                Duration::from_secs(1),
            ),
        );
        assert!(missing.check_ready().await.is_err());
    }
}
