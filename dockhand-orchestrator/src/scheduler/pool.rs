//! Worker pool
//!
//! Starts a fixed number of workers plus the lease supervisor, after a
//! one-time readiness check of the execution runtime.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use dockhand_runner::ComputeFault;

use super::supervisor::Supervisor;
use super::worker::{Worker, WorkerContext};
use crate::config::Config;
use crate::notifier::CallbackNotifier;
use crate::repository::JobStore;
use crate::service::ExecutionService;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("execution runtime is not ready: {0}")]
    NotReady(#[from] ComputeFault),
}

/// Pool sizing and timings
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub worker_count: usize,
    /// Worker ids are `<prefix>-<n>`
    pub worker_prefix: String,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub lease_timeout: Duration,
    pub supervisor_interval: Duration,
}

impl PoolSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            worker_count: config.worker_count,
            worker_prefix: default_worker_prefix(),
            poll_interval: config.poll_interval,
            heartbeat_interval: config.heartbeat_interval,
            lease_timeout: config.lease_timeout,
            supervisor_interval: config.supervisor_interval,
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Hostname-and-pid prefix so ids stay distinct across processes sharing a store
fn default_worker_prefix() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "dockhand".to_string());
    format!("{}-{}", host, std::process::id())
}

pub struct WorkerPool {
    settings: PoolSettings,
    store: Arc<dyn JobStore>,
    execution: Arc<dyn ExecutionService>,
    notifier: CallbackNotifier,
    wake: Arc<Notify>,
}

impl WorkerPool {
    /// # Arguments
    /// * `wake` - Signalled on every submission; shared with the job service
    pub fn new(
        settings: PoolSettings,
        store: Arc<dyn JobStore>,
        execution: Arc<dyn ExecutionService>,
        notifier: CallbackNotifier,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            settings,
            store,
            execution,
            notifier,
            wake,
        }
    }

    /// Checks the runtime, then spawns the workers and the supervisor
    pub async fn start(self) -> Result<PoolHandle, PoolError> {
        self.execution.check_ready().await?;

        let ctx = Arc::new(WorkerContext {
            store: self.store,
            execution: self.execution,
            notifier: self.notifier,
            wake: self.wake,
            poll_interval: self.settings.poll_interval,
            heartbeat_interval: self.settings.heartbeat_interval,
        });

        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(self.settings.worker_count + 1);

        for n in 0..self.settings.worker_count {
            let id = format!("{}-{}", self.settings.worker_prefix, n);
            let worker = Worker::new(id, Arc::clone(&ctx), cancel.child_token());
            tasks.push(tokio::spawn(worker.run()));
        }

        let supervisor = Supervisor::new(
            Arc::clone(&ctx),
            self.settings.lease_timeout,
            self.settings.supervisor_interval,
        );
        tasks.push(tokio::spawn(supervisor.run(cancel.child_token())));

        info!(
            "Worker pool started with {} worker(s) (poll interval: {:?})",
            self.settings.worker_count, self.settings.poll_interval
        );

        Ok(PoolHandle { cancel, tasks })
    }
}

/// Running pool; dropping it without `shutdown` leaves the tasks running
pub struct PoolHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PoolHandle {
    /// Stops claiming and waits for every job in hand to finish
    pub async fn shutdown(self) {
        info!("Stopping worker pool");
        self.cancel.cancel();

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Pool task ended abnormally: {}", e);
            }
        }

        info!("Worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryJobStore;
    use async_trait::async_trait;
    use dockhand_core::domain::{
        DockingResult, ErrorKind, Job, JobOutcome, JobState, now_micros,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Succeed,
        Panic,
        Slow(Duration),
    }

    struct FakeExecution {
        behaviour: Behaviour,
        ready: bool,
        calls: AtomicUsize,
    }

    impl FakeExecution {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                ready: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ExecutionService for FakeExecution {
        async fn check_ready(&self) -> Result<(), ComputeFault> {
            if self.ready {
                Ok(())
            } else {
                Err(ComputeFault::Unavailable("no runtime".to_string()))
            }
        }

        async fn execute(&self, job: &Job) -> JobOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Succeed => {}
                Behaviour::Panic => panic!("docking library segfaulted"),
                Behaviour::Slow(d) => tokio::time::sleep(d).await,
            }
            JobOutcome::Succeeded(DockingResult::new(
                job.input_ref.clone(),
                job.payload_ref.clone(),
                0.17,
                "pose".to_string(),
            ))
        }
    }

    fn settings(workers: usize) -> PoolSettings {
        PoolSettings {
            worker_count: workers,
            worker_prefix: "test".to_string(),
            poll_interval: Duration::from_millis(20),
            heartbeat_interval: Duration::from_millis(20),
            lease_timeout: Duration::from_secs(60),
            supervisor_interval: Duration::from_secs(60),
        }
    }

    fn notifier() -> CallbackNotifier {
        CallbackNotifier::new(Duration::from_millis(200), 1).unwrap()
    }

    fn job() -> Job {
        Job::new(
            "P12345".to_string(),
            "CCO".to_string(),
            "http://127.0.0.1:1/cb".to_string(),
        )
    }

    async fn wait_terminal(store: &MemoryJobStore, id: uuid::Uuid) -> Job {
        for _ in 0..200 {
            let job = store.get(id).await.unwrap().unwrap();
            if job.state.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal state", id);
    }

    #[tokio::test]
    async fn test_start_fails_when_runtime_missing() {
        let execution = Arc::new(FakeExecution {
            behaviour: Behaviour::Succeed,
            ready: false,
            calls: AtomicUsize::new(0),
        });
        let pool = WorkerPool::new(
            settings(1),
            Arc::new(MemoryJobStore::new()),
            execution,
            notifier(),
            Arc::new(Notify::new()),
        );
        assert!(matches!(pool.start().await, Err(PoolError::NotReady(_))));
    }

    #[tokio::test]
    async fn test_jobs_run_to_success() {
        let store = Arc::new(MemoryJobStore::new());
        let execution = FakeExecution::new(Behaviour::Succeed);
        let handle = WorkerPool::new(
            settings(2),
            store.clone(),
            execution.clone(),
            notifier(),
            Arc::new(Notify::new()),
        )
        .start()
        .await
        .unwrap();

        let jobs: Vec<Job> = (0..5).map(|_| job()).collect();
        for j in &jobs {
            store.insert(j).await.unwrap();
        }
        for j in &jobs {
            let done = wait_terminal(&store, j.id).await;
            assert_eq!(done.state, JobState::Succeeded);
            assert!(done.worker_id.unwrap().starts_with("test-"));
        }
        assert_eq!(execution.calls.load(Ordering::SeqCst), 5);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_panic_becomes_worker_crash_and_worker_survives() {
        let store = Arc::new(MemoryJobStore::new());
        let handle = WorkerPool::new(
            settings(1),
            store.clone(),
            FakeExecution::new(Behaviour::Panic),
            notifier(),
            Arc::new(Notify::new()),
        )
        .start()
        .await
        .unwrap();

        let first = job();
        let second = job();
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        for id in [first.id, second.id] {
            let done = wait_terminal(&store, id).await;
            assert_eq!(done.state, JobState::Failed);
            assert_eq!(done.error.unwrap().kind, ErrorKind::WorkerCrash);
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_finishes_job_in_hand() {
        let store = Arc::new(MemoryJobStore::new());
        let handle = WorkerPool::new(
            settings(1),
            store.clone(),
            FakeExecution::new(Behaviour::Slow(Duration::from_millis(200))),
            notifier(),
            Arc::new(Notify::new()),
        )
        .start()
        .await
        .unwrap();

        let j = job();
        store.insert(&j).await.unwrap();
        for _ in 0..100 {
            if store.get(j.id).await.unwrap().unwrap().state == JobState::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        handle.shutdown().await;
        assert_eq!(
            store.get(j.id).await.unwrap().unwrap().state,
            JobState::Succeeded
        );
    }

    #[tokio::test]
    async fn test_supervisor_fails_orphaned_jobs() {
        let store = Arc::new(MemoryJobStore::new());

        // Left running by a previous process
        let mut orphan = job();
        orphan.created_at = now_micros() - chrono::TimeDelta::seconds(600);
        orphan
            .start("gone-0", orphan.created_at + chrono::TimeDelta::seconds(1))
            .unwrap();
        store.insert(&orphan).await.unwrap();

        let mut settings = settings(1);
        settings.lease_timeout = Duration::from_secs(1);
        settings.heartbeat_interval = Duration::from_millis(100);
        settings.supervisor_interval = Duration::from_millis(50);

        let handle = WorkerPool::new(
            settings,
            store.clone(),
            FakeExecution::new(Behaviour::Succeed),
            notifier(),
            Arc::new(Notify::new()),
        )
        .start()
        .await
        .unwrap();

        let done = wait_terminal(&store, orphan.id).await;
        assert_eq!(done.state, JobState::Failed);
        assert_eq!(done.error.unwrap().kind, ErrorKind::WorkerCrash);
        assert_eq!(done.worker_id.as_deref(), Some("gone-0"));

        handle.shutdown().await;
    }
}
