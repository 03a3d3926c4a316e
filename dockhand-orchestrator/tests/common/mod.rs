#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::post,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tower::ServiceExt;

use dockhand_core::validation::SmilesValidator;
use dockhand_orchestrator::api;
use dockhand_orchestrator::notifier::CallbackNotifier;
use dockhand_orchestrator::repository::MemoryJobStore;
use dockhand_orchestrator::scheduler::{PoolHandle, PoolSettings, WorkerPool};
use dockhand_orchestrator::service::{JobService, StandardExecutionService};
use dockhand_orchestrator::state::{AppState, tool_descriptor};
use dockhand_runner::{ComputeRunner, DiffDockBackend, LocalStructureStore};

/// Writes a structure file large enough to pass preparation
pub fn write_structure(dir: &std::path::Path, id: &str) {
    let line = "ATOM      1  N   MET A   1      11.104   6.134  -6.504  1.00  0.00           N\n";
    std::fs::write(dir.join(format!("{}.pdb", id)), line.repeat(20)).unwrap();
}

/// Everything a test needs to drive the service over HTTP
pub struct Harness {
    pub app: Router,
    pub store: Arc<MemoryJobStore>,
    pub pool: Option<PoolHandle>,
    pub structures: tempfile::TempDir,
    pub scratch: tempfile::TempDir,
}

impl Harness {
    /// Router and store only; nothing executes submitted jobs
    pub fn api_only() -> Self {
        let structures = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        write_structure(structures.path(), "P12345");

        let store = Arc::new(MemoryJobStore::new());
        let jobs = JobService::new(
            store.clone(),
            Arc::new(LocalStructureStore::new(structures.path())),
            Arc::new(SmilesValidator),
            Arc::new(Notify::new()),
        );
        let app = api::create_router(AppState::new(jobs, tool_descriptor("http://dock.test/")));

        Self {
            app,
            store,
            pool: None,
            structures,
            scratch,
        }
    }

    /// Full service with a worker pool running `script` as the docking program
    ///
    /// The script sees the per-job flags as `$1..$6`: protein path in `$2`,
    /// ligand in `$4`, output directory in `$6`.
    pub async fn with_pool(script: &str, workers: usize, job_timeout: Duration) -> Self {
        let structures = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        write_structure(structures.path(), "P12345");

        let store = Arc::new(MemoryJobStore::new());
        let wake = Arc::new(Notify::new());
        let preparer = Arc::new(LocalStructureStore::new(structures.path()));

        let backend = DiffDockBackend::new(
            "bash",
            vec!["-c".to_string(), script.to_string(), "diffdock".to_string()],
        );
        let runner = ComputeRunner::new(Arc::new(backend), scratch.path().to_path_buf(), job_timeout);

        let settings = PoolSettings {
            worker_count: workers,
            worker_prefix: "it".to_string(),
            poll_interval: Duration::from_millis(50),
            heartbeat_interval: Duration::from_millis(100),
            lease_timeout: Duration::from_secs(30),
            supervisor_interval: Duration::from_secs(5),
        };
        let pool = WorkerPool::new(
            settings,
            store.clone(),
            Arc::new(StandardExecutionService::new(preparer.clone(), runner)),
            CallbackNotifier::new(Duration::from_secs(2), 1).unwrap(),
            wake.clone(),
        )
        .start()
        .await
        .unwrap();

        let jobs = JobService::new(store.clone(), preparer, Arc::new(SmilesValidator), wake);
        let app = api::create_router(AppState::new(jobs, tool_descriptor("http://dock.test")));

        Self {
            app,
            store,
            pool: Some(pool),
            structures,
            scratch,
        }
    }

    pub async fn post(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_raw(&self, uri: &str, body: &'static str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn submit(&self, input_ref: &str, payload: &str, callback_url: &str) -> String {
        let (status, body) = self
            .post(
                "/jobs",
                serde_json::json!({
                    "input_ref": input_ref,
                    "payload": payload,
                    "callback_url": callback_url,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "submit failed: {}", body);
        body["job_id"].as_str().unwrap().to_string()
    }

    /// Polls the status endpoint until the job is terminal
    pub async fn wait_terminal(&self, job_id: &str) -> serde_json::Value {
        for _ in 0..500 {
            let (status, body) = self.get(&format!("/jobs/{}", job_id)).await;
            assert_eq!(status, StatusCode::OK);
            if body["status"] == "succeeded" || body["status"] == "failed" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }

    /// Polls until the job carries a delivery annotation
    pub async fn wait_delivery(&self, job_id: &str) -> serde_json::Value {
        for _ in 0..500 {
            let (_, body) = self.get(&format!("/jobs/{}", job_id)).await;
            if !body["delivery"].is_null() {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {} never recorded a delivery outcome", job_id);
    }

    /// Names left in the scratch base directory
    pub fn scratch_entries(&self) -> Vec<String> {
        std::fs::read_dir(self.scratch.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect()
    }

    pub async fn shutdown(mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown().await;
        }
    }
}

/// Callback endpoint that records every body it receives
#[derive(Clone)]
pub struct CallbackReceiver {
    pub url: String,
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl CallbackReceiver {
    pub async fn start() -> Self {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/cb", post(record))
            .with_state(bodies.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/cb", addr),
            bodies,
        }
    }

    pub async fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().await.clone()
    }

    /// Waits until at least `n` callbacks arrived
    pub async fn wait_for(&self, n: usize) -> Vec<serde_json::Value> {
        for _ in 0..500 {
            let bodies = self.bodies().await;
            if bodies.len() >= n {
                return bodies;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} callback(s)", n);
    }
}

async fn record(
    State(bodies): State<Arc<Mutex<Vec<serde_json::Value>>>>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    bodies.lock().await.push(body);
    StatusCode::OK
}

/// A callback URL on a port nobody listens on
pub async fn dead_callback_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/cb", addr)
}
