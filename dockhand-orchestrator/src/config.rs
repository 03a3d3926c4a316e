//! Orchestrator configuration
//!
//! Defines all configurable parameters: the HTTP bind address, the job store,
//! worker pool sizing and timings, the docking backend invocation and callback
//! delivery.

use std::path::PathBuf;
use std::time::Duration;

/// Orchestrator configuration
///
/// All timeouts and intervals are configurable to allow tuning for different
/// deployment scenarios (a laptop with a mock backend vs. a GPU box).
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API listens on
    pub bind_addr: String,

    /// PostgreSQL URL; `None` keeps jobs in memory
    pub database_url: Option<String>,

    /// Terminal jobs the in-memory store keeps before evicting the oldest
    pub memory_retained_jobs: usize,

    /// Number of concurrent workers
    pub worker_count: usize,

    /// How often an idle worker re-checks the queue
    pub poll_interval: Duration,

    /// How often a busy worker renews its lease
    pub heartbeat_interval: Duration,

    /// Running jobs whose lease is older than this are failed as crashed
    pub lease_timeout: Duration,

    /// How often the supervisor sweeps for expired leases
    pub supervisor_interval: Duration,

    /// Maximum time a docking run may take
    pub job_timeout: Duration,

    /// Base directory for per-job scratch directories
    pub scratch_dir: PathBuf,

    /// Directory holding `<id>.pdb` / `<id>.pdb.gz` structures
    pub structure_dir: PathBuf,

    /// Docking program and the arguments placed before the per-job flags
    pub diffdock_program: String,
    pub diffdock_args: Vec<String>,

    /// Working directory for the docking program
    pub diffdock_workdir: Option<PathBuf>,

    /// Per-attempt timeout for callback requests
    pub callback_timeout: Duration,

    /// Total callback attempts per job (1 = no retries)
    pub callback_max_attempts: u32,

    /// Public base URL advertised in the tool descriptor
    pub public_url: String,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognised variables (all optional):
    /// - BIND_ADDR (default: 0.0.0.0:8080)
    /// - DATABASE_URL (default: unset, in-memory store)
    /// - MEMORY_RETAINED_JOBS (default: 10000)
    /// - WORKER_COUNT (default: 2)
    /// - POLL_INTERVAL, HEARTBEAT_INTERVAL, LEASE_TIMEOUT, SUPERVISOR_INTERVAL (seconds)
    /// - JOB_TIMEOUT (seconds, default: 3600)
    /// - SCRATCH_DIR, STRUCTURE_DIR
    /// - DIFFDOCK_PROGRAM, DIFFDOCK_ARGS (whitespace separated), DIFFDOCK_WORKDIR
    /// - CALLBACK_TIMEOUT (seconds), CALLBACK_MAX_ATTEMPTS
    /// - TOOL_PUBLIC_URL
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let secs = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds, got '{}'", key, raw)),
                None => Ok(default),
            }
        };

        let worker_count = match lookup("WORKER_COUNT") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("WORKER_COUNT must be a number, got '{}'", raw))?,
            None => defaults.worker_count,
        };

        let memory_retained_jobs = match lookup("MEMORY_RETAINED_JOBS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                anyhow::anyhow!("MEMORY_RETAINED_JOBS must be a number, got '{}'", raw)
            })?,
            None => defaults.memory_retained_jobs,
        };

        let callback_max_attempts = match lookup("CALLBACK_MAX_ATTEMPTS") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                anyhow::anyhow!("CALLBACK_MAX_ATTEMPTS must be a number, got '{}'", raw)
            })?,
            None => defaults.callback_max_attempts,
        };

        let diffdock_args = lookup("DIFFDOCK_ARGS")
            .map(|raw| raw.split_whitespace().map(String::from).collect())
            .unwrap_or(defaults.diffdock_args);

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            memory_retained_jobs,
            worker_count,
            poll_interval: secs("POLL_INTERVAL", defaults.poll_interval)?,
            heartbeat_interval: secs("HEARTBEAT_INTERVAL", defaults.heartbeat_interval)?,
            lease_timeout: secs("LEASE_TIMEOUT", defaults.lease_timeout)?,
            supervisor_interval: secs("SUPERVISOR_INTERVAL", defaults.supervisor_interval)?,
            job_timeout: secs("JOB_TIMEOUT", defaults.job_timeout)?,
            scratch_dir: lookup("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            structure_dir: lookup("STRUCTURE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.structure_dir),
            diffdock_program: lookup("DIFFDOCK_PROGRAM").unwrap_or(defaults.diffdock_program),
            diffdock_args,
            diffdock_workdir: lookup("DIFFDOCK_WORKDIR").map(PathBuf::from),
            callback_timeout: secs("CALLBACK_TIMEOUT", defaults.callback_timeout)?,
            callback_max_attempts,
            public_url: lookup("TOOL_PUBLIC_URL").unwrap_or(defaults.public_url),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.memory_retained_jobs == 0 {
            anyhow::bail!("memory_retained_jobs must be greater than 0");
        }

        if self.worker_count == 0 {
            anyhow::bail!("worker_count must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.heartbeat_interval.is_zero() {
            anyhow::bail!("heartbeat_interval must be greater than 0");
        }

        if self.lease_timeout <= self.heartbeat_interval {
            anyhow::bail!("lease_timeout must be longer than heartbeat_interval");
        }

        if self.supervisor_interval.is_zero() {
            anyhow::bail!("supervisor_interval must be greater than 0");
        }

        if self.job_timeout.is_zero() {
            anyhow::bail!("job_timeout must be greater than 0");
        }

        if self.diffdock_program.trim().is_empty() {
            anyhow::bail!("diffdock_program cannot be empty");
        }

        if self.callback_max_attempts == 0 {
            anyhow::bail!("callback_max_attempts must be at least 1");
        }

        if !self.public_url.starts_with("http://") && !self.public_url.starts_with("https://") {
            anyhow::bail!("public_url must start with http:// or https://");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: None,
            memory_retained_jobs: crate::repository::memory::DEFAULT_RETAINED_JOBS,
            worker_count: 2,
            poll_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(15),
            lease_timeout: Duration::from_secs(120),
            supervisor_interval: Duration::from_secs(30),
            job_timeout: Duration::from_secs(3600), // 1 hour
            scratch_dir: std::env::temp_dir(),
            structure_dir: PathBuf::from("./local_proteins"),
            diffdock_program: "python".to_string(),
            diffdock_args: ["-m", "inference", "--config", "default_inference_args.yaml"]
                .into_iter()
                .map(String::from)
                .collect(),
            diffdock_workdir: None,
            callback_timeout: Duration::from_secs(10),
            callback_max_attempts: 1,
            public_url: "http://localhost:8080".to_string(),
        }
    }
}
