//! DiffDock process backend
//!
//! Spawns the DiffDock inference entry point as a child process:
//!
//! ```text
//! <program> <args...> --protein_path <input> --ligand <params> --out_dir <workdir>
//! ```
//!
//! On Unix the child leads its own process group. Whatever way the run ends,
//! the whole group is killed and waited for before `run` returns, so nothing
//! the tool forked outlives the job or writes into its scratch directory.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::artifact;
use crate::backend::{Artifact, ComputeBackend, ComputeFault};

/// Captured stderr is cut to its last this-many bytes
pub const MAX_STDERR_BYTES: usize = 16 * 1024;

/// How long to wait for a killed process group to disappear
const GROUP_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// DiffDock invoked as an external program
#[derive(Debug, Clone)]
pub struct DiffDockBackend {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl DiffDockBackend {
    /// Creates a backend that runs `program` with `args` before the per-job flags
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Runs the process from `dir` (usually the DiffDock checkout)
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The program resolved from the configured working directory
    fn base_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }

    fn command(&self) -> Command {
        let mut command = self.base_command();
        command.args(&self.args);
        command
    }
}

impl Default for DiffDockBackend {
    fn default() -> Self {
        Self::new(
            "python",
            ["-m", "inference", "--config", "default_inference_args.yaml"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }
}

#[async_trait]
impl ComputeBackend for DiffDockBackend {
    fn name(&self) -> &str {
        "diffdock"
    }

    async fn check_available(&self) -> Result<(), ComputeFault> {
        if let Some(dir) = &self.working_dir {
            if !dir.is_dir() {
                return Err(ComputeFault::Unavailable(format!(
                    "working directory {} does not exist",
                    dir.display()
                )));
            }
        }

        let output = self
            .base_command()
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ComputeFault::Unavailable(format!(
                    "failed to execute '{} --version': {}",
                    self.program, e
                ))
            })?;

        if !output.status.success() {
            return Err(ComputeFault::Unavailable(format!(
                "'{} --version' exited with {}",
                self.program, output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        let version = if version.trim().is_empty() {
            String::from_utf8_lossy(&output.stderr)
        } else {
            version
        };
        info!("Docking runtime is available: {}", version.trim());

        Ok(())
    }

    async fn run(
        &self,
        input: &Path,
        params: &str,
        workdir: &Path,
        deadline: Duration,
    ) -> Result<Artifact, ComputeFault> {
        debug!(
            "Running {} on {} (out_dir {})",
            self.program,
            input.display(),
            workdir.display()
        );

        let mut command = self.command();
        command
            .arg("--protein_path")
            .arg(input)
            .arg("--ligand")
            .arg(params)
            .arg("--out_dir")
            .arg(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(ComputeFault::Spawn)?;
        let mut group = ProcessGroup::of(&child);
        let stderr = capture_stderr(&mut child);

        let waited = tokio::time::timeout(deadline, child.wait()).await;

        // Stragglers the tool left behind go with it, on every path
        group.kill();
        let status = match waited {
            Ok(status) => Some(status?),
            Err(_) => {
                let _ = child.wait().await;
                None
            }
        };
        group.wait_empty().await;

        let stderr = match stderr.await {
            Ok(bytes) => tail_lossy(&bytes, MAX_STDERR_BYTES),
            Err(e) => {
                warn!("stderr reader for {} failed: {}", self.program, e);
                String::new()
            }
        };

        let Some(status) = status else {
            debug!("Docking process killed after {:?}", deadline);
            return Err(ComputeFault::TimedOut(deadline));
        };

        check_status(status, stderr)?;
        debug!("Docking process completed");

        artifact::locate(workdir)
    }
}

fn check_status(status: ExitStatus, stderr: String) -> Result<(), ComputeFault> {
    if status.success() {
        return Ok(());
    }
    debug!(
        "Docking process failed: status={} stderr='{}'",
        status,
        stderr.trim()
    );
    Err(ComputeFault::ProcessFailed {
        exit_code: status.code(),
        stderr,
    })
}

/// Drains stderr in the background so a chatty tool never blocks on the pipe
fn capture_stderr(child: &mut Child) -> JoinHandle<Vec<u8>> {
    let pipe = child.stderr.take();
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    })
}

/// The process group led by a spawned child
///
/// Killed when dropped as well, which covers a caller abandoning `run`.
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self {
            pgid: child.id().and_then(|pid| i32::try_from(pid).ok()),
        }
    }

    #[cfg(unix)]
    fn kill(&self) {
        if let Some(pgid) = self.pgid {
            // Safety: killpg only sends a signal; ESRCH for an empty group is fine.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}

    #[cfg(unix)]
    fn is_alive(&self) -> bool {
        match self.pgid {
            // Safety: signal 0 performs only the existence check.
            Some(pgid) => unsafe { libc::killpg(pgid, 0) == 0 },
            None => false,
        }
    }

    #[cfg(not(unix))]
    fn is_alive(&self) -> bool {
        false
    }

    /// Waits until no member of the group is left, then forgets the id
    async fn wait_empty(&mut self) {
        let start = tokio::time::Instant::now();
        while self.is_alive() {
            if start.elapsed() >= GROUP_EXIT_TIMEOUT {
                warn!(
                    "Process group {:?} still alive {:?} after SIGKILL",
                    self.pgid, GROUP_EXIT_TIMEOUT
                );
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Decodes the last `max` bytes of `bytes`, replacing invalid UTF-8
fn tail_lossy(bytes: &[u8], max: usize) -> String {
    let start = bytes.len().saturating_sub(max);
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}
