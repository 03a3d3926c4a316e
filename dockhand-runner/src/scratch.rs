//! Per-job scratch directories
//!
//! The directory is removed when the guard is dropped, which covers normal
//! returns, early `?` exits, panics unwinding through the runner and
//! cancelled futures alike.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Creates `<base>/dockhand-<job_id>`, removing leftovers from a previous attempt
    pub fn create(base: &Path, job_id: Uuid) -> std::io::Result<Self> {
        let path = base.join(format!("dockhand-{}", job_id));

        if path.exists() {
            warn!("Removing stale scratch directory {}", path.display());
            std::fs::remove_dir_all(&path)?;
        }
        std::fs::create_dir_all(&path)?;

        debug!("Created scratch directory {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed scratch directory {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove scratch directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
