//! Input preparation
//!
//! Resolves an opaque input reference to a ready-to-use structure file.
//! The default store keeps `<id>.pdb` files, optionally gzip-compressed as
//! `<id>.pdb.gz`, in a single directory.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use dockhand_core::domain::{ErrorKind, JobFailure};

/// Structures smaller than this are treated as placeholders
pub const MIN_STRUCTURE_BYTES: u64 = 500;

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("No PDB or PDB.GZ for {0}")]
    NotFound(String),

    #[error("PDB file for {input_ref} is too small ({size} bytes)")]
    TooSmall { input_ref: String, size: u64 },

    #[error("Failed to prepare structure for {input_ref}: {source}")]
    Io {
        input_ref: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<PrepareError> for JobFailure {
    fn from(err: PrepareError) -> Self {
        let kind = match err {
            PrepareError::NotFound(_) | PrepareError::TooSmall { .. } => ErrorKind::InputNotFound,
            PrepareError::Io { .. } => ErrorKind::Internal,
        };
        JobFailure::new(kind, err.to_string())
    }
}

/// Source of prepared structure files
#[async_trait]
pub trait InputPreparer: Send + Sync {
    /// Cheap check used at admission: could `prepare` possibly succeed?
    async fn resolvable(&self, input_ref: &str) -> bool;

    /// Returns a path to a validated structure file for `input_ref`
    async fn prepare(&self, input_ref: &str) -> Result<PathBuf, PrepareError>;
}

/// Structure files kept in a local directory
#[derive(Debug, Clone)]
pub struct LocalStructureStore {
    root: PathBuf,
    min_bytes: u64,
}

impl LocalStructureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            min_bytes: MIN_STRUCTURE_BYTES,
        }
    }

    fn pdb_path(&self, input_ref: &str) -> PathBuf {
        self.root.join(format!("{}.pdb", input_ref))
    }

    fn gz_path(&self, input_ref: &str) -> PathBuf {
        self.root.join(format!("{}.pdb.gz", input_ref))
    }

    fn prepare_blocking(&self, input_ref: &str) -> Result<PathBuf, PrepareError> {
        let io_err = |source| PrepareError::Io {
            input_ref: input_ref.to_string(),
            source,
        };

        let pdb = self.pdb_path(input_ref);
        if !pdb.is_file() {
            let gz = self.gz_path(input_ref);
            if !gz.is_file() {
                return Err(PrepareError::NotFound(input_ref.to_string()));
            }
            info!("Decompressing {}", gz.display());
            decompress(&gz, &pdb).map_err(io_err)?;
        }

        let size = std::fs::metadata(&pdb).map_err(io_err)?.len();
        if size < self.min_bytes {
            return Err(PrepareError::TooSmall {
                input_ref: input_ref.to_string(),
                size,
            });
        }

        debug!("Prepared structure {} ({} bytes)", pdb.display(), size);
        Ok(pdb)
    }
}

/// Decompresses `gz` into `dest` through a temporary file and a rename, so
/// concurrent preparations of the same input never see a partial file.
fn decompress(gz: &Path, dest: &Path) -> std::io::Result<()> {
    let partial = dest.with_extension(format!("pdb.{}.part", Uuid::new_v4()));

    let result = (|| {
        let mut decoder = GzDecoder::new(BufReader::new(File::open(gz)?));
        let mut out = File::create(&partial)?;
        std::io::copy(&mut decoder, &mut out)?;
        out.sync_all()?;
        std::fs::rename(&partial, dest)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    result
}

#[async_trait]
impl InputPreparer for LocalStructureStore {
    async fn resolvable(&self, input_ref: &str) -> bool {
        self.pdb_path(input_ref).is_file() || self.gz_path(input_ref).is_file()
    }

    async fn prepare(&self, input_ref: &str) -> Result<PathBuf, PrepareError> {
        let store = self.clone();
        let owned_ref = input_ref.to_string();

        tokio::task::spawn_blocking(move || store.prepare_blocking(&owned_ref))
            .await
            .map_err(|e| PrepareError::Io {
                input_ref: input_ref.to_string(),
                source: std::io::Error::other(e),
            })?
    }
}
