//! Result artifact discovery
//!
//! DiffDock writes its top pose as `complex_0/rank1_confidence<score>.sdf`
//! under the output directory. All file-name parsing lives here.

use std::path::Path;
use tracing::warn;

use crate::backend::{Artifact, ComputeFault};

/// Subdirectory of the output directory that holds ranked poses
pub const RESULT_SUBDIR: &str = "complex_0";

/// File name prefix of the top-ranked pose
pub const ARTIFACT_PREFIX: &str = "rank1_confidence";

/// File name suffix of pose files
pub const ARTIFACT_SUFFIX: &str = ".sdf";

/// Extracts the score embedded in an artifact file name
///
/// Returns `None` when the name does not match the pattern or the embedded
/// number is not a finite float.
pub fn parse_score(file_name: &str) -> Option<f64> {
    let digits = file_name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_SUFFIX)?;

    digits.parse::<f64>().ok().filter(|score| score.is_finite())
}

fn matches_pattern(file_name: &str) -> bool {
    file_name.starts_with(ARTIFACT_PREFIX) && file_name.ends_with(ARTIFACT_SUFFIX)
}

/// Locates the top-ranked artifact under `out_dir`
///
/// Distinguishes a missing result directory from an empty one. If several
/// files match, the lexicographically first is used.
pub fn locate(out_dir: &Path) -> Result<Artifact, ComputeFault> {
    let result_dir = out_dir.join(RESULT_SUBDIR);
    if !result_dir.is_dir() {
        return Err(ComputeFault::NoResultDir(result_dir));
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(&result_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if matches_pattern(name) {
                candidates.push(name.to_string());
            }
        }
    }

    candidates.sort();
    let Some(name) = candidates.first() else {
        return Err(ComputeFault::NoArtifact(result_dir));
    };

    if candidates.len() > 1 {
        warn!(
            "Found {} artifacts in {}, using {}",
            candidates.len(),
            result_dir.display(),
            name
        );
    }

    let score = parse_score(name).ok_or_else(|| ComputeFault::MalformedArtifact(name.clone()))?;

    Ok(Artifact {
        score,
        path: result_dir.join(name),
    })
}
