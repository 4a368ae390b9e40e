//! Build report
//!
//! Written to `out/build-report.json` after a successful run: timings,
//! what each recipe added to the prefix, and digests of the artifacts.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use crate::core::profile::BuildProfile;
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// One recipe's contribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeTiming {
    pub name: String,
    pub duration_ms: u64,
    /// Files that appeared in the prefix while this recipe ran
    pub files_added: usize,
}

/// One produced file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDigest {
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// Summary of a successful pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub profile: BuildProfile,
    pub jobs: usize,
    pub recipes: Vec<RecipeTiming>,
    pub link_ms: u64,
    pub artifacts: Vec<ArtifactDigest>,
}

impl BuildReport {
    /// Empty report for a run
    pub fn new(profile: BuildProfile, jobs: usize) -> Self {
        Self {
            profile,
            jobs,
            recipes: Vec::new(),
            link_ms: 0,
            artifacts: Vec::new(),
        }
    }

    /// Total wall-clock time across recipes and link
    pub fn total_ms(&self) -> u64 {
        self.recipes
            .iter()
            .map(|r| r.duration_ms)
            .sum::<u64>()
            .saturating_add(self.link_ms)
    }

    /// Serialize to `path`
    pub fn write(&self, path: &Path) -> Result<(), FilesystemError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| FilesystemError::WriteFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        filesystem::write_file(path, &json)
    }
}

/// Milliseconds, saturating
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Count regular files under `root`, skipping the `exclude` subtree
pub fn count_files(root: &Path, exclude: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !entry.path().starts_with(exclude))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count()
}

/// Size and SHA-256 of a file
pub fn digest(path: &Path) -> Result<ArtifactDigest, FilesystemError> {
    let read_error = |e: std::io::Error| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    };
    let mut file = File::open(path).map_err(read_error)?;
    let mut hasher = Sha256::new();
    let bytes = std::io::copy(&mut file, &mut hasher).map_err(read_error)?;

    Ok(ArtifactDigest {
        path: path.to_path_buf(),
        bytes,
        sha256: hex::encode(hasher.finalize()),
    })
}
