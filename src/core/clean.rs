//! Clean logic
//!
//! Removes the installation prefix, which also holds the artifact, the
//! build logs and the build report. Source trees are left alone; the next
//! build resets them anyway.

use crate::core::config::ProjectLayout;
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Result of a clean
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanResult {
    /// Whether the prefix existed and was removed
    pub removed: bool,
}

/// Remove the installation prefix if present
pub fn clean_prefix(layout: &ProjectLayout) -> Result<CleanResult, FilesystemError> {
    if !layout.out_dir.exists() {
        return Ok(CleanResult::default());
    }
    filesystem::remove_dir_all(&layout.out_dir)?;
    Ok(CleanResult { removed: true })
}
