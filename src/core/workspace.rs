//! Workspace reset seam

use std::path::Path;

use crate::error::ResetError;

/// Restores a source checkout to its pristine state before each build
///
/// Implementations must be idempotent: resetting a clean tree is a no-op.
/// Uncommitted edits in the tree are discarded.
#[allow(async_fn_in_trait)]
pub trait WorkspaceResetter {
    /// Reset the checkout at `source_dir`
    async fn reset(&self, source_dir: &Path) -> Result<(), ResetError>;

    /// Shell-like rendering of what `reset` does, for plans
    fn describe(&self, source_dir: &Path) -> String {
        format!("reset {}", source_dir.display())
    }
}
