//! Git operations
//!
//! Resets dependency checkouts through the `git` CLI and inspects their
//! HEAD with the gix crate.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::core::executor::CommandRunner;
use crate::core::recipe::Invocation;
use crate::core::workspace::WorkspaceResetter;
use crate::error::ResetError;
use crate::infra::filesystem;

/// Git inspection errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Not a repository
    #[error("Invalid repository at '{path}': {error}")]
    InvalidRepository { path: PathBuf, error: String },

    /// HEAD could not be resolved to a commit
    #[error("Failed to resolve HEAD in '{path}': {error}")]
    ResolveFailed { path: PathBuf, error: String },
}

/// Whether `path` is the root of a git checkout
pub fn is_checkout(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Commit SHA the checkout's HEAD points at
pub fn head_revision(path: &Path) -> Result<String, GitError> {
    let repo = gix::open(path).map_err(|e| GitError::InvalidRepository {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    let id = repo.head_id().map_err(|e| GitError::ResolveFailed {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(id.to_hex().to_string())
}

/// Resets a checkout with `git clean -xdf` followed by `git checkout .`
///
/// Afterwards a `configure` script at the root, if any, is made executable.
#[derive(Debug, Clone)]
pub struct GitResetter<R> {
    runner: R,
}

impl<R: CommandRunner> GitResetter<R> {
    /// Reset through the given runner
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// The two git invocations a reset performs
    pub fn invocations(source_dir: &Path) -> [Invocation; 2] {
        let label = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        [
            Invocation::new("git", source_dir)
                .args(["clean", "-xdf"])
                .label(label.clone()),
            Invocation::new("git", source_dir)
                .args(["checkout", "."])
                .label(label),
        ]
    }
}

impl<R: CommandRunner> WorkspaceResetter for GitResetter<R> {
    async fn reset(&self, source_dir: &Path) -> Result<(), ResetError> {
        if !is_checkout(source_dir) {
            return Err(ResetError::NotACheckout {
                path: source_dir.to_path_buf(),
            });
        }

        for invocation in Self::invocations(source_dir) {
            self.runner
                .run(&invocation)
                .await
                .map_err(|source| ResetError::Command {
                    path: source_dir.to_path_buf(),
                    source,
                })?;
        }

        let configure = source_dir.join("configure");
        if configure.is_file() {
            debug!("Marking {} executable", configure.display());
            filesystem::make_executable(&configure).map_err(|source| ResetError::Prepare {
                path: source_dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    fn describe(&self, source_dir: &Path) -> String {
        let commands = Self::invocations(source_dir)
            .iter()
            .map(Invocation::command_line)
            .collect::<Vec<_>>()
            .join(" && ");
        format!(
            "cd {} && {commands} && chmod +x configure (if present)",
            source_dir.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessError;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CommandRunner for &Recorder {
        async fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
            self.seen.lock().unwrap().push(invocation.command_line());
            if self.fail {
                return Err(ProcessError::NonZeroExit {
                    program: invocation.program.clone(),
                    code: Some(128),
                    output: "fatal: not a git repository".to_string(),
                });
            }
            Ok(())
        }
    }

    fn checkout() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        temp
    }

    #[tokio::test]
    async fn test_reset_cleans_then_restores() {
        let temp = checkout();
        let recorder = Recorder::default();

        GitResetter::new(&recorder).reset(temp.path()).await.unwrap();

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec!["git clean -xdf".to_string(), "git checkout .".to_string()]
        );
    }

    #[tokio::test]
    async fn test_reset_twice_issues_same_commands() {
        let temp = checkout();
        let recorder = Recorder::default();
        let resetter = GitResetter::new(&recorder);

        resetter.reset(temp.path()).await.unwrap();
        resetter.reset(temp.path()).await.unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[..2], seen[2..]);
    }

    #[tokio::test]
    async fn test_non_checkout_is_rejected_before_running_git() {
        let temp = TempDir::new().unwrap();
        let recorder = Recorder::default();

        let err = GitResetter::new(&recorder)
            .reset(temp.path())
            .await
            .unwrap_err();

        assert!(matches!(err, ResetError::NotACheckout { .. }));
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_git_failure_is_reset_error() {
        let temp = checkout();
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };

        let err = GitResetter::new(&recorder)
            .reset(temp.path())
            .await
            .unwrap_err();

        match err {
            ResetError::Command { source, .. } => assert_eq!(source.exit_code(), Some(128)),
            other => panic!("expected command failure, got {other:?}"),
        }
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_configure_becomes_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = checkout();
        let configure = temp.path().join("configure");
        std::fs::write(&configure, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&configure, std::fs::Permissions::from_mode(0o644)).unwrap();
        let recorder = Recorder::default();

        GitResetter::new(&recorder).reset(temp.path()).await.unwrap();

        let mode = std::fs::metadata(&configure).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn test_describe_names_the_tree_and_every_action() {
        let recorder = Recorder::default();
        let text = GitResetter::new(&recorder).describe(Path::new("/w/lib/png"));

        assert_eq!(
            text,
            "cd /w/lib/png && git clean -xdf && git checkout . && chmod +x configure (if present)"
        );
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invocations_are_labelled_by_directory() {
        let [clean, checkout] = GitResetter::<&Recorder>::invocations(Path::new("/w/lib/aom"));
        assert_eq!(clean.label, "aom");
        assert_eq!(checkout.cwd, PathBuf::from("/w/lib/aom"));
    }

    #[test]
    fn test_head_revision_of_non_repository_fails() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            head_revision(temp.path()),
            Err(GitError::InvalidRepository { .. })
        ));
    }
}
