//! Step execution seam
//!
//! Recipes describe work as [`Step`]s; this module runs them. External
//! programs go through a [`CommandRunner`] so the pipeline can be driven by
//! a recording fake in tests.

use std::path::Path;

use crate::core::recipe::{Invocation, Step};
use crate::error::{ProcessError, StepError};
use crate::infra::filesystem;

/// Runs one external program to completion
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run the invocation and wait for it
    ///
    /// A non-zero exit is an error carrying the captured output tail.
    async fn run(&self, invocation: &Invocation) -> Result<(), ProcessError>;
}

/// Execute a single step
pub async fn execute_step<R: CommandRunner>(runner: &R, step: &Step) -> Result<(), StepError> {
    match step {
        Step::Run(invocation) => runner.run(invocation).await?,
        Step::CreateDir { path } => filesystem::create_dir_all(path)?,
        Step::CopyFile { from, to } => copy_into_place(from, to)?,
    }
    Ok(())
}

fn copy_into_place(from: &Path, to: &Path) -> Result<(), StepError> {
    if let Some(parent) = to.parent() {
        filesystem::create_dir_all(parent)?;
    }
    filesystem::copy_file(from, to)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl CommandRunner for Recorder {
        async fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
            self.seen.lock().unwrap().push(invocation.command_line());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_step_goes_through_runner() {
        let runner = Recorder::default();
        let step = Step::Run(Invocation::new("emmake", "/src").arg("make"));

        execute_step(&runner, &step).await.unwrap();

        assert_eq!(*runner.seen.lock().unwrap(), vec!["emmake make".to_string()]);
    }

    #[tokio::test]
    async fn test_filesystem_steps_touch_disk_only() {
        let temp = TempDir::new().unwrap();
        let runner = Recorder::default();
        let pc = temp.path().join("lib/pkgconfig");
        std::fs::create_dir_all(&pc).unwrap();
        std::fs::write(pc.join("fftw.pc"), "Name: fftw").unwrap();

        execute_step(
            &runner,
            &Step::CreateDir {
                path: temp.path().join("__build"),
            },
        )
        .await
        .unwrap();
        execute_step(
            &runner,
            &Step::CopyFile {
                from: pc.join("fftw.pc"),
                to: pc.join("fftw3.pc"),
            },
        )
        .await
        .unwrap();

        assert!(temp.path().join("__build").is_dir());
        assert_eq!(std::fs::read_to_string(pc.join("fftw3.pc")).unwrap(), "Name: fftw");
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_copy_of_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let result = execute_step(
            &Recorder::default(),
            &Step::CopyFile {
                from: temp.path().join("absent.pc"),
                to: temp.path().join("alias.pc"),
            },
        )
        .await;

        assert!(matches!(result, Err(StepError::Filesystem(_))));
    }
}
