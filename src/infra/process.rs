//! Sub-process execution
//!
//! Runs build tools with an explicit working directory and the composed
//! environment layered over the host's. Output is captured, appended to the
//! invocation's log file and, on failure, its tail is attached to the error.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::defaults::OUTPUT_TAIL_LINES;
use crate::core::executor::CommandRunner;
use crate::core::recipe::Invocation;
use crate::error::ProcessError;

/// [`CommandRunner`] backed by real processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    log_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Runner without logs or time limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Append each invocation's output to `<dir>/<label>.log`
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Kill any invocation running longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn log_path(&self, invocation: &Invocation) -> Option<PathBuf> {
        let label = if invocation.label.is_empty() {
            "build"
        } else {
            invocation.label.as_str()
        };
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(format!("{label}.log")))
    }

    async fn append_log(&self, invocation: &Invocation, stdout: &[u8], stderr: &[u8]) {
        let Some(path) = self.log_path(invocation) else {
            return;
        };
        let result = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(format!("$ {}\n", invocation.command_line()).as_bytes())
                .await?;
            file.write_all(stdout).await?;
            file.write_all(stderr).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!("Could not write build log {}: {e}", path.display());
        }
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
        debug!(
            "Running in {}: {}",
            invocation.cwd.display(),
            invocation.command_line()
        );

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let spawn_error = |e: std::io::Error| ProcessError::Spawn {
            program: invocation.program.clone(),
            error: e.to_string(),
        };
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| ProcessError::TimedOut {
                    program: invocation.program.clone(),
                    secs: limit.as_secs(),
                })?
                .map_err(spawn_error)?,
            None => command.output().await.map_err(spawn_error)?,
        };

        self.append_log(invocation, &output.stdout, &output.stderr)
            .await;

        if output.status.success() {
            return Ok(());
        }

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        Err(ProcessError::NonZeroExit {
            program: invocation.program.clone(),
            code: output.status.code(),
            output: output_tail(&combined, OUTPUT_TAIL_LINES),
        })
    }
}

/// Last `lines` lines of captured output with terminal escapes removed
pub fn output_tail(output: &str, lines: usize) -> String {
    let plain = match Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]") {
        Ok(escapes) => escapes.replace_all(output, "").into_owned(),
        Err(_) => output.to_string(),
    };
    let kept: Vec<&str> = plain.lines().rev().take(lines).collect();
    kept.into_iter().rev().collect::<Vec<_>>().join("\n")
}
