//! Common test utilities and helpers
//!
//! Shared project fixture and recording fakes for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

use magick_forge::core::dependency::PINNED_SOURCES;
use magick_forge::core::executor::CommandRunner;
use magick_forge::core::linker::LINK_LABEL;
use magick_forge::core::recipe::Invocation;
use magick_forge::core::workspace::WorkspaceResetter;
use magick_forge::error::{ProcessError, ResetError};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new, empty test project
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Project with every pinned source tree and both loader scripts
    pub fn with_sources() -> Self {
        let project = Self::new();
        for pin in PINNED_SOURCES {
            project.create_dir(&format!("lib/{}", pin.name));
        }
        project.create_file("js/pre.js", "// pre\n");
        project.create_file("js/post.js", "// post\n");
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run the binary against this project
    ///
    /// `EMSDK` is set to `emsdk` when given and removed otherwise.
    pub fn run(&self, args: &[&str], emsdk: Option<&Path>) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_magick-forge"));
        cmd.arg("-C").arg(self.path()).args(args);
        cmd.env_remove("RELEASE").env_remove("MAGICK_FORGE_DIR");
        match emsdk {
            Some(root) => cmd.env("EMSDK", root),
            None => cmd.env_remove("EMSDK"),
        };
        cmd.output().expect("Failed to execute magick-forge")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Runner that records invocations instead of spawning them
///
/// Installs drop `lib<label>.a` and `<label>.pc` into the prefix; the link
/// writes both artifacts.
#[derive(Debug, Clone)]
pub struct RecordingRunner {
    out_dir: PathBuf,
    calls: Arc<Mutex<Vec<Invocation>>>,
    fail_label: Option<String>,
}

impl RecordingRunner {
    /// Runner whose installs land in `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            calls: Arc::default(),
            fail_label: None,
        }
    }

    /// Fail every invocation labelled `label` with status 2
    #[must_use]
    pub fn failing_on(mut self, label: &str) -> Self {
        self.fail_label = Some(label.to_string());
        self
    }

    /// Everything run so far
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Distinct labels in first-seen order
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for call in self.calls() {
            if !labels.contains(&call.label) {
                labels.push(call.label);
            }
        }
        labels
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
        self.calls.lock().unwrap().push(invocation.clone());

        if self.fail_label.as_deref() == Some(invocation.label.as_str()) {
            return Err(ProcessError::NonZeroExit {
                program: invocation.program.clone(),
                code: Some(2),
                output: "make: *** [all] Error 2".to_string(),
            });
        }

        if invocation.label == LINK_LABEL {
            let at = invocation.args.iter().position(|a| a == "-o").unwrap();
            let loader = PathBuf::from(&invocation.args[at + 1]);
            std::fs::write(&loader, "export default init;").unwrap();
            std::fs::write(loader.with_extension("wasm"), b"\0asm").unwrap();
        } else if invocation.args.iter().any(|a| a == "install") {
            let pkgconfig = self.out_dir.join("lib/pkgconfig");
            std::fs::create_dir_all(&pkgconfig).unwrap();
            let label = &invocation.label;
            std::fs::write(self.out_dir.join(format!("lib/lib{label}.a")), "!<arch>\n").unwrap();
            std::fs::write(pkgconfig.join(format!("{label}.pc")), "Name: x\n").unwrap();
        }
        Ok(())
    }
}

/// Resetter that only records
#[derive(Debug, Clone, Default)]
pub struct RecordingResetter {
    resets: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingResetter {
    /// Directories reset so far
    pub fn resets(&self) -> Vec<PathBuf> {
        self.resets.lock().unwrap().clone()
    }
}

impl WorkspaceResetter for RecordingResetter {
    async fn reset(&self, source_dir: &Path) -> Result<(), ResetError> {
        self.resets.lock().unwrap().push(source_dir.to_path_buf());
        Ok(())
    }
}
