//! Test utilities
//!
//! Recording fakes for the execution seams, a throwaway project fixture and
//! proptest generators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::core::build_env::{HostToolchain, ToolchainEnvironment};
use crate::core::config::ProjectLayout;
use crate::core::executor::CommandRunner;
use crate::core::linker::LINK_LABEL;
use crate::core::profile::BuildProfile;
use crate::core::recipe::{AutotoolsStrategy, CMakeStrategy, Invocation, Recipe};
use crate::core::registry::RecipeRegistry;
use crate::core::workspace::WorkspaceResetter;
use crate::error::{ProcessError, ResetError};

/// What the faked link leaves on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkOutcome {
    /// Both artifacts, exit 0
    #[default]
    Complete,
    /// Only the loader, then a non-zero exit
    LoaderThenFail,
    /// Only the loader, exit 0
    LoaderOnly,
}

/// Runner that records invocations and fakes their effects
///
/// Any invocation with an `install` argument drops `lib<label>.a` into the
/// prefix; the link invocation writes the artifacts its [`LinkOutcome`]
/// asks for.
#[derive(Debug, Clone)]
pub struct FakeRunner {
    out_dir: PathBuf,
    calls: Arc<Mutex<Vec<Invocation>>>,
    fail: Option<(String, i32)>,
    link: LinkOutcome,
}

impl FakeRunner {
    /// Runner whose installs land in `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            calls: Arc::default(),
            fail: None,
            link: LinkOutcome::default(),
        }
    }

    /// Fail every invocation labelled `label` with `code`
    #[must_use]
    pub fn failing_on(mut self, label: &str, code: i32) -> Self {
        self.fail = Some((label.to_string(), code));
        self
    }

    /// Fake the link as `outcome`
    #[must_use]
    pub fn with_link(mut self, outcome: LinkOutcome) -> Self {
        self.link = outcome;
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

impl CommandRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
        self.calls.lock().unwrap().push(invocation.clone());

        if let Some((label, code)) = &self.fail {
            if *label == invocation.label {
                return Err(ProcessError::NonZeroExit {
                    program: invocation.program.clone(),
                    code: Some(*code),
                    output: format!("{label}: simulated failure"),
                });
            }
        }

        if invocation.label == LINK_LABEL {
            if let Some(at) = invocation.args.iter().position(|a| a == "-o") {
                let loader = PathBuf::from(&invocation.args[at + 1]);
                std::fs::write(&loader, "export default init;").unwrap();
                match self.link {
                    LinkOutcome::Complete => {
                        std::fs::write(loader.with_extension("wasm"), b"\0asm").unwrap();
                    }
                    LinkOutcome::LoaderThenFail => {
                        return Err(ProcessError::NonZeroExit {
                            program: invocation.program.clone(),
                            code: Some(1),
                            output: "wasm-ld: error: undefined symbol".to_string(),
                        });
                    }
                    LinkOutcome::LoaderOnly => {}
                }
            }
        } else if invocation.args.iter().any(|a| a == "install") {
            let lib = self.out_dir.join("lib");
            std::fs::create_dir_all(&lib).unwrap();
            std::fs::write(lib.join(format!("lib{}.a", invocation.label)), "!<arch>\n").unwrap();
        }
        Ok(())
    }
}

/// Resetter that records which trees it reset
#[derive(Debug, Clone, Default)]
pub struct FakeResetter {
    resets: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeResetter {
    /// Directories reset so far
    pub fn resets(&self) -> Vec<PathBuf> {
        self.resets.lock().unwrap().clone()
    }
}

impl WorkspaceResetter for FakeResetter {
    async fn reset(&self, source_dir: &Path) -> Result<(), ResetError> {
        self.resets.lock().unwrap().push(source_dir.to_path_buf());
        Ok(())
    }
}

/// Names in [`small_registry`]
pub const SMALL_REGISTRY: &[&str] = &["alpha", "beta", "app"];

/// Two libraries and an application
pub fn small_registry() -> RecipeRegistry {
    RecipeRegistry::new()
        .with(Recipe::new("alpha", AutotoolsStrategy::plain()).libraries(&["alpha"]))
        .with(
            Recipe::new("beta", CMakeStrategy::out_of_tree().archive("ALPHA_LIBRARY", "alpha"))
                .requires(&["alpha"])
                .libraries(&["beta"]),
        )
        .with(
            Recipe::new("app", AutotoolsStrategy::new().without_install())
                .requires(&["alpha", "beta"]),
        )
}

/// Project on disk with source trees for `names` and the loader scripts
pub fn fixture_project(names: &[&str]) -> (TempDir, ProjectLayout) {
    let temp = TempDir::new().unwrap();
    let layout = ProjectLayout::new(temp.path());
    for name in names {
        std::fs::create_dir_all(layout.source_dir(name)).unwrap();
    }
    std::fs::create_dir_all(&layout.js_dir).unwrap();
    std::fs::write(layout.js_dir.join("pre.js"), "// pre").unwrap();
    std::fs::write(layout.js_dir.join("post.js"), "// post").unwrap();
    (temp, layout)
}

/// Environment over a layout's prefix
pub fn environment(layout: &ProjectLayout, profile: BuildProfile) -> ToolchainEnvironment {
    ToolchainEnvironment::compose(profile, 2, &HostToolchain::new("/opt/emsdk"), layout.prefix())
}

pub mod generators {
    use proptest::prelude::*;

    use crate::core::profile::BuildProfile;

    /// Either profile
    pub fn profile() -> impl Strategy<Value = BuildProfile> {
        prop_oneof![Just(BuildProfile::Release), Just(BuildProfile::Debug)]
    }

    /// Index of the recipe that fails, or none
    pub fn failure_point(len: usize) -> impl Strategy<Value = Option<usize>> {
        proptest::option::of(0..len)
    }
}
