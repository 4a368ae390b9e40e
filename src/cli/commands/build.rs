//! Build command implementation
//!
//! Implements `magick-forge build`, the default command: runs the whole
//! pipeline and reports the artifact.

use anyhow::Result;
use std::path::Path;

use crate::cli::output::{create_build_bar, print_detail, print_success};
use crate::core::build_env::{HostToolchain, ToolchainEnvironment};
use crate::core::config::{ForgeConfig, ProjectLayout};
use crate::core::orchestrator::{Orchestrator, PipelineState};
use crate::core::profile::BuildProfile;
use crate::core::registry::RecipeRegistry;
use crate::error::ForgeError;
use crate::infra::git::GitResetter;
use crate::infra::process::ProcessRunner;
use crate::infra::toolchain::{self, REQUIRED_TOOLS};

/// Configuration, layout and environment for one invocation
pub struct Project {
    pub config: ForgeConfig,
    pub layout: ProjectLayout,
    pub env: ToolchainEnvironment,
}

impl Project {
    /// Load `magick-forge.toml` and compose the environment for `host`
    pub fn load(project_dir: &Path, jobs: Option<usize>, host: &HostToolchain) -> Result<Self> {
        let config = ForgeConfig::load(project_dir).map_err(ForgeError::from)?;
        let layout = config.layout(project_dir);
        let env = ToolchainEnvironment::compose(
            BuildProfile::from_env(),
            config.jobs(jobs),
            host,
            layout.prefix(),
        );
        Ok(Self {
            config,
            layout,
            env,
        })
    }

    /// Real-process pipeline over the standard registry
    pub fn orchestrator(&self) -> Orchestrator<ProcessRunner, GitResetter<ProcessRunner>> {
        let runner = ProcessRunner::new()
            .with_log_dir(self.layout.log_dir())
            .with_timeout(self.config.step_timeout());
        Orchestrator::new(
            RecipeRegistry::standard(),
            self.env.clone(),
            self.layout.clone(),
            runner.clone(),
            GitResetter::new(runner),
        )
        .with_required_tools(REQUIRED_TOOLS, toolchain::locate)
    }
}

/// Execute the build command
pub async fn execute(project_dir: &Path, jobs: Option<usize>) -> Result<()> {
    let host = HostToolchain::from_env().map_err(ForgeError::from)?;
    let project = Project::load(project_dir, jobs, &host)?;
    let log_dir = project.layout.log_dir();

    tracing::info!(
        "Building {} profile with {} jobs into {}",
        project.env.profile(),
        project.env.jobs(),
        project.layout.out_dir.display()
    );

    let registry_len = RecipeRegistry::standard().len() as u64;
    let observed = create_build_bar(registry_len + 1);
    let mut started = 0u64;
    let mut orchestrator = project.orchestrator().with_observer(move |state| match state {
        PipelineState::Resetting(name) => {
            observed.set_position(started);
            observed.set_message(format!("{name} (reset)"));
            started += 1;
        }
        PipelineState::Building(name) => observed.set_message(name.clone()),
        PipelineState::Linking => {
            observed.set_position(registry_len);
            observed.set_message("link");
        }
        PipelineState::Done => observed.finish_and_clear(),
        PipelineState::Failed { .. } => observed.abandon(),
        PipelineState::Idle => {}
    });

    let report = match orchestrator.run().await {
        Ok(report) => report,
        Err(e) => {
            if matches!(e, ForgeError::Reset { .. } | ForgeError::Recipe { .. } | ForgeError::Link { .. }) {
                print_detail(&format!(
                    "Full output: {}",
                    log_dir.join(format!("{}.log", e.stage())).display()
                ));
            }
            return Err(e.into());
        }
    };

    print_success(&format!(
        "Built {} profile in {:.1}s",
        report.profile,
        report.total_ms() as f64 / 1000.0
    ));
    for artifact in &report.artifacts {
        print_detail(&format!(
            "{} ({} bytes, sha256 {})",
            artifact.path.display(),
            artifact.bytes,
            artifact.sha256
        ));
    }
    print_detail(&format!(
        "Report: {}",
        project.layout.report_path().display()
    ));
    Ok(())
}

/// Resolve the SDK for commands that only describe the build
///
/// Falls back to a symbolic `$EMSDK` root so plans stay readable on hosts
/// without an activated SDK.
pub fn host_or_placeholder() -> HostToolchain {
    HostToolchain::from_env().unwrap_or_else(|e| {
        tracing::warn!("{e}");
        HostToolchain::new("$EMSDK")
    })
}
