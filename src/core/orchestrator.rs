//! Pipeline orchestration
//!
//! Walks the registry in order, one recipe at a time: reset the checkout,
//! run the recipe's steps against the shared environment, then move on.
//! The first failure aborts the run. After the last recipe the final link
//! produces the artifact.
//!
//! ```text
//! Idle -> Resetting(name) -> Building(name) -> ... -> Linking -> Done
//!                  \________________\_______________\____-> Failed
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::core::build_env::ToolchainEnvironment;
use crate::core::config::ProjectLayout;
use crate::core::executor::{execute_step, CommandRunner};
use crate::core::linker::{LinkArtifacts, LinkPlan};
use crate::core::profile::BuildProfile;
use crate::core::recipe::{Invocation, PlannedStep, RecipeContext, StrategyKind};
use crate::core::registry::{RecipeRegistry, APPLICATION};
use crate::core::report::{count_files, digest, millis, BuildReport, RecipeTiming};
use crate::core::workspace::WorkspaceResetter;
use crate::error::{
    ConfigError, FilesystemError, ForgeError, PreconditionError, StepError,
};
use crate::infra::filesystem;

/// Where the pipeline is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Resetting(String),
    Building(String),
    Linking,
    Done,
    Failed { stage: String, cause: String },
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resetting(name) => write!(f, "resetting {name}"),
            Self::Building(name) => write!(f, "building {name}"),
            Self::Linking => write!(f, "linking"),
            Self::Done => write!(f, "done"),
            Self::Failed { stage, .. } => write!(f, "failed at {stage}"),
        }
    }
}

/// Callback invoked on every state change
pub type StateObserver = Box<dyn FnMut(&PipelineState) + Send>;

struct Progress {
    state: PipelineState,
    observer: Option<StateObserver>,
}

impl Progress {
    fn enter(&mut self, next: PipelineState) {
        self.state = next;
        if let Some(observer) = self.observer.as_mut() {
            observer(&self.state);
        }
    }
}

/// Steps of one recipe, for dry runs
#[derive(Debug, Clone, Serialize)]
pub struct RecipePlan {
    pub name: &'static str,
    pub strategy: StrategyKind,
    pub source_dir: PathBuf,
    pub requires: &'static [&'static str],
    pub reset: String,
    pub steps: Vec<PlannedStep>,
}

/// Everything a run would do, in order
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub profile: BuildProfile,
    pub jobs: usize,
    pub prefix: PathBuf,
    pub environment: BTreeMap<String, String>,
    pub recipes: Vec<RecipePlan>,
    pub link: Invocation,
}

/// Resolves a host tool to its path
pub type ToolLookup = fn(&str) -> Result<PathBuf, PreconditionError>;

/// Sequential build pipeline
pub struct Orchestrator<R, W> {
    registry: RecipeRegistry,
    env: ToolchainEnvironment,
    layout: ProjectLayout,
    runner: R,
    resetter: W,
    tools: &'static [&'static str],
    locate: Option<ToolLookup>,
    progress: Progress,
}

impl<R: CommandRunner, W: WorkspaceResetter> Orchestrator<R, W> {
    /// Create an idle pipeline
    pub fn new(
        registry: RecipeRegistry,
        env: ToolchainEnvironment,
        layout: ProjectLayout,
        runner: R,
        resetter: W,
    ) -> Self {
        Self {
            registry,
            env,
            layout,
            runner,
            resetter,
            tools: &[],
            locate: None,
            progress: Progress {
                state: PipelineState::Idle,
                observer: None,
            },
        }
    }

    /// Report state changes to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: impl FnMut(&PipelineState) + Send + 'static) -> Self {
        self.progress.observer = Some(Box::new(observer));
        self
    }

    /// Require host tools before anything runs, resolved through `locate`
    #[must_use]
    pub fn with_required_tools(mut self, tools: &'static [&'static str], locate: ToolLookup) -> Self {
        self.tools = tools;
        self.locate = Some(locate);
        self
    }

    /// Current state
    pub fn state(&self) -> &PipelineState {
        &self.progress.state
    }

    /// Recipes in build order
    pub fn registry(&self) -> &RecipeRegistry {
        &self.registry
    }

    /// The final link; runs in the tree of the last recipe
    pub fn link_plan(&self) -> LinkPlan {
        let application = self
            .registry
            .recipes()
            .last()
            .map_or(APPLICATION, |r| r.name());
        LinkPlan::new(
            self.layout.source_dir(application),
            &self.layout.js_dir,
            &self.layout.out_dir,
            self.registry.link_order(),
        )
    }

    /// Check every input and host tool exists before anything runs
    pub fn check_preconditions(&self) -> Result<(), PreconditionError> {
        for recipe in self.registry.recipes() {
            let path = self.layout.source_dir(recipe.name());
            if !path.is_dir() {
                return Err(PreconditionError::MissingSourceTree {
                    name: recipe.name().to_string(),
                    path,
                });
            }
        }
        for path in self.link_plan().scripts() {
            if !path.is_file() {
                return Err(PreconditionError::MissingScript { path });
            }
        }
        if let Some(locate) = self.locate {
            for tool in self.tools {
                locate(tool)?;
            }
        }
        Ok(())
    }

    /// Describe the run without executing anything
    pub fn plan(&self) -> BuildPlan {
        let recipes = self
            .registry
            .recipes()
            .iter()
            .map(|recipe| {
                let source_dir = self.layout.source_dir(recipe.name());
                let steps = recipe.plan(&RecipeContext::new(recipe.name(), &source_dir, &self.env));
                RecipePlan {
                    name: recipe.name(),
                    strategy: recipe.kind(),
                    requires: recipe.required(),
                    reset: self.resetter.describe(&source_dir),
                    source_dir,
                    steps,
                }
            })
            .collect();

        BuildPlan {
            profile: self.env.profile(),
            jobs: self.env.jobs(),
            prefix: self.layout.out_dir.clone(),
            environment: self.env.vars().clone(),
            recipes,
            link: self.link_plan().invocation(&self.env),
        }
    }

    /// Run the whole pipeline
    ///
    /// On success the artifact exists and the build report is written. On
    /// failure no artifact exists; outputs of recipes that already finished
    /// stay in the prefix.
    pub async fn run(&mut self) -> Result<BuildReport, ForgeError> {
        let outcome = self.execute().await;
        match &outcome {
            Ok(_) => self.progress.enter(PipelineState::Done),
            Err(e) => {
                let cause = e.describe();
                debug!("Pipeline failed at {}: {cause}", e.stage());
                self.progress.enter(PipelineState::Failed {
                    stage: e.stage().to_string(),
                    cause,
                });
            }
        }
        outcome
    }

    async fn execute(&mut self) -> Result<BuildReport, ForgeError> {
        self.registry.validate()?;
        self.env
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                field: "environment".to_string(),
                reason: e.to_string(),
            })?;
        self.check_preconditions()?;

        let prefix = self.layout.prefix();
        filesystem::create_dir_all(prefix.root())?;
        filesystem::create_dir_all(&prefix.include_dir())?;
        filesystem::create_dir_all(&prefix.pkgconfig_dir())?;

        let link = self.link_plan();
        for path in link.artifacts().paths() {
            if filesystem::remove_file(path)? {
                info!("Removed stale artifact {}", path.display());
            }
        }

        let log_dir = self.layout.log_dir();
        let mut report = BuildReport::new(self.env.profile(), self.env.jobs());
        let mut files_before = count_files(prefix.root(), &log_dir);

        for recipe in self.registry.recipes() {
            let name = recipe.name();
            let source_dir = self.layout.source_dir(name);

            self.progress
                .enter(PipelineState::Resetting(name.to_string()));
            self.resetter
                .reset(&source_dir)
                .await
                .map_err(|source| ForgeError::Reset {
                    name: name.to_string(),
                    source,
                })?;

            self.progress
                .enter(PipelineState::Building(name.to_string()));
            info!("Building {name} ({})", recipe.kind());
            let started = Instant::now();
            let ctx = RecipeContext::new(name, &source_dir, &self.env);
            for planned in recipe.plan(&ctx) {
                debug!("{name} {}: {}", planned.phase, planned.step);
                execute_step(&self.runner, &planned.step)
                    .await
                    .map_err(|source| ForgeError::Recipe {
                        name: name.to_string(),
                        phase: planned.phase,
                        source,
                    })?;
            }

            let files_after = count_files(prefix.root(), &log_dir);
            report.recipes.push(RecipeTiming {
                name: name.to_string(),
                duration_ms: millis(started.elapsed()),
                files_added: files_after.saturating_sub(files_before),
            });
            files_before = files_after;
        }

        self.progress.enter(PipelineState::Linking);
        info!("Linking {}", link.artifacts().loader.display());
        let started = Instant::now();
        if let Err(source) = self.link(&link).await {
            discard(link.artifacts());
            return Err(ForgeError::Link { source });
        }
        report.link_ms = millis(started.elapsed());

        if let Err(e) = self.record(&link, &mut report) {
            discard(link.artifacts());
            return Err(e.into());
        }
        Ok(report)
    }

    fn record(&self, link: &LinkPlan, report: &mut BuildReport) -> Result<(), FilesystemError> {
        report.artifacts = link
            .artifacts()
            .paths()
            .into_iter()
            .map(digest)
            .collect::<Result<_, _>>()?;
        report.write(&self.layout.report_path())
    }

    async fn link(&self, plan: &LinkPlan) -> Result<(), StepError> {
        self.runner.run(&plan.invocation(&self.env)).await?;
        for path in plan.artifacts().paths() {
            if !path.is_file() {
                return Err(FilesystemError::ReadFile {
                    path: path.to_path_buf(),
                    error: "not produced by the link".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Remove whatever part of the artifact a failed run left behind
fn discard(artifacts: &LinkArtifacts) {
    for path in artifacts.paths() {
        if let Err(e) = filesystem::remove_file(path) {
            warn!("{e}");
        }
    }
}
