//! Project configuration
//!
//! Reads optional settings from `magick-forge.toml` in the project directory
//! and resolves them into a [`ProjectLayout`]. Precedence is CLI flags, then
//! environment, then this file, then built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::defaults::{
    CONFIG_FILE, DEFAULT_JS_DIR, DEFAULT_LIB_DIR, DEFAULT_OUT_DIR, MAX_BUILD_JOBS,
};
use crate::core::build_env::{clamp_jobs, max_parallelism, InstallPrefix};
use crate::error::ConfigError;

/// Contents of `magick-forge.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Directory layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Build limits
    #[serde(default)]
    pub build: BuildConfig,
}

/// Directory overrides, relative to the project directory unless absolute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Source trees, one per dependency
    pub lib_dir: Option<PathBuf>,

    /// Installation prefix and artifact directory
    pub out_dir: Option<PathBuf>,

    /// Loader pre/post scripts
    pub js_dir: Option<PathBuf>,
}

/// Build limits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Upper bound on build-tool jobs (still capped at the built-in maximum)
    pub max_jobs: Option<usize>,

    /// Wall-clock limit per sub-process
    pub step_timeout_secs: Option<u64>,
}

impl ForgeConfig {
    /// Load the config file from a project directory
    ///
    /// A missing file yields the defaults.
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        Self::load_from_path(&project_dir.join(CONFIG_FILE))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate TOML content
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from(CONFIG_FILE),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.max_jobs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "build.max_jobs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.build.step_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "build.step_timeout_secs".to_string(),
                reason: "must be at least 1 second; omit it to disable the limit".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve directories against the project root
    pub fn layout(&self, project_dir: &Path) -> ProjectLayout {
        let resolve = |configured: &Option<PathBuf>, default: &str| {
            project_dir.join(configured.as_deref().unwrap_or_else(|| Path::new(default)))
        };
        ProjectLayout {
            root: project_dir.to_path_buf(),
            lib_dir: resolve(&self.paths.lib_dir, DEFAULT_LIB_DIR),
            out_dir: resolve(&self.paths.out_dir, DEFAULT_OUT_DIR),
            js_dir: resolve(&self.paths.js_dir, DEFAULT_JS_DIR),
        }
    }

    /// Effective job count
    ///
    /// An explicit request wins; otherwise host cores bounded by the file's
    /// `max_jobs`. Always within `1..=MAX_BUILD_JOBS`.
    pub fn jobs(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(jobs) => clamp_jobs(jobs),
            None => clamp_jobs(
                max_parallelism().min(self.build.max_jobs.unwrap_or(MAX_BUILD_JOBS)),
            ),
        }
    }

    /// Per-sub-process time limit, if configured
    pub fn step_timeout(&self) -> Option<Duration> {
        self.build.step_timeout_secs.map(Duration::from_secs)
    }
}

/// Resolved on-disk layout of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Project root
    pub root: PathBuf,
    /// Source trees
    pub lib_dir: PathBuf,
    /// Installation prefix
    pub out_dir: PathBuf,
    /// Loader scripts
    pub js_dir: PathBuf,
}

impl ProjectLayout {
    /// Default layout under a project root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ForgeConfig::default().layout(&root.into())
    }

    /// Source checkout for a recipe
    pub fn source_dir(&self, name: &str) -> PathBuf {
        self.lib_dir.join(name)
    }

    /// Shared installation prefix
    pub fn prefix(&self) -> InstallPrefix {
        InstallPrefix::new(&self.out_dir)
    }

    /// Per-recipe sub-process logs
    pub fn log_dir(&self) -> PathBuf {
        self.out_dir.join("logs")
    }

    /// Summary of the last successful build
    pub fn report_path(&self) -> PathBuf {
        self.out_dir.join("build-report.json")
    }
}
