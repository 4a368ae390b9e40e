//! Error types for magick-forge
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::recipe::Phase;

/// Conditions that must hold before any build step runs
#[derive(Error, Debug)]
pub enum PreconditionError {
    /// Required environment variable is not set
    #[error("Required environment variable '{variable}' is not set. {hint}")]
    MissingEnv { variable: String, hint: String },

    /// Dependency source tree has not been fetched
    #[error("Source tree for '{name}' not found at '{path}'. Fetch the pinned sources first")]
    MissingSourceTree { name: String, path: PathBuf },

    /// Loader script (pre/post js) is missing
    #[error("Required loader script not found: {path}")]
    MissingScript { path: PathBuf },

    /// Required host tool is not on PATH
    #[error("Required tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },
}

/// Sub-process execution errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Process could not be started
    #[error("Failed to start '{program}': {error}")]
    Spawn { program: String, error: String },

    /// Process exited unsuccessfully
    #[error("'{program}' exited with {}", describe_code(.code))]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        /// Tail of the captured stdout/stderr
        output: String,
    },

    /// Process exceeded the configured wall-clock limit
    #[error("'{program}' did not finish within {secs}s")]
    TimedOut { program: String, secs: u64 },
}

impl ProcessError {
    /// Exit code of the failed process, when it reported one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { code, .. } => *code,
            _ => None,
        }
    }

    /// Captured output context, if any
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove path
    #[error("Failed to remove '{path}': {error}")]
    Remove { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to change permissions
    #[error("Failed to set permissions on '{path}': {error}")]
    Permissions { path: PathBuf, error: String },
}

/// Workspace reset errors
#[derive(Error, Debug)]
pub enum ResetError {
    /// Directory is not a git checkout
    #[error("'{path}' is not a git checkout")]
    NotACheckout { path: PathBuf },

    /// git clean/checkout failed
    #[error("Failed to reset '{path}'")]
    Command {
        path: PathBuf,
        #[source]
        source: ProcessError,
    },

    /// Post-reset preparation failed
    #[error("Failed to prepare '{path}'")]
    Prepare {
        path: PathBuf,
        #[source]
        source: FilesystemError,
    },
}

/// A single recipe step failed
#[derive(Error, Debug)]
pub enum StepError {
    /// Build tool failed
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Filesystem adjustment failed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Registry ordering errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two recipes share a name
    #[error("Recipe '{name}' is registered more than once")]
    Duplicate { name: String },

    /// A recipe requires something not in the registry
    #[error("Recipe '{recipe}' requires unknown dependency '{requires}'")]
    UnknownRequirement { recipe: String, requires: String },

    /// A recipe requires something registered after it
    #[error("Recipe '{recipe}' requires '{requires}', which is registered after it")]
    OutOfOrder { recipe: String, requires: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Top-level magick-forge error type
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Precondition failure
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// Registry order is invalid
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Reset failure
    #[error("Reset of '{name}' failed")]
    Reset {
        name: String,
        #[source]
        source: ResetError,
    },

    /// Recipe failure
    #[error("Recipe '{name}' failed during {phase}")]
    Recipe {
        name: String,
        phase: Phase,
        #[source]
        source: StepError,
    },

    /// Final link failure
    #[error("Final link failed")]
    Link {
        #[source]
        source: StepError,
    },

    /// Filesystem error outside a recipe
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

impl ForgeError {
    /// Name of the failing stage, for operator diagnosis
    pub fn stage(&self) -> &str {
        match self {
            Self::Config(_) => "config",
            Self::Precondition(_) => "precondition",
            Self::Registry(_) => "registry",
            Self::Reset { name, .. } | Self::Recipe { name, .. } => name,
            Self::Link { .. } => "link",
            Self::Filesystem(_) => "filesystem",
        }
    }

    /// Message followed by every underlying cause, on one line
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        message
    }

    /// Process exit status to report
    ///
    /// Propagates the failing sub-process's status when it reported one.
    pub fn exit_code(&self) -> i32 {
        let code = match self {
            Self::Recipe {
                source: StepError::Process(e),
                ..
            }
            | Self::Link {
                source: StepError::Process(e),
            }
            | Self::Reset {
                source: ResetError::Command { source: e, .. },
                ..
            } => e.exit_code(),
            _ => None,
        };
        match code {
            Some(c) if c != 0 => c,
            _ => 1,
        }
    }

    /// Captured sub-process output, if the failure carries any
    pub fn output_context(&self) -> Option<&str> {
        match self {
            Self::Recipe {
                source: StepError::Process(e),
                ..
            }
            | Self::Link {
                source: StepError::Process(e),
            }
            | Self::Reset {
                source: ResetError::Command { source: e, .. },
                ..
            } => e.output(),
            _ => None,
        }
    }
}
