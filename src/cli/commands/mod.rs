//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod clean;
pub mod doctor;
pub mod plan;

use anyhow::Result;
use clap::Subcommand;
use std::path::Path;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reset, configure, compile and install every dependency, then link
    Build,

    /// Print every step a build would run, without running anything
    Plan {
        /// Output in JSON format for scripting
        #[arg(long)]
        json: bool,
    },

    /// Check tools, SDK and source trees
    Doctor {
        /// Output in JSON format for scripting
        #[arg(long)]
        json: bool,
    },

    /// Remove the installation prefix and artifacts
    Clean,
}

impl Commands {
    /// Execute the command
    pub async fn run(self, project_dir: &Path, jobs: Option<usize>) -> Result<()> {
        match self {
            Self::Build => build::execute(project_dir, jobs).await,
            Self::Plan { json } => plan::execute(project_dir, jobs, json),
            Self::Doctor { json } => doctor::execute(project_dir, json),
            Self::Clean => clean::execute(project_dir),
        }
    }
}
