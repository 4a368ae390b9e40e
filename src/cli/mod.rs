//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::defaults::ENV_PROJECT_DIR;
use commands::Commands;

/// magick-forge - WebAssembly ImageMagick builder
///
/// Cross-compiles ImageMagick and its delegate libraries with Emscripten
/// into magick.wasm and its loader magick.js. Runs the full build when no
/// subcommand is given. Set RELEASE for a size-optimized build.
#[derive(Parser, Debug)]
#[command(name = "magick-forge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Project directory holding lib/, js/ and out/
    #[arg(
        short = 'C',
        long,
        env = ENV_PROJECT_DIR,
        default_value = ".",
        global = true
    )]
    pub project_dir: PathBuf,

    /// Build-tool parallelism (clamped to 1..=5)
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let command = self.command.unwrap_or(Commands::Build);
        command.run(&self.project_dir, self.jobs).await
    }
}
