//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status messages and errors to the user.

use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::ForgeError;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Global output preferences
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Only errors are printed
    pub quiet: bool,
}

impl OutputConfig {
    /// Create output preferences
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Make these preferences visible to every command
    pub fn apply_global(self) {
        QUIET.store(self.quiet, Ordering::Relaxed);
    }
}

/// Whether quiet mode is active
pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Create a progress bar for the recipe pipeline
///
/// Hidden in quiet mode.
pub fn create_build_bar(total: u64) -> ProgressBar {
    if is_quiet() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg} ({elapsed})")
        .map(|s| s.progress_chars("█▓▒░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

/// Print an informational line unless quiet
pub fn print_info(message: &str) {
    if !is_quiet() {
        println!("{} {message}", status::INFO);
    }
}

/// Print a success line unless quiet
pub fn print_success(message: &str) {
    if !is_quiet() {
        println!("{} {message}", status::SUCCESS);
    }
}

/// Print a warning line unless quiet
pub fn print_warning(message: &str) {
    if !is_quiet() {
        println!("{} {message}", status::WARNING);
    }
}

/// Print an indented detail line unless quiet
pub fn print_detail(message: &str) {
    if !is_quiet() {
        println!("    {message}");
    }
}

/// Print an error with its cause chain and any captured build output
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("    Caused by: {cause}");
    }

    if let Some(output) = error
        .downcast_ref::<ForgeError>()
        .and_then(ForgeError::output_context)
    {
        eprintln!();
        eprintln!("    Last output:");
        for line in output.lines() {
            eprintln!("    | {line}");
        }
    }
}

/// Exit status for an error returned by a command
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<ForgeError>()
        .map_or(1, ForgeError::exit_code)
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}
