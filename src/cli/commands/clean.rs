//! CLI implementation for `magick-forge clean`

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::output::print_success;
use crate::core::clean::clean_prefix;
use crate::core::config::ForgeConfig;
use crate::error::ForgeError;

/// Execute the clean command
pub fn execute(project_dir: &Path) -> Result<()> {
    let config = ForgeConfig::load(project_dir).map_err(ForgeError::from)?;
    let layout = config.layout(project_dir);

    let result = clean_prefix(&layout).context("Failed to clean build outputs")?;

    if result.removed {
        print_success(&format!("Removed {}", layout.out_dir.display()));
    } else {
        print_success("Nothing to clean");
    }
    Ok(())
}
