//! Host tool discovery
//!
//! Locates the cross-toolchain wrappers and build tools on PATH.

use std::path::PathBuf;

use crate::error::PreconditionError;

/// Programs the pipeline invokes directly
pub const REQUIRED_TOOLS: &[&str] = &[
    "git",
    "autoreconf",
    "make",
    "cmake",
    "emconfigure",
    "emmake",
    "emcmake",
    "emcc",
];

/// Resolve a tool on PATH
pub fn locate(tool: &str) -> Result<PathBuf, PreconditionError> {
    which::which(tool).map_err(|_| PreconditionError::ToolNotFound {
        tool: tool.to_string(),
    })
}
