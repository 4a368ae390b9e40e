//! magick-forge - WebAssembly ImageMagick builder
//!
//! Cross-compiles ImageMagick and the native libraries it delegates to
//! with Emscripten, then links everything into `magick.wasm` and its
//! loader `magick.js`.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Recipes, the registry and the pipeline (no direct I/O)
//! - [`infra`] - Processes, git checkouts, filesystem and host tools
//! - [`config`] - Constants and defaults
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
