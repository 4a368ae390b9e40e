//! Infrastructure layer
//!
//! Handles all I/O operations: filesystem, git and external processes.

pub mod filesystem;
pub mod git;
pub mod process;
pub mod toolchain;
