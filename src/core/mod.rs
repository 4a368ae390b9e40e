//! Core business logic module
//!
//! Recipes, the registry and the link are pure descriptions of work; the
//! orchestrator executes them through the [`executor`] and [`workspace`]
//! seams.
//!
//! # Submodules
//!
//! - [`profile`] - Release/Debug selection
//! - [`build_env`] - Toolchain environment composition
//! - [`dependency`] - Pinned source table
//! - [`recipe`] - Build strategies and recipes
//! - [`registry`] - Ordered recipe list
//! - [`linker`] - Final link invocation
//! - [`orchestrator`] - Sequential pipeline
//! - [`report`] - Build report
//! - [`config`] - Project configuration
//! - [`doctor`] - Host readiness checks
//! - [`clean`] - Prefix removal

pub mod build_env;
pub mod clean;
pub mod config;
pub mod dependency;
pub mod doctor;
pub mod executor;
pub mod linker;
pub mod orchestrator;
pub mod profile;
pub mod recipe;
pub mod registry;
pub mod report;
pub mod workspace;
