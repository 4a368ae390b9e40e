//! Build profile selection
//!
//! The profile is chosen once at process start from the deployment
//! environment (`RELEASE`), never from a command flag.

use serde::Serialize;
use std::fmt;

use crate::config::defaults::ENV_RELEASE;

/// Release/Debug axis controlling optimization and safety instrumentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    /// Size-optimized, LTO, closure-minified loader
    Release,
    /// Profiling-friendly with runtime safety checks at link time
    Debug,
}

impl BuildProfile {
    /// Select the profile from the process environment
    pub fn from_env() -> Self {
        Self::from_signal(std::env::var(ENV_RELEASE).ok().as_deref())
    }

    /// Select the profile from the raw `RELEASE` value
    ///
    /// Any non-empty value selects Release.
    pub fn from_signal(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Self::Release,
            _ => Self::Debug,
        }
    }

    /// Optimization flags added to every C/C++ compile
    pub fn compile_flags(self) -> &'static [&'static str] {
        match self {
            Self::Release => &["-Oz", "-flto"],
            Self::Debug => &["-Os", "--profiling"],
        }
    }

    /// Flags added to the final link only
    pub fn link_flags(self) -> &'static [&'static str] {
        match self {
            Self::Release => &["--closure", "1"],
            Self::Debug => &[
                "-sASSERTIONS=2",
                "-sSAFE_HEAP=1",
                "-sSTACK_OVERFLOW_CHECK=2",
            ],
        }
    }

    /// Profile name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
