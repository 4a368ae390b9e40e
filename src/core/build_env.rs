//! Build environment setup
//!
//! Composes the single toolchain environment shared by every recipe.
//! Sets up CFLAGS, CXXFLAGS, CPPFLAGS, LDFLAGS, the pkg-config search paths,
//! the CMake toolchain descriptor and the strip tool.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::defaults::{
    ENV_EMSDK, MAX_BUILD_JOBS, STRIP_TOOL, TOOLCHAIN_DESCRIPTOR,
};
use crate::core::profile::BuildProfile;
use crate::error::PreconditionError;

/// Flags every compile and link shares, regardless of profile
const BASE_FLAGS: &[&str] = &["-pthread", "-sUSE_PTHREADS", "-msimd128", "-fno-PIC"];

/// Build-time job parallelism: host cores capped at [`MAX_BUILD_JOBS`]
///
/// This only bounds `make -j`. The artifact's own thread pool is sized by the
/// host at load time and is configured separately by the linker step.
pub fn max_parallelism() -> usize {
    clamp_jobs(num_cpus::get())
}

/// Clamp a requested job count into `1..=MAX_BUILD_JOBS`
pub fn clamp_jobs(requested: usize) -> usize {
    requested.clamp(1, MAX_BUILD_JOBS)
}

/// Host-side cross toolchain installation
#[derive(Debug, Clone, PartialEq)]
pub struct HostToolchain {
    /// Emscripten SDK root
    emsdk: PathBuf,
}

impl HostToolchain {
    /// Create a toolchain rooted at an SDK directory
    pub fn new(emsdk: impl Into<PathBuf>) -> Self {
        Self {
            emsdk: emsdk.into(),
        }
    }

    /// Locate the SDK through `EMSDK`
    pub fn from_env() -> Result<Self, PreconditionError> {
        match std::env::var_os(ENV_EMSDK) {
            Some(root) if !root.is_empty() => Ok(Self::new(root)),
            _ => Err(PreconditionError::MissingEnv {
                variable: ENV_EMSDK.to_string(),
                hint: "Activate the Emscripten SDK (source emsdk_env.sh)".to_string(),
            }),
        }
    }

    /// SDK root
    pub fn emsdk(&self) -> &Path {
        &self.emsdk
    }

    /// CMake toolchain descriptor describing the cross target
    pub fn toolchain_file(&self) -> PathBuf {
        self.emsdk.join(TOOLCHAIN_DESCRIPTOR)
    }
}

/// Shared installation prefix
///
/// Every recipe installs here and every later recipe searches here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPrefix {
    root: PathBuf,
}

impl InstallPrefix {
    /// Wrap a prefix root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Prefix root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `include/`
    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include")
    }

    /// `lib/`
    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    /// `lib/pkgconfig/`
    pub fn pkgconfig_dir(&self) -> PathBuf {
        self.lib_dir().join("pkgconfig")
    }

    /// Installed static archive for a library name (`lib/lib<name>.a`)
    pub fn static_lib(&self, name: &str) -> PathBuf {
        self.lib_dir().join(format!("lib{name}.a"))
    }

    /// Installed pkg-config file (`lib/pkgconfig/<name>.pc`)
    pub fn pkgconfig_file(&self, name: &str) -> PathBuf {
        self.pkgconfig_dir().join(format!("{name}.pc"))
    }
}

/// Composed cross-toolchain environment.
///
/// Immutable once composed. A recipe that needs an extra flag asks for a
/// derived variable list via [`ToolchainEnvironment::with_overrides`]; the
/// base mapping itself is never rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolchainEnvironment {
    profile: BuildProfile,
    jobs: usize,
    prefix: InstallPrefix,
    toolchain_file: PathBuf,
    vars: BTreeMap<String, String>,
}

impl ToolchainEnvironment {
    /// Compose the environment for a profile
    pub fn compose(
        profile: BuildProfile,
        jobs: usize,
        host: &HostToolchain,
        prefix: InstallPrefix,
    ) -> Self {
        let cflags = BASE_FLAGS
            .iter()
            .chain(profile.compile_flags())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let pkg_config_path = prefix.pkgconfig_dir().display().to_string();
        let toolchain_file = host.toolchain_file();

        let mut vars = BTreeMap::new();
        vars.insert("CFLAGS".to_string(), cflags.clone());
        vars.insert("CXXFLAGS".to_string(), cflags);
        vars.insert(
            "CPPFLAGS".to_string(),
            format!("-I{}", prefix.include_dir().display()),
        );
        vars.insert(
            "LDFLAGS".to_string(),
            format!("-L{} --bind", prefix.lib_dir().display()),
        );
        vars.insert("PKG_CONFIG_PATH".to_string(), pkg_config_path.clone());
        vars.insert("EM_PKG_CONFIG_PATH".to_string(), pkg_config_path);
        vars.insert(
            "TOOLCHAIN_FILE".to_string(),
            toolchain_file.display().to_string(),
        );
        vars.insert("STRIP".to_string(), STRIP_TOOL.to_string());

        Self {
            profile,
            jobs,
            prefix,
            toolchain_file,
            vars,
        }
    }

    /// Profile the environment was composed for
    pub fn profile(&self) -> BuildProfile {
        self.profile
    }

    /// Build-tool job count
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Shared installation prefix
    pub fn prefix(&self) -> &InstallPrefix {
        &self.prefix
    }

    /// CMake toolchain descriptor
    pub fn toolchain_file(&self) -> &Path {
        &self.toolchain_file
    }

    /// Look up one variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// C compiler flags
    pub fn cflags(&self) -> &str {
        self.get("CFLAGS").unwrap_or_default()
    }

    /// C++ compiler flags
    pub fn cxxflags(&self) -> &str {
        self.get("CXXFLAGS").unwrap_or_default()
    }

    /// Linker flags
    pub fn ldflags(&self) -> &str {
        self.get("LDFLAGS").unwrap_or_default()
    }

    /// All variables in name order
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Base variables with per-invocation overrides layered on top
    pub fn with_overrides(&self, overrides: &[(String, String)]) -> Vec<(String, String)> {
        let mut merged = self.vars.clone();
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        merged.into_iter().collect()
    }

    /// Check that the composed environment is usable
    pub fn validate(&self) -> Result<(), BuildEnvError> {
        for required in ["CFLAGS", "CXXFLAGS", "LDFLAGS", "TOOLCHAIN_FILE"] {
            if self.get(required).map_or(true, str::is_empty) {
                return Err(BuildEnvError::MissingVariable(required.to_string()));
            }
        }
        if self.jobs == 0 {
            return Err(BuildEnvError::InvalidValue {
                variable: "jobs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Build environment errors
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEnvError {
    /// Required variable is missing
    MissingVariable(String),
    /// Variable has invalid value
    InvalidValue { variable: String, reason: String },
}

impl std::fmt::Display for BuildEnvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVariable(var) => write!(f, "Missing required environment variable: {var}"),
            Self::InvalidValue { variable, reason } => {
                write!(f, "Invalid value for {variable}: {reason}")
            }
        }
    }
}

impl std::error::Error for BuildEnvError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators;
    use proptest::prelude::*;

    fn compose(profile: BuildProfile) -> ToolchainEnvironment {
        ToolchainEnvironment::compose(
            profile,
            4,
            &HostToolchain::new("/opt/emsdk"),
            InstallPrefix::new("/work/out"),
        )
    }

    // ============================================
    // Unit Tests
    // ============================================

    #[test]
    fn test_release_environment_flags() {
        let env = compose(BuildProfile::Release);

        assert_eq!(env.cflags(), "-pthread -sUSE_PTHREADS -msimd128 -fno-PIC -Oz -flto");
        assert_eq!(env.cxxflags(), env.cflags());
        assert_eq!(env.ldflags(), "-L/work/out/lib --bind");
        assert_eq!(env.get("CPPFLAGS"), Some("-I/work/out/include"));
    }

    #[test]
    fn test_debug_environment_flags() {
        let env = compose(BuildProfile::Debug);

        assert!(env.cflags().ends_with("-Os --profiling"));
        assert!(!env.cflags().contains("-flto"));
    }

    #[test]
    fn test_pkg_config_paths_point_at_prefix() {
        let env = compose(BuildProfile::Debug);

        assert_eq!(env.get("PKG_CONFIG_PATH"), Some("/work/out/lib/pkgconfig"));
        assert_eq!(env.get("EM_PKG_CONFIG_PATH"), Some("/work/out/lib/pkgconfig"));
    }

    #[test]
    fn test_toolchain_descriptor_under_sdk() {
        let env = compose(BuildProfile::Release);

        assert_eq!(
            env.toolchain_file(),
            Path::new("/opt/emsdk/upstream/emscripten/cmake/Modules/Platform/Emscripten.cmake")
        );
        assert_eq!(env.get("STRIP"), Some("llvm-strip"));
    }

    #[test]
    fn test_overrides_do_not_touch_base() {
        let env = compose(BuildProfile::Release);
        let before = env.clone();

        let merged = env.with_overrides(&[(
            "LDFLAGS".to_string(),
            "-L/work/out/lib --bind -laom".to_string(),
        )]);

        let ldflags = merged.iter().find(|(k, _)| k == "LDFLAGS").unwrap();
        assert!(ldflags.1.ends_with("-laom"));
        assert_eq!(env, before);
        assert_eq!(env.ldflags(), "-L/work/out/lib --bind");
    }

    #[test]
    fn test_validation_fails_for_zero_jobs() {
        let env = ToolchainEnvironment::compose(
            BuildProfile::Debug,
            0,
            &HostToolchain::new("/opt/emsdk"),
            InstallPrefix::new("/out"),
        );

        assert!(matches!(
            env.validate(),
            Err(BuildEnvError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_prefix_layout() {
        let prefix = InstallPrefix::new("/out");
        assert_eq!(prefix.static_lib("z"), PathBuf::from("/out/lib/libz.a"));
        assert_eq!(
            prefix.pkgconfig_file("fftw3"),
            PathBuf::from("/out/lib/pkgconfig/fftw3.pc")
        );
    }

    #[test]
    fn test_max_parallelism_is_capped() {
        let jobs = max_parallelism();
        assert!(jobs >= 1);
        assert!(jobs <= MAX_BUILD_JOBS);
        assert_eq!(clamp_jobs(0), 1);
        assert_eq!(clamp_jobs(64), MAX_BUILD_JOBS);
    }

    // ============================================
    // Property-Based Tests
    // ============================================

    /// Strategy for generating prefix paths
    fn path_strategy() -> impl Strategy<Value = PathBuf> {
        "/[a-z]{1,10}(/[a-z]{1,10}){0,3}".prop_map(PathBuf::from)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every profile yields non-empty compile and link flags that validate
        #[test]
        fn prop_environment_has_flags(
            profile in generators::profile(),
            prefix in path_strategy(),
            jobs in 1usize..=MAX_BUILD_JOBS,
        ) {
            let env = ToolchainEnvironment::compose(
                profile,
                jobs,
                &HostToolchain::new("/opt/emsdk"),
                InstallPrefix::new(prefix.clone()),
            );

            prop_assert!(!env.cflags().is_empty());
            prop_assert!(!env.ldflags().is_empty());
            prop_assert!(env.validate().is_ok());
            let include_flag = format!("-I{}", prefix.join("include").display());
            prop_assert_eq!(env.get("CPPFLAGS"), Some(include_flag.as_str()));
        }

        /// Compile flags never carry link-time safety checks
        #[test]
        fn prop_compile_flags_exclude_safety_checks(profile in generators::profile()) {
            let env = compose(profile);
            for flag in BuildProfile::Debug.link_flags() {
                prop_assert!(!env.cflags().contains(flag));
                prop_assert!(!env.ldflags().contains(flag));
            }
        }
    }
}
