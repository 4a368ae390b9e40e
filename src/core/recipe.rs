//! Build recipes
//!
//! A recipe turns one dependency's source tree into files under the shared
//! installation prefix. Recipes only *describe* work: each capability
//! (configure, compile, install) yields a list of [`Step`]s that the
//! orchestrator executes. Three strategies cover every dependency:
//!
//! - [`AutotoolsStrategy`] - `autoreconf` + cross `configure` + `make install`
//! - [`CMakeStrategy`] - (out-of-tree) `cmake` configure + build + install
//! - [`AdHocStrategy`] - another strategy plus a filesystem adjustment

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::defaults::{CMAKE_BUILD_DIR, HOST_TRIPLE};
use crate::core::build_env::{InstallPrefix, ToolchainEnvironment};

/// Capability a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Generate build files
    Configure,
    /// Compile sources
    Compile,
    /// Copy outputs into the prefix
    Install,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure => write!(f, "configure"),
            Self::Compile => write!(f, "compile"),
            Self::Install => write!(f, "install"),
        }
    }
}

/// One external program run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    /// Program name or path
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory; the process-wide cwd is never changed
    pub cwd: PathBuf,
    /// Variables layered over the inherited host environment
    pub env: Vec<(String, String)>,
    /// Log stream this invocation's output belongs to
    pub label: String,
}

impl Invocation {
    /// Create an invocation with no arguments and no extra environment
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
            label: String::new(),
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the environment layered over the host's
    #[must_use]
    pub fn envs(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Set the log label
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Shell-like rendering for logs and plans
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.contains(' ') {
                    format!("'{part}'")
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Unit of work produced by a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Run an external build tool
    Run(Invocation),
    /// Create a directory if it does not exist yet
    CreateDir { path: PathBuf },
    /// Copy a file, replacing the destination
    CopyFile { from: PathBuf, to: PathBuf },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run(inv) => write!(f, "{}", inv.command_line()),
            Self::CreateDir { path } => write!(f, "mkdir -p {}", path.display()),
            Self::CopyFile { from, to } => write!(f, "cp {} {}", from.display(), to.display()),
        }
    }
}

/// A step tagged with the capability that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub phase: Phase,
    #[serde(flatten)]
    pub step: Step,
}

/// Everything a strategy needs to describe its work
#[derive(Debug, Clone, Copy)]
pub struct RecipeContext<'a> {
    /// Recipe name, also the log label
    pub name: &'a str,
    /// Freshly reset source checkout
    pub source_dir: &'a Path,
    /// Shared toolchain environment
    pub env: &'a ToolchainEnvironment,
}

impl<'a> RecipeContext<'a> {
    /// Create a context
    pub fn new(name: &'a str, source_dir: &'a Path, env: &'a ToolchainEnvironment) -> Self {
        Self {
            name,
            source_dir,
            env,
        }
    }

    /// Shared installation prefix
    pub fn prefix(&self) -> &InstallPrefix {
        self.env.prefix()
    }

    /// Invocation carrying the shared environment
    pub fn invocation(&self, program: &str, cwd: &Path) -> Invocation {
        self.invocation_with(program, cwd, &[])
    }

    /// Invocation carrying the shared environment plus overrides
    pub fn invocation_with(
        &self,
        program: &str,
        cwd: &Path,
        overrides: &[(String, String)],
    ) -> Invocation {
        Invocation::new(program, cwd)
            .envs(self.env.with_overrides(overrides))
            .label(self.name)
    }

    /// `-j<N>` bounded by the shared parallelism
    pub fn jobs_flag(&self) -> String {
        format!("-j{}", self.env.jobs())
    }
}

/// Strategy family, for plans and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Autotools,
    CMake,
    AdHoc,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Autotools => write!(f, "autotools"),
            Self::CMake => write!(f, "cmake"),
            Self::AdHoc => write!(f, "ad-hoc"),
        }
    }
}

/// Capability set every recipe strategy implements
pub trait BuildStrategy: fmt::Debug + Send + Sync {
    /// Strategy family
    fn kind(&self) -> StrategyKind;

    /// Steps that generate build files
    fn configure(&self, ctx: &RecipeContext<'_>) -> Vec<Step>;

    /// Steps that compile
    fn compile(&self, ctx: &RecipeContext<'_>) -> Vec<Step>;

    /// Steps that populate the prefix
    fn install(&self, ctx: &RecipeContext<'_>) -> Vec<Step>;
}

// ============================================
// Autotools
// ============================================

/// `autoreconf` + `emconfigure ./configure` + `emmake make install`
#[derive(Debug, Clone)]
pub struct AutotoolsStrategy {
    regenerate: bool,
    cross_host: bool,
    pass_cflags: bool,
    install: bool,
    options: Vec<String>,
    extra_ldflags: Vec<String>,
}

impl Default for AutotoolsStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl AutotoolsStrategy {
    /// Regenerating, cross-host configure that installs and passes CFLAGS
    pub fn new() -> Self {
        Self {
            regenerate: true,
            cross_host: true,
            pass_cflags: true,
            install: true,
            options: Vec::new(),
            extra_ldflags: Vec::new(),
        }
    }

    /// Hand-written configure scripts: no macro regeneration, no host
    /// triple, no CFLAGS argument
    #[must_use]
    pub fn plain() -> Self {
        Self {
            regenerate: false,
            cross_host: false,
            pass_cflags: false,
            ..Self::new()
        }
    }

    /// Add configure options
    #[must_use]
    pub fn options(mut self, options: &[&str]) -> Self {
        self.options.extend(options.iter().map(|o| (*o).to_string()));
        self
    }

    /// Append linker flags for the configure run only
    #[must_use]
    pub fn extra_ldflags(mut self, flags: &[&str]) -> Self {
        self.extra_ldflags
            .extend(flags.iter().map(|f| (*f).to_string()));
        self
    }

    /// Build without installing (the application links from its tree)
    #[must_use]
    pub fn without_install(mut self) -> Self {
        self.install = false;
        self
    }

    fn make(&self, ctx: &RecipeContext<'_>, target: Option<&str>) -> Step {
        let inv = ctx
            .invocation("emmake", ctx.source_dir)
            .arg("make")
            .arg(ctx.jobs_flag())
            .args(target);
        Step::Run(inv)
    }
}

impl BuildStrategy for AutotoolsStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Autotools
    }

    fn configure(&self, ctx: &RecipeContext<'_>) -> Vec<Step> {
        let mut steps = Vec::new();
        if self.regenerate {
            steps.push(Step::Run(
                ctx.invocation("autoreconf", ctx.source_dir).arg("-fiv"),
            ));
        }

        let overrides = if self.extra_ldflags.is_empty() {
            Vec::new()
        } else {
            vec![(
                "LDFLAGS".to_string(),
                format!("{} {}", ctx.env.ldflags(), self.extra_ldflags.join(" ")),
            )]
        };

        let mut configure = ctx
            .invocation_with("emconfigure", ctx.source_dir, &overrides)
            .arg("./configure")
            .arg(format!("--prefix={}", ctx.prefix().root().display()));
        if self.cross_host {
            configure = configure.arg(format!("--host={HOST_TRIPLE}"));
        }
        configure = configure.args(self.options.iter().cloned());
        if self.pass_cflags {
            configure = configure.arg(format!("CFLAGS={}", ctx.env.cflags()));
        }
        steps.push(Step::Run(configure));
        steps
    }

    fn compile(&self, ctx: &RecipeContext<'_>) -> Vec<Step> {
        vec![self.make(ctx, None)]
    }

    fn install(&self, ctx: &RecipeContext<'_>) -> Vec<Step> {
        if self.install {
            vec![self.make(ctx, Some("install"))]
        } else {
            Vec::new()
        }
    }
}

// ============================================
// CMake
// ============================================

/// Value of a `-D` cache entry, resolved against the context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefineValue {
    /// Fixed string
    Literal(&'static str),
    /// `<prefix>/include`
    IncludeDir,
    /// `<prefix>/lib/lib<name>.a`
    Archive(&'static str),
    /// Shared CFLAGS followed by extra flags
    CFlags(&'static str),
    /// Shared CXXFLAGS followed by extra flags
    CxxFlags(&'static str),
}

/// How the generated build is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMakeDriver {
    /// `emmake make -j<N> [install]`
    Make,
    /// `emmake cmake --build . --config Release [--target install]`
    CMakeBuild,
}

/// Cross-aware CMake configure, build and install
#[derive(Debug, Clone)]
pub struct CMakeStrategy {
    source: String,
    out_of_tree: bool,
    driver: CMakeDriver,
    defines: Vec<(&'static str, DefineValue)>,
}

impl CMakeStrategy {
    /// Out-of-tree build in `__build/`
    pub fn out_of_tree() -> Self {
        Self {
            source: "..".to_string(),
            out_of_tree: true,
            driver: CMakeDriver::Make,
            defines: Vec::new(),
        }
    }

    /// In-tree build of the `CMakeLists.txt` at `source` (relative to the checkout)
    pub fn in_tree(source: &str) -> Self {
        Self {
            source: source.to_string(),
            out_of_tree: false,
            driver: CMakeDriver::Make,
            defines: Vec::new(),
        }
    }

    /// Drive the build through `cmake --build`
    #[must_use]
    pub fn driver(mut self, driver: CMakeDriver) -> Self {
        self.driver = driver;
        self
    }

    /// Add a literal `-D<key>=<value>`
    #[must_use]
    pub fn define(mut self, key: &'static str, value: &'static str) -> Self {
        self.defines.push((key, DefineValue::Literal(value)));
        self
    }

    /// Add several literal defines
    #[must_use]
    pub fn defines(mut self, defines: &[(&'static str, &'static str)]) -> Self {
        self.defines
            .extend(defines.iter().map(|&(k, v)| (k, DefineValue::Literal(v))));
        self
    }

    /// Point `<key>` at the prefix's include directory
    #[must_use]
    pub fn include_dir(mut self, key: &'static str) -> Self {
        self.defines.push((key, DefineValue::IncludeDir));
        self
    }

    /// Point `<key>` at an installed static archive
    #[must_use]
    pub fn archive(mut self, key: &'static str, lib: &'static str) -> Self {
        self.defines.push((key, DefineValue::Archive(lib)));
        self
    }

    /// Pass the shared CFLAGS plus `extra`
    #[must_use]
    pub fn c_flags(mut self, extra: &'static str) -> Self {
        self.defines.push(("CMAKE_C_FLAGS", DefineValue::CFlags(extra)));
        self
    }

    /// Pass the shared CXXFLAGS plus `extra`
    #[must_use]
    pub fn cxx_flags(mut self, extra: &'static str) -> Self {
        self.defines
            .push(("CMAKE_CXX_FLAGS", DefineValue::CxxFlags(extra)));
        self
    }

    /// Directory cmake runs in
    pub fn build_dir(&self, source_dir: &Path) -> PathBuf {
        if self.out_of_tree {
            source_dir.join(CMAKE_BUILD_DIR)
        } else {
            source_dir.to_path_buf()
        }
    }

    fn resolve(value: &DefineValue, ctx: &RecipeContext<'_>) -> String {
        match value {
            DefineValue::Literal(v) => (*v).to_string(),
            DefineValue::IncludeDir => ctx.prefix().include_dir().display().to_string(),
            DefineValue::Archive(lib) => ctx.prefix().static_lib(lib).display().to_string(),
            DefineValue::CFlags(extra) => format!("{}{extra}", ctx.env.cflags()),
            DefineValue::CxxFlags(extra) => format!("{}{extra}", ctx.env.cxxflags()),
        }
    }

    fn drive(&self, ctx: &RecipeContext<'_>, install: bool) -> Step {
        let build_dir = self.build_dir(ctx.source_dir);
        let inv = match self.driver {
            CMakeDriver::Make => ctx
                .invocation("emmake", &build_dir)
                .arg("make")
                .arg(ctx.jobs_flag())
                .args(install.then_some("install")),
            CMakeDriver::CMakeBuild => ctx
                .invocation("emmake", &build_dir)
                .args(["cmake", "--build", ".", "--config", "Release"])
                .args(["--parallel".to_string(), ctx.env.jobs().to_string()])
                .args(install.then_some(["--target", "install"]).into_iter().flatten()),
        };
        Step::Run(inv)
    }
}

impl BuildStrategy for CMakeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CMake
    }

    fn configure(&self, ctx: &RecipeContext<'_>) -> Vec<Step> {
        let build_dir = self.build_dir(ctx.source_dir);
        let mut steps = Vec::new();
        if self.out_of_tree {
            steps.push(Step::CreateDir {
                path: build_dir.clone(),
            });
        }

        let inv = ctx
            .invocation("emcmake", &build_dir)
            .arg("cmake")
            .arg(&self.source)
            .arg(format!(
                "-DCMAKE_INSTALL_PREFIX={}",
                ctx.prefix().root().display()
            ))
            .arg(format!(
                "-DCMAKE_TOOLCHAIN_FILE={}",
                ctx.env.toolchain_file().display()
            ))
            .args(
                self.defines
                    .iter()
                    .map(|(key, value)| format!("-D{key}={}", Self::resolve(value, ctx))),
            );
        steps.push(Step::Run(inv));
        steps
    }

    fn compile(&self, ctx: &RecipeContext<'_>) -> Vec<Step> {
        vec![self.drive(ctx, false)]
    }

    fn install(&self, ctx: &RecipeContext<'_>) -> Vec<Step> {
        vec![self.drive(ctx, true)]
    }
}

// ============================================
// Ad-hoc
// ============================================

/// Filesystem adjustment applied after a standard install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adjustment {
    /// Duplicate `lib/pkgconfig/<from>.pc` as `<to>.pc`
    AliasPkgConfig {
        from: &'static str,
        to: &'static str,
    },
}

/// Another strategy followed by packaging fix-ups
#[derive(Debug)]
pub struct AdHocStrategy {
    base: Box<dyn BuildStrategy>,
    adjustments: Vec<Adjustment>,
}

impl AdHocStrategy {
    /// Wrap a base strategy
    pub fn wrap(base: impl BuildStrategy + 'static) -> Self {
        Self {
            base: Box::new(base),
            adjustments: Vec::new(),
        }
    }

    /// Add a fix-up
    #[must_use]
    pub fn adjust(mut self, adjustment: Adjustment) -> Self {
        self.adjustments.push(adjustment);
        self
    }
}

impl BuildStrategy for AdHocStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AdHoc
    }

    fn configure(&self, ctx: &RecipeContext<'_>) -> Vec<Step> {
        self.base.configure(ctx)
    }

    fn compile(&self, ctx: &RecipeContext<'_>) -> Vec<Step> {
        self.base.compile(ctx)
    }

    fn install(&self, ctx: &RecipeContext<'_>) -> Vec<Step> {
        let mut steps = self.base.install(ctx);
        steps.extend(self.adjustments.iter().map(|adj| match adj {
            Adjustment::AliasPkgConfig { from, to } => Step::CopyFile {
                from: ctx.prefix().pkgconfig_file(from),
                to: ctx.prefix().pkgconfig_file(to),
            },
        }));
        steps
    }
}

// ============================================
// Recipe
// ============================================

/// A named dependency build
#[derive(Debug)]
pub struct Recipe {
    name: &'static str,
    requires: &'static [&'static str],
    libraries: &'static [&'static str],
    strategy: Box<dyn BuildStrategy>,
}

impl Recipe {
    /// Create a recipe with no declared requirements or archives
    pub fn new(name: &'static str, strategy: impl BuildStrategy + 'static) -> Self {
        Self {
            name,
            requires: &[],
            libraries: &[],
            strategy: Box::new(strategy),
        }
    }

    /// Recipes whose installed output this one consumes
    #[must_use]
    pub fn requires(mut self, requires: &'static [&'static str]) -> Self {
        self.requires = requires;
        self
    }

    /// Static archives this recipe installs, in link order
    #[must_use]
    pub fn libraries(mut self, libraries: &'static [&'static str]) -> Self {
        self.libraries = libraries;
        self
    }

    /// Recipe name, also its source directory name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared requirements
    pub fn required(&self) -> &'static [&'static str] {
        self.requires
    }

    /// Declared archives
    pub fn archives(&self) -> &'static [&'static str] {
        self.libraries
    }

    /// Strategy family
    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Every step, configure then compile then install
    pub fn plan(&self, ctx: &RecipeContext<'_>) -> Vec<PlannedStep> {
        let tag = |phase: Phase, steps: Vec<Step>| {
            steps
                .into_iter()
                .map(move |step| PlannedStep { phase, step })
        };
        tag(Phase::Configure, self.strategy.configure(ctx))
            .chain(tag(Phase::Compile, self.strategy.compile(ctx)))
            .chain(tag(Phase::Install, self.strategy.install(ctx)))
            .collect()
    }
}
