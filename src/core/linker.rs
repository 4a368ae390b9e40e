//! Final link
//!
//! One `libtool --mode=link emcc` invocation in the application tree that
//! combines the application objects with every installed static archive.
//! The flag surface here is the public contract of the shipped module.

use std::path::{Path, PathBuf};

use crate::core::build_env::ToolchainEnvironment;
use crate::core::recipe::Invocation;

/// Label used for the link log stream
pub const LINK_LABEL: &str = "link";

/// Native entry points the module exports
pub const EXPORTED_FUNCTIONS: &[&str] = &[
    "_main",
    "__emscripten_thread_crashed",
    "__embind_initialize_bindings",
];

/// Runtime methods reachable from the loader
pub const EXPORTED_RUNTIME_METHODS: &[&str] = &["callMain", "FS", "WORKERFS", "ENV"];

/// Module-object properties the loader may supply
pub const INCOMING_MODULE_JS_API: &[&str] = &[
    "noInitialRun",
    "noFSInit",
    "locateFile",
    "preRun",
    "instantiateWasm",
    "quit",
    "noExitRuntime",
    "onExit",
];

/// Runtime settings independent of the profile
const RUNTIME_SETTINGS: &[&str] = &[
    "-sALLOW_MEMORY_GROWTH=1",
    "-sSTACK_SIZE=1MB",
    "-sNO_DISABLE_EXCEPTION_CATCHING=1",
    "-sMODULARIZE=1",
    "-sEXPORT_ES6=1",
    "-sEXPORT_NAME=init",
    "-sDYNAMIC_EXECUTION=0",
    // Sized by the host at load time; unrelated to the build job cap
    "-sPTHREAD_POOL_SIZE=navigator.hardwareConcurrency",
    "-sENVIRONMENT=worker",
    // The loader resolves the module through locateFile
    "-sUSE_ES6_IMPORT_META=0",
    "-sINITIAL_MEMORY=67108864",
];

/// Application objects, relative to the application tree
const APPLICATION_INPUTS: &[&str] = &[
    "MagickCore/libMagickCore-7.Q16HDRI.la",
    "MagickWand/libMagickWand-7.Q16HDRI.la",
    "utilities/magick.o",
];

/// Runtime JS libraries linked ahead of the archives
const JS_LIBRARIES: &[&str] = &["-lnodefs.js", "-lworkerfs.js"];

/// Output file paths of a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkArtifacts {
    /// Loader payload
    pub loader: PathBuf,
    /// Binary module, written next to the loader
    pub module: PathBuf,
}

impl LinkArtifacts {
    /// Artifacts placed in an output directory
    pub fn in_dir(out_dir: &Path) -> Self {
        Self {
            loader: out_dir.join("magick.js"),
            module: out_dir.join("magick.wasm"),
        }
    }

    /// Both paths
    pub fn paths(&self) -> [&Path; 2] {
        [&self.loader, &self.module]
    }
}

/// Inputs of the final link
#[derive(Debug, Clone)]
pub struct LinkPlan {
    app_dir: PathBuf,
    js_dir: PathBuf,
    artifacts: LinkArtifacts,
    libraries: Vec<&'static str>,
}

impl LinkPlan {
    /// Create a link plan
    ///
    /// `libraries` must already be in link order.
    pub fn new(
        app_dir: impl Into<PathBuf>,
        js_dir: impl Into<PathBuf>,
        out_dir: &Path,
        libraries: Vec<&'static str>,
    ) -> Self {
        Self {
            app_dir: app_dir.into(),
            js_dir: js_dir.into(),
            artifacts: LinkArtifacts::in_dir(out_dir),
            libraries,
        }
    }

    /// Files the link produces
    pub fn artifacts(&self) -> &LinkArtifacts {
        &self.artifacts
    }

    /// Loader scripts the link embeds
    pub fn scripts(&self) -> [PathBuf; 2] {
        [self.js_dir.join("pre.js"), self.js_dir.join("post.js")]
    }

    /// Build the link invocation
    pub fn invocation(&self, env: &ToolchainEnvironment) -> Invocation {
        let [pre, post] = self.scripts();
        Invocation::new("/bin/bash", &self.app_dir)
            .args(["./libtool", "--silent", "--tag=CC", "--mode=link", "emcc"])
            .args(env.ldflags().split_whitespace())
            .args(env.cflags().split_whitespace())
            .args(env.profile().link_flags().iter().copied())
            .arg("--pre-js")
            .arg(pre.display().to_string())
            .arg("--post-js")
            .arg(post.display().to_string())
            .arg(format!(
                "-sEXPORTED_RUNTIME_METHODS=[{}]",
                EXPORTED_RUNTIME_METHODS.join(",")
            ))
            .arg(format!(
                "-sINCOMING_MODULE_JS_API=[{}]",
                INCOMING_MODULE_JS_API.join(",")
            ))
            .arg(format!(
                "-sEXPORTED_FUNCTIONS={}",
                EXPORTED_FUNCTIONS.join(",")
            ))
            .args(RUNTIME_SETTINGS.iter().copied())
            .arg("-o")
            .arg(self.artifacts.loader.display().to_string())
            .args(APPLICATION_INPUTS.iter().copied())
            .args(JS_LIBRARIES.iter().copied())
            .args(self.libraries.iter().map(|lib| format!("-l{lib}")))
            .arg("-lembind")
            .envs(env.with_overrides(&[]))
            .label(LINK_LABEL)
    }
}
