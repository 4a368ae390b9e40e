//! Default configuration values

/// Upper bound on build-tool job parallelism
///
/// Keeps `make -j` from exhausting memory on oversubscribed CI hosts.
pub const MAX_BUILD_JOBS: usize = 5;

/// Cross-compilation host triple passed to `configure`
pub const HOST_TRIPLE: &str = "wasm32-unknown-emscripten";

/// Project config file name
pub const CONFIG_FILE: &str = "magick-forge.toml";

/// Directory holding one source tree per dependency
pub const DEFAULT_LIB_DIR: &str = "lib";

/// Installation prefix and artifact output directory
pub const DEFAULT_OUT_DIR: &str = "out";

/// Directory holding the loader pre/post scripts
pub const DEFAULT_JS_DIR: &str = "js";

/// Out-of-tree CMake build directory name
pub const CMAKE_BUILD_DIR: &str = "__build";

/// Environment variable selecting the release profile
pub const ENV_RELEASE: &str = "RELEASE";

/// Environment variable pointing at the Emscripten SDK root
pub const ENV_EMSDK: &str = "EMSDK";

/// Environment variable overriding the project directory
pub const ENV_PROJECT_DIR: &str = "MAGICK_FORGE_DIR";

/// Toolchain descriptor path relative to the SDK root
pub const TOOLCHAIN_DESCRIPTOR: &str = "upstream/emscripten/cmake/Modules/Platform/Emscripten.cmake";

/// Symbol stripping tool exported to recipes
pub const STRIP_TOOL: &str = "llvm-strip";

/// Lines of captured output kept for failure reports
pub const OUTPUT_TAIL_LINES: usize = 40;
