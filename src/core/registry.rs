//! Recipe registry
//!
//! The registry is a manually curated topological order over the implicit
//! dependency graph: every recipe finds its prerequisites in the shared
//! prefix, so a requirement must always be built first. Recipes declare
//! what they require and [`RecipeRegistry::validate`] checks the order; no
//! automatic reordering is ever performed.

use std::collections::HashMap;

use crate::core::recipe::{
    AdHocStrategy, Adjustment, AutotoolsStrategy, CMakeDriver, CMakeStrategy, Recipe,
};
use crate::error::RegistryError;

/// Name of the application recipe, built last and linked from its tree
pub const APPLICATION: &str = "ImageMagick";

/// Ordered list of recipes
#[derive(Debug, Default)]
pub struct RecipeRegistry {
    recipes: Vec<Recipe>,
}

impl RecipeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a recipe at the end of the order
    #[must_use]
    pub fn with(mut self, recipe: Recipe) -> Self {
        self.recipes.push(recipe);
        self
    }

    /// Recipes in build order
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Number of recipes
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Position of a recipe in the order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.recipes.iter().position(|r| r.name() == name)
    }

    /// Check that names are unique and every requirement sits strictly earlier
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut positions = HashMap::new();
        for (index, recipe) in self.recipes.iter().enumerate() {
            if positions.insert(recipe.name(), index).is_some() {
                return Err(RegistryError::Duplicate {
                    name: recipe.name().to_string(),
                });
            }
        }

        for (index, recipe) in self.recipes.iter().enumerate() {
            for requires in recipe.required() {
                match positions.get(requires) {
                    None => {
                        return Err(RegistryError::UnknownRequirement {
                            recipe: recipe.name().to_string(),
                            requires: (*requires).to_string(),
                        })
                    }
                    Some(&at) if at >= index => {
                        return Err(RegistryError::OutOfOrder {
                            recipe: recipe.name().to_string(),
                            requires: (*requires).to_string(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Static archives for the final link
    ///
    /// Recipes in reverse build order so every archive precedes the archives
    /// it depends on; each recipe's own list keeps its declared order.
    pub fn link_order(&self) -> Vec<&'static str> {
        self.recipes
            .iter()
            .rev()
            .flat_map(|r| r.archives().iter().copied())
            .collect()
    }

    /// The full dependency chain for the WebAssembly ImageMagick build
    #[allow(clippy::too_many_lines)]
    pub fn standard() -> Self {
        Self::new()
            .with(
                Recipe::new("zlib", AutotoolsStrategy::plain().options(&["--static"]))
                    .libraries(&["z"]),
            )
            .with(
                Recipe::new(
                    "jpeg-turbo",
                    CMakeStrategy::in_tree(".")
                        .defines(&[
                            ("ENABLE_SHARED", "off"),
                            ("WITH_SIMD", "1"),
                            ("CMAKE_BUILD_TYPE", "Release"),
                        ])
                        .c_flags(""),
                )
                .libraries(&["jpeg"]),
            )
            .with(
                Recipe::new(
                    "png",
                    AutotoolsStrategy::new().options(&[
                        "--disable-mips-msa",
                        "--disable-arm-neon",
                        "--disable-powerpc-vsx",
                        "--disable-shared",
                    ]),
                )
                .requires(&["zlib"])
                .libraries(&["png"]),
            )
            .with(
                Recipe::new("tiff", AutotoolsStrategy::new().options(&["--disable-shared"]))
                    .requires(&["zlib", "jpeg-turbo"])
                    .libraries(&["tiff"]),
            )
            .with(
                Recipe::new("webp", AutotoolsStrategy::new().options(&["--disable-shared"]))
                    .libraries(&["webpmux", "webpdemux", "webp"]),
            )
            .with(
                Recipe::new(
                    "fftw",
                    AdHocStrategy::wrap(
                        CMakeStrategy::in_tree("./fftw-src/fftw-3.3.8")
                            .define("BUILD_SHARED_LIBS", "0"),
                    )
                    .adjust(Adjustment::AliasPkgConfig {
                        from: "fftw",
                        to: "fftw3",
                    }),
                )
                .libraries(&["fftw3"]),
            )
            .with(
                Recipe::new(
                    "lcms",
                    AutotoolsStrategy::new().options(&[
                        "--disable-shared",
                        "--enable-static",
                        "--disable-openmp",
                    ]),
                )
                .libraries(&["lcms2"]),
            )
            .with(
                Recipe::new(
                    "freetype",
                    CMakeStrategy::out_of_tree()
                        .include_dir("ZLIB_INCLUDE_DIR")
                        .archive("ZLIB_LIBRARY", "z")
                        .defines(&[
                            ("CMAKE_DISABLE_FIND_PACKAGE_BZip2", "TRUE"),
                            ("CMAKE_DISABLE_FIND_PACKAGE_PNG", "TRUE"),
                            ("BUILD_SHARED_LIBS", "off"),
                            ("CMAKE_BUILD_TYPE", "Release"),
                        ])
                        .c_flags(""),
                )
                .requires(&["zlib"])
                .libraries(&["freetype"]),
            )
            .with(
                Recipe::new(
                    "aom",
                    CMakeStrategy::out_of_tree()
                        .defines(&[
                            ("CMAKE_BUILD_TYPE", "Release"),
                            ("ENABLE_SHARED", "OFF"),
                            ("ENABLE_STATIC", "ON"),
                            ("ENABLE_NASM", "OFF"),
                            ("ENABLE_DOCS", "OFF"),
                            ("ENABLE_EXAMPLES", "OFF"),
                            ("ENABLE_TESTDATA", "OFF"),
                            ("ENABLE_TESTS", "OFF"),
                            ("ENABLE_TOOLS", "OFF"),
                            ("CONFIG_RUNTIME_CPU_DETECT", "0"),
                            ("CONFIG_WEBM_IO", "0"),
                            ("CONFIG_PIC", "0"),
                            ("CONFIG_LIBYUV", "0"),
                            ("FORCE_HIGHBITDEPTH_DECODING", "0"),
                            ("CONFIG_AV1_DECODER", "1"),
                            ("CONFIG_AV1_ENCODER", "1"),
                            ("ENABLE_CCACHE", "OFF"),
                            ("AOM_TARGET_CPU", "generic"),
                        ])
                        .c_flags(" -DEMSCRIPTEN -D__EMSCRIPTEN__")
                        .cxx_flags(" -DEMSCRIPTEN -D__EMSCRIPTEN__"),
                )
                .libraries(&["aom"]),
            )
            .with(
                Recipe::new(
                    "libheif",
                    CMakeStrategy::out_of_tree()
                        .defines(&[
                            ("CMAKE_BUILD_TYPE", "Release"),
                            ("BUILD_SHARED_LIBS", "false"),
                            ("WITH_EXAMPLES", "false"),
                            ("BUILD_TESTING", "false"),
                            ("ENABLE_PLUGIN_LOADING", "false"),
                            ("WITH_JPEG_DECODER", "false"),
                            ("WITH_JPEG_ENCODER", "false"),
                            ("WITH_AOM_DECODER", "ON"),
                            ("WITH_AOM_ENCODER", "ON"),
                        ])
                        .include_dir("AOM_INCLUDE_DIR")
                        .archive("AOM_LIBRARY", "aom")
                        .c_flags("")
                        .cxx_flags(""),
                )
                .requires(&["aom"])
                .libraries(&["heif"]),
            )
            .with(
                Recipe::new(
                    "highway",
                    CMakeStrategy::out_of_tree()
                        .defines(&[("BUILD_TESTING", "off"), ("CMAKE_BUILD_TYPE", "Release")])
                        .c_flags("")
                        .cxx_flags(""),
                )
                .libraries(&["hwy"]),
            )
            .with(
                Recipe::new(
                    "brotli",
                    CMakeStrategy::out_of_tree()
                        .driver(CMakeDriver::CMakeBuild)
                        .defines(&[
                            ("BROTLI_DISABLE_TESTS", "true"),
                            ("CMAKE_BUILD_TYPE", "Release"),
                        ]),
                )
                .libraries(&["brotlienc", "brotlidec", "brotlicommon"]),
            )
            .with(
                Recipe::new(
                    "libjxl",
                    CMakeStrategy::out_of_tree()
                        .defines(&[
                            ("CMAKE_BUILD_TYPE", "Release"),
                            ("BUILD_SHARED_LIBS", "false"),
                            ("BUILD_TESTING", "false"),
                            ("JPEGXL_ENABLE_TOOLS", "false"),
                            ("JPEGXL_ENABLE_SKCMS", "false"),
                            ("JPEGXL_ENABLE_DOXYGEN", "false"),
                            ("JPEGXL_ENABLE_MANPAGES", "false"),
                            ("JPEGXL_ENABLE_SJPEG", "false"),
                            ("JPEGXL_ENABLE_EXAMPLES", "false"),
                            ("JPEGXL_ENABLE_BENCHMARK", "false"),
                            ("JPEGXL_ENABLE_FUZZERS", "false"),
                            ("JPEGXL_BUNDLE_LIBPNG", "false"),
                            ("JPEGXL_ENABLE_JPEGLI", "false"),
                            ("JPEGXL_ENABLE_JPEGLI_LIBJPEG", "false"),
                        ])
                        .include_dir("HWY_INCLUDE_DIR")
                        .archive("HWY_LIBRARY", "hwy")
                        .include_dir("PNG_PNG_INCLUDE_DIR")
                        .archive("PNG_LIBRARY", "png")
                        .include_dir("ZLIB_INCLUDE_DIR")
                        .archive("ZLIB_LIBRARY", "z")
                        .include_dir("LCMS2_INCLUDE_DIR")
                        .archive("LCMS2_LIBRARY", "lcms2")
                        .include_dir("BROTLI_INCLUDE_DIR")
                        .archive("BROTLICOMMON_LIBRARY", "brotlicommon")
                        .archive("BROTLIENC_LIBRARY", "brotlienc")
                        .archive("BROTLIDEC_LIBRARY", "brotlidec")
                        .c_flags("")
                        .cxx_flags(""),
                )
                .requires(&["highway", "png", "zlib", "lcms", "brotli"])
                .libraries(&["jxl"]),
            )
            .with(
                Recipe::new(
                    "libxml2",
                    CMakeStrategy::out_of_tree()
                        .defines(&[
                            ("CMAKE_BUILD_TYPE", "Release"),
                            ("BUILD_SHARED_LIBS", "off"),
                        ])
                        .c_flags("")
                        .defines(&[
                            ("LIBXML2_WITH_C14N", "off"),
                            ("LIBXML2_WITH_CATALOG", "off"),
                            ("LIBXML2_WITH_DEBUG", "off"),
                            ("LIBXML2_WITH_HTML", "off"),
                            ("LIBXML2_WITH_HTTP", "off"),
                            ("LIBXML2_WITH_ICONV", "off"),
                            ("LIBXML2_WITH_LZMA", "off"),
                            ("LIBXML2_WITH_OUTPUT", "off"),
                            ("LIBXML2_WITH_PATTERN", "off"),
                            ("LIBXML2_WITH_PYTHON", "off"),
                            ("LIBXML2_WITH_READER", "off"),
                            ("LIBXML2_WITH_REGEXPS", "off"),
                            ("LIBXML2_WITH_SCHEMAS", "off"),
                            ("LIBXML2_WITH_SCHEMATRON", "off"),
                            ("LIBXML2_WITH_TREE", "off"),
                            ("LIBXML2_WITH_VALID", "off"),
                            ("LIBXML2_WITH_WRITER", "off"),
                            ("LIBXML2_WITH_XINCLUDE", "off"),
                            ("LIBXML2_WITH_XPATH", "off"),
                            ("LIBXML2_WITH_XPTR", "off"),
                        ])
                        .include_dir("ZLIB_INCLUDE_DIR")
                        .archive("ZLIB_LIBRARY", "z"),
                )
                .requires(&["zlib"])
                .libraries(&["xml2"]),
            )
            .with(
                Recipe::new(
                    APPLICATION,
                    AutotoolsStrategy::new()
                        .options(IMAGEMAGICK_OPTIONS)
                        .extra_ldflags(&["-lbrotlicommon", "-laom"])
                        .without_install(),
                )
                .requires(&[
                    "zlib",
                    "jpeg-turbo",
                    "png",
                    "tiff",
                    "webp",
                    "fftw",
                    "lcms",
                    "freetype",
                    "aom",
                    "libheif",
                    "highway",
                    "brotli",
                    "libjxl",
                    "libxml2",
                ]),
            )
    }
}

/// Delegates and features compiled into the application
const IMAGEMAGICK_OPTIONS: &[&str] = &[
    "--disable-delegate-build",
    "--disable-shared",
    "--without-magick-plus-plus",
    "--without-perl",
    "--without-x",
    "--disable-largefile",
    "--disable-openmp",
    "--without-bzlib",
    "--without-dps",
    "--without-jbig",
    "--without-openjp2",
    "--with-lcms=yes",
    "--without-wmf",
    "--with-xml=yes",
    "--with-fftw=yes",
    "--without-flif",
    "--without-fpx",
    "--without-djvu",
    "--without-fontconfig",
    "--without-raqm",
    "--without-gslib",
    "--without-gvc",
    "--with-heic=yes",
    "--without-lqr",
    "--without-openexr",
    "--without-pango",
    "--without-raw",
    "--without-rsvg",
    "--with-jxl=yes",
    "--with-quantum-depth=16",
    "--disable-docs",
    "--enable-zero-configuration",
];
