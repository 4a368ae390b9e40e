//! Pinned dependency sources
//!
//! Each buildable unit is identified by name, repository and the exact
//! commit it is built from. The fetch step that clones these lives outside
//! this crate; here the table is consumed read-only.

use serde::Serialize;

/// One pinned source checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PinnedSource {
    /// Directory name under the source root
    pub name: &'static str,
    /// Upstream repository URL
    pub repository: &'static str,
    /// Commit the checkout must sit at
    pub revision: &'static str,
}

/// Every source tree the pipeline consumes
pub const PINNED_SOURCES: &[PinnedSource] = &[
    PinnedSource {
        name: "zlib",
        repository: "https://github.com/madler/zlib",
        revision: "51b7f2abdade71cd9bb0e7a373ef2610ec6f9daf",
    },
    PinnedSource {
        name: "jpeg-turbo",
        repository: "https://github.com/libjpeg-turbo/libjpeg-turbo",
        revision: "7723f50f3f66b9da74376e6d8badb6162464212c",
    },
    PinnedSource {
        name: "png",
        repository: "https://github.com/pnggroup/libpng",
        revision: "640204280f8109d7165f95d2b177f89baf20b253",
    },
    PinnedSource {
        name: "tiff",
        repository: "https://gitlab.com/libtiff/libtiff.git",
        revision: "9dff73bebc5661f2dace6f16e14cf9e857172f4e",
    },
    PinnedSource {
        name: "webp",
        repository: "https://github.com/webmproject/libwebp",
        revision: "a4d7a715337ded4451fec90ff8ce79728e04126c",
    },
    PinnedSource {
        name: "fftw",
        repository: "https://github.com/rust-math/fftw",
        revision: "fdd5c3b6c45c0ca26d71e52dd783c845b76a4c6a",
    },
    PinnedSource {
        name: "lcms",
        repository: "https://github.com/mm2/Little-CMS",
        revision: "5176347635785e53ee5cee92328f76fda766ecc6",
    },
    PinnedSource {
        name: "freetype",
        repository: "https://github.com/freetype/freetype",
        revision: "42608f77f20749dd6ddc9e0536788eaad70ea4b5",
    },
    PinnedSource {
        name: "aom",
        repository: "https://aomedia.googlesource.com/aom/",
        revision: "10aece4157eb79315da205f39e19bf6ab3ee30d0",
    },
    PinnedSource {
        name: "libheif",
        repository: "https://github.com/strukturag/libheif",
        revision: "5e9deb19fe6b3768af0bb8e9e5e8438b15171bf3",
    },
    PinnedSource {
        name: "highway",
        repository: "https://github.com/google/highway",
        revision: "457c891775a7397bdb0376bb1031e6e027af1c48",
    },
    PinnedSource {
        name: "brotli",
        repository: "https://github.com/google/brotli",
        revision: "ed738e842d2fbdf2d6459e39267a633c4a9b2f5d",
    },
    PinnedSource {
        name: "libjxl",
        repository: "https://github.com/libjxl/libjxl",
        revision: "794a5dcf0d54f9f0b20d288a12e87afb91d20dfc",
    },
    PinnedSource {
        name: "libxml2",
        repository: "https://github.com/GNOME/libxml2",
        revision: "8d509f483dd5ce268b2fded9c738132c47d820d8",
    },
    PinnedSource {
        name: "ImageMagick",
        repository: "https://github.com/ImageMagick/ImageMagick",
        revision: "82572afc879b439cbf8c9c6f3a9ac7626adf98fb",
    },
];
