//! Supported container formats.
//!
//! Every format the pipeline can read or write lives in one static table,
//! [`FORMAT_TABLE`], which pins down its file extension, MIME content type,
//! whether it can carry an alpha channel, and the `image` crate codec used to
//! decode and encode it. Anything outside the table is rejected with
//! [`BackendError::UnsupportedFormat`](super::BackendError::UnsupportedFormat).
//!
//! | Format | Extension | Content type | Alpha |
//! |--------|-----------|--------------|-------|
//! | JPEG   | `jpg`     | `image/jpeg` | no    |
//! | PNG    | `png`     | `image/png`  | yes   |
//! | WebP   | `webp`    | `image/webp` | yes   |
//!
//! Requested format names are case-insensitive and `jpeg` is accepted as an
//! alias for `jpg`.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

/// One row of the format table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub format: OutputFormat,
    /// Extension used for output filenames.
    pub extension: &'static str,
    pub content_type: &'static str,
    pub supports_alpha: bool,
    /// Codec in the `image` crate that reads and writes this container.
    pub codec: ImageFormat,
}

pub const FORMAT_TABLE: &[FormatSpec] = &[
    FormatSpec {
        format: OutputFormat::Jpeg,
        extension: "jpg",
        content_type: "image/jpeg",
        supports_alpha: false,
        codec: ImageFormat::Jpeg,
    },
    FormatSpec {
        format: OutputFormat::Png,
        extension: "png",
        content_type: "image/png",
        supports_alpha: true,
        codec: ImageFormat::Png,
    },
    FormatSpec {
        format: OutputFormat::WebP,
        extension: "webp",
        content_type: "image/webp",
        supports_alpha: true,
        codec: ImageFormat::WebP,
    },
];

/// Names accepted in requests, after lower-casing.
const NAME_ALIASES: &[(&str, OutputFormat)] = &[
    ("jpg", OutputFormat::Jpeg),
    ("jpeg", OutputFormat::Jpeg),
    ("png", OutputFormat::Png),
    ("webp", OutputFormat::WebP),
];

impl OutputFormat {
    /// Parse a requested format name (`"PNG"`, `" jpeg "`, ...).
    ///
    /// Returns `None` for anything outside the supported set; callers decide
    /// what to fall back to.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        NAME_ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map(|(_, format)| *format)
    }

    /// Map a codec detected by the `image` crate onto a supported format.
    pub fn from_codec(codec: ImageFormat) -> Option<Self> {
        FORMAT_TABLE
            .iter()
            .find(|spec| spec.codec == codec)
            .map(|spec| spec.format)
    }

    pub fn spec(self) -> &'static FormatSpec {
        let row = match self {
            OutputFormat::Jpeg => 0,
            OutputFormat::Png => 1,
            OutputFormat::WebP => 2,
        };
        &FORMAT_TABLE[row]
    }

    pub fn extension(self) -> &'static str {
        self.spec().extension
    }

    pub fn content_type(self) -> &'static str {
        self.spec().content_type
    }

    pub fn supports_alpha(self) -> bool {
        self.spec().supports_alpha
    }

    pub fn codec(self) -> ImageFormat {
        self.spec().codec
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
