//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Detect container | `image::guess_format` (magic bytes) |
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory_with_format` |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Rotate | `imageproc::geometric_transformations::rotate_about_center` |
//! | Contrast, brightness, saturation | [`color`](super::color) |
//! | Filters | [`filters`](super::filters), blur and invert via `image::imageops` |
//! | Encode | `JpegEncoder` (quality), `PngEncoder`, `WebPEncoder` (lossless) |

use super::backend::{BackendError, Encoded, ImageAsset, ImageBackend};
use super::format::OutputFormat;
use super::params::{EncodeParams, TransformParameters};
use super::{color, encode, filters, geometry};
use tracing::debug;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Identify the container from its magic bytes.
///
/// Only formats that are also valid outputs are accepted as input.
pub fn detect_format(bytes: &[u8]) -> Result<OutputFormat, BackendError> {
    let codec = image::guess_format(bytes)
        .map_err(|_| BackendError::Decode("unrecognized image data".to_string()))?;
    OutputFormat::from_codec(codec)
        .ok_or_else(|| BackendError::UnsupportedFormat(format!("{codec:?}").to_lowercase()))
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<ImageAsset, BackendError> {
        let source_format = detect_format(bytes)?;
        let img = image::load_from_memory_with_format(bytes, source_format.codec())
            .map_err(|e| BackendError::Decode(format!("{source_format}: {e}")))?;
        debug!(
            format = %source_format,
            width = img.width(),
            height = img.height(),
            alpha = img.color().has_alpha(),
            "decoded source"
        );
        Ok(ImageAsset {
            pixels: img.to_rgba8(),
            source_format,
        })
    }

    fn transform(
        &self,
        asset: ImageAsset,
        params: &TransformParameters,
    ) -> Result<ImageAsset, BackendError> {
        if params.target_width == 0 || params.target_height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "invalid target size {}x{}",
                params.target_width, params.target_height
            )));
        }

        let pixels = geometry::resize(asset.pixels, params.target_width, params.target_height);
        let pixels = geometry::rotate(pixels, params.rotation_degrees);
        debug!(
            width = params.target_width,
            height = params.target_height,
            rotation = params.rotation_degrees,
            "geometry applied"
        );

        let pixels = color::contrast_brightness(pixels, params.contrast, params.brightness);
        let pixels = color::saturate(pixels, params.saturation);
        let pixels = filters::apply_filter(params.filter, pixels);
        // Saturation runs again after the filter, so e.g. sepia can be tinted.
        let pixels = color::saturate(pixels, params.saturation);
        debug!(filter = params.filter.name(), "color and filter applied");

        Ok(ImageAsset { pixels, ..asset })
    }

    fn encode(&self, asset: ImageAsset, params: &EncodeParams) -> Result<Encoded, BackendError> {
        let encoded = encode::composite_and_encode(asset.pixels, params)?;
        debug!(
            format = %encoded.format,
            bytes = encoded.bytes.len(),
            alpha = encoded.has_alpha,
            "encoded output"
        );
        Ok(encoded)
    }
}
