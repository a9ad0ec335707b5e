//! High-level image operations.
//!
//! These functions combine the backend stages with naming. They take
//! resolved parameters, drive the backend, and describe the result.

use super::backend::{BackendError, ImageAsset, ImageBackend};
use super::format::OutputFormat;
use super::params::{Quality, TransformParameters};
use crate::naming::{CollisionPolicy, output_filename};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// One finished image: encoded bytes plus what the caller needs to store it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedResult {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub filename: String,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Settings shared by every image in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderConfig {
    pub quality: Quality,
    pub collision: CollisionPolicy,
}

/// Transform and encode a decoded image.
pub fn render_image(
    backend: &(impl ImageBackend + ?Sized),
    asset: ImageAsset,
    params: &TransformParameters,
    config: &RenderConfig,
) -> Result<ProcessedResult> {
    let transformed = backend.transform(asset, params)?;
    let encoded = backend.encode(transformed, &params.encode_params(config.quality))?;

    Ok(ProcessedResult {
        filename: output_filename(&params.base_name, encoded.format, config.collision),
        content_type: encoded.format.content_type(),
        format: encoded.format,
        width: encoded.width,
        height: encoded.height,
        bytes: encoded.bytes,
    })
}

/// Decode, transform and encode in one call.
pub fn render_bytes(
    backend: &(impl ImageBackend + ?Sized),
    bytes: &[u8],
    params: &TransformParameters,
    config: &RenderConfig,
) -> Result<ProcessedResult> {
    let asset = backend.decode(bytes)?;
    render_image(backend, asset, params, config)
}
