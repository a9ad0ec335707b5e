//! Compositing and encoding.
//!
//! [`composite`] decides the output color model:
//!
//! | Format supports alpha | Opacity | Output |
//! |---|---|---|
//! | no (JPEG) | any | RGB, alpha dropped |
//! | yes | < 100 | RGBA, alpha capped at `round(opacity * 2.55)` |
//! | yes | 100 | RGBA if any pixel is translucent, RGB otherwise |
//!
//! [`encode_image`] then serializes with the codec from the format table.

use super::backend::BackendError;
use super::format::OutputFormat;
use super::params::{EncodeParams, Level, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, RgbaImage};

/// Alpha value for an opacity percentage.
pub fn alpha_for_opacity(opacity: Level) -> u8 {
    (opacity.value() * 2.55).round().clamp(0.0, 255.0) as u8
}

/// Pick the output color model for `format` and apply opacity.
pub fn composite(mut pixels: RgbaImage, format: OutputFormat, opacity: Level) -> DynamicImage {
    if !format.supports_alpha() {
        return DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(pixels).to_rgb8());
    }

    if opacity < Level::OPAQUE {
        let cap = alpha_for_opacity(opacity);
        for pixel in pixels.pixels_mut() {
            // Pixels already more transparent (rotation fill, source alpha) keep their value.
            pixel[3] = pixel[3].min(cap);
        }
        return DynamicImage::ImageRgba8(pixels);
    }

    if pixels.pixels().any(|p| p[3] < u8::MAX) {
        DynamicImage::ImageRgba8(pixels)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(pixels).to_rgb8())
    }
}

/// Serialize an already-composited image.
pub fn encode_image(
    image: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let mut bytes = Vec::new();
    let result = match format {
        OutputFormat::Jpeg => {
            image.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality.value()))
        }
        OutputFormat::Png => image.write_with_encoder(PngEncoder::new(&mut bytes)),
        OutputFormat::WebP => image.write_with_encoder(WebPEncoder::new_lossless(&mut bytes)),
    };
    result.map_err(|e| BackendError::Encode {
        format,
        message: e.to_string(),
    })?;
    Ok(bytes)
}

/// Composite and encode in one step, reporting what was written.
pub fn composite_and_encode(
    pixels: RgbaImage,
    params: &EncodeParams,
) -> Result<super::backend::Encoded, BackendError> {
    let (width, height) = pixels.dimensions();
    let image = composite(pixels, params.format, params.opacity);
    let has_alpha = image.color().has_alpha();
    let bytes = encode_image(&image, params.format, params.quality)?;
    Ok(super::backend::Encoded {
        bytes,
        format: params.format,
        width,
        height,
        has_alpha,
    })
}
