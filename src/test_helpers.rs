//! Shared test utilities for the image-tweak test suite.
//!
//! Provides synthetic images, encoders that turn them into real container
//! bytes, and a ready-made set of in-memory collaborators.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let png = encode_png(&gradient_rgba(64, 48));
//! let (store, metadata) = memory_collaborators(&[("uploads/a.png", png.as_slice())]);
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::storage::{MemoryMetadataStore, MemoryObjectStore, ObjectStore};

// =========================================================================
// Synthetic pixels
// =========================================================================

/// Opaque image whose red channel follows x and green follows y.
///
/// Every pixel differs from its neighbours, so any geometric change shows up.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgba([r, g, 128, 255])
    })
}

// =========================================================================
// Container bytes
// =========================================================================

pub fn encode_png(pixels: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(pixels.clone())
        .write_with_encoder(PngEncoder::new(&mut bytes))
        .unwrap();
    bytes
}

/// JPEG has no alpha, so the image is flattened to RGB first.
pub fn encode_jpeg(pixels: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, 95))
        .unwrap();
    bytes
}

pub fn encode_webp(pixels: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(pixels.clone())
        .write_with_encoder(WebPEncoder::new_lossless(&mut bytes))
        .unwrap();
    bytes
}

// =========================================================================
// Collaborators
// =========================================================================

/// Memory stores with the given objects already uploaded.
pub fn memory_collaborators(objects: &[(&str, &[u8])]) -> (MemoryObjectStore, MemoryMetadataStore) {
    let store = MemoryObjectStore::new();
    for (key, bytes) in objects {
        store
            .store(key, bytes, "application/octet-stream")
            .unwrap();
    }
    (store, MemoryMetadataStore::new())
}
