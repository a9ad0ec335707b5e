//! Stylistic filters.
//!
//! Each filter is a pure `fn(RgbaImage) -> RgbaImage`. [`FilterKind::transform`]
//! is the dispatch table; adding a variant without an entry is a compile error.
//! Alpha is carried through unchanged by every filter except blur, which
//! smooths it along with the color channels.

use super::params::FilterKind;
use image::RgbaImage;
use image::imageops;

/// A pure pixel transform.
pub type FilterFn = fn(RgbaImage) -> RgbaImage;

/// Kernel size of the blur filter, in pixels.
pub const BLUR_KERNEL_SIZE: u32 = 15;

/// Gaussian sigma for [`BLUR_KERNEL_SIZE`]: `0.3 * ((k - 1) / 2 - 1) + 0.8`.
pub const BLUR_SIGMA: f32 = 0.3 * ((BLUR_KERNEL_SIZE as f32 - 1.0) * 0.5 - 1.0) + 0.8;

/// Sepia channel-mixing matrix, rows produce R, G, B.
pub const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// High-pass kernel: center 5, four neighbours -1.
pub const SHARPEN_KERNEL: [[f32; 3]; 3] = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];

impl FilterKind {
    pub fn transform(self) -> FilterFn {
        match self {
            FilterKind::None => identity,
            FilterKind::Grayscale => grayscale,
            FilterKind::Sepia => sepia,
            FilterKind::Blur => blur,
            FilterKind::Invert => invert,
            FilterKind::Sharpen => sharpen,
        }
    }
}

pub fn apply_filter(kind: FilterKind, pixels: RgbaImage) -> RgbaImage {
    (kind.transform())(pixels)
}

fn identity(pixels: RgbaImage) -> RgbaImage {
    pixels
}

/// BT.601 luminance replicated into R, G and B.
fn grayscale(mut pixels: RgbaImage) -> RgbaImage {
    for pixel in pixels.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let luma = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
            .round()
            .clamp(0.0, 255.0) as u8;
        pixel.0 = [luma, luma, luma, a];
    }
    pixels
}

fn sepia(mut pixels: RgbaImage) -> RgbaImage {
    for pixel in pixels.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let rgb = [r as f32, g as f32, b as f32];
        let mixed = SEPIA_MATRIX.map(|row| {
            let sum: f32 = row.iter().zip(rgb).map(|(w, c)| w * c).sum();
            sum.round().clamp(0.0, 255.0) as u8
        });
        pixel.0 = [mixed[0], mixed[1], mixed[2], a];
    }
    pixels
}

fn blur(pixels: RgbaImage) -> RgbaImage {
    imageops::blur(&pixels, BLUR_SIGMA)
}

fn invert(mut pixels: RgbaImage) -> RgbaImage {
    imageops::invert(&mut pixels);
    pixels
}

/// 3x3 convolution with clamp-to-edge sampling on the color channels.
fn sharpen(pixels: RgbaImage) -> RgbaImage {
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 {
        return pixels;
    }
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;

    RgbaImage::from_fn(width, height, |x, y| {
        let mut acc = [0.0f32; 3];
        for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
            for (kx, weight) in row.iter().enumerate() {
                if *weight == 0.0 {
                    continue;
                }
                let sx = (x as i64 + kx as i64 - 1).clamp(0, max_x) as u32;
                let sy = (y as i64 + ky as i64 - 1).clamp(0, max_y) as u32;
                let sample = pixels.get_pixel(sx, sy);
                for (slot, channel) in acc.iter_mut().zip(sample.0) {
                    *slot += weight * channel as f32;
                }
            }
        }
        let [r, g, b] = acc.map(|v| v.round().clamp(0.0, 255.0) as u8);
        image::Rgba([r, g, b, pixels.get_pixel(x, y)[3]])
    })
}
