//! Color stage: contrast/brightness, then saturation.
//!
//! Both functions work on the color channels of an RGBA buffer and leave
//! alpha alone. The two steps only roughly commute, since saturation is
//! scaled in HSV space, so callers apply them in this order.

use super::params::Level;
use image::RgbaImage;

/// Lower bound for the contrast gain, so contrast 0 still maps to a
/// (nearly flat) image instead of a constant one.
pub const MIN_GAIN: f32 = 0.01;

/// `out = clamp(round(v * contrast/50 + (brightness - 50) * 2), 0, 255)` per channel.
pub fn contrast_brightness(mut pixels: RgbaImage, contrast: Level, brightness: Level) -> RgbaImage {
    let gain = contrast.factor().max(MIN_GAIN);
    let offset = (brightness.value() - Level::NEUTRAL.value()) * 2.0;
    if gain == 1.0 && offset == 0.0 {
        return pixels;
    }

    for pixel in pixels.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = (*channel as f32 * gain + offset).round().clamp(0.0, 255.0) as u8;
        }
    }
    pixels
}

/// Scale saturation by `saturation/50` in HSV space.
///
/// Saturation and value are kept on a 0–255 scale and clipped after
/// scaling. 50 is the identity and skips the conversion entirely.
pub fn saturate(mut pixels: RgbaImage, saturation: Level) -> RgbaImage {
    let factor = saturation.factor();
    if factor == 1.0 {
        return pixels;
    }

    for pixel in pixels.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let hsv = Hsv::from_rgb(r, g, b);
        let scaled = Hsv {
            h: hsv.h,
            s: (hsv.s * factor).clamp(0.0, 255.0),
            v: hsv.v.clamp(0.0, 255.0),
        };
        let [r, g, b] = scaled.to_rgb();
        pixel.0 = [r, g, b, a];
    }
    pixels
}

/// Hue in degrees `[0, 360)`, saturation and value in `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Hsv {
    h: f32,
    s: f32,
    v: f32,
}

impl Hsv {
    fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };
        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };

        Self {
            h: if h < 0.0 { h + 360.0 } else { h },
            s,
            v: max,
        }
    }

    fn to_rgb(self) -> [u8; 3] {
        let chroma = self.v * (self.s / 255.0);
        let sector = self.h / 60.0;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = self.v - chroma;
        [r, g, b].map(|c| (c + m).round().clamp(0.0, 255.0) as u8)
    }
}
