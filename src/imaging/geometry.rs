//! Geometric stage: resize, then rotate.
//!
//! The order is fixed. Rotating first and resizing second produces a
//! different picture (the rotated corners would be resampled too).

use image::RgbaImage;
use image::imageops::{self, FilterType};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

/// Fill for pixels exposed by rotation. Transparent in alpha-capable
/// formats, black once the alpha channel is dropped.
pub const ROTATION_FILL: image::Rgba<u8> = image::Rgba([0, 0, 0, 0]);

/// Resize to exactly `width` x `height` with Lanczos3 resampling.
///
/// Aspect ratio is not preserved. When the target matches the current size
/// the buffer is returned untouched.
pub fn resize(pixels: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if pixels.dimensions() == (width, height) {
        return pixels;
    }
    imageops::resize(&pixels, width, height, FilterType::Lanczos3)
}

/// Rotate about the image center, counter-clockwise for positive angles,
/// keeping the canvas size. Content pushed outside the canvas is clipped.
pub fn rotate(pixels: RgbaImage, degrees: f32) -> RgbaImage {
    if degrees % 360.0 == 0.0 {
        return pixels;
    }
    // imageproc turns clockwise for positive theta (y axis points down).
    let theta = -degrees.to_radians();
    rotate_about_center(&pixels, theta, Interpolation::Bilinear, ROTATION_FILL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::gradient_rgba;
    use image::Rgba;

    /// Left half red, right half blue.
    fn split_image(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, _| {
            if x < size / 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn resize_to_exact_dimensions_ignores_aspect() {
        let out = resize(gradient_rgba(40, 30), 17, 50);
        assert_eq!(out.dimensions(), (17, 50));
    }

    #[test]
    fn resize_to_same_size_is_identity() {
        let src = gradient_rgba(32, 24);
        let out = resize(src.clone(), 32, 24);
        assert_eq!(out, src);
    }

    #[test]
    fn rotate_zero_and_full_turns_are_identity() {
        let src = gradient_rgba(20, 10);
        assert_eq!(rotate(src.clone(), 0.0), src);
        assert_eq!(rotate(src.clone(), 360.0), src);
        assert_eq!(rotate(src.clone(), -720.0), src);
    }

    #[test]
    fn rotate_keeps_canvas_size() {
        let out = rotate(gradient_rgba(40, 20), 33.0);
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn positive_angle_turns_counter_clockwise() {
        // Counter-clockwise by 90: the right (blue) half ends up on top.
        let out = rotate(split_image(20), 90.0);
        let top = out.get_pixel(10, 4);
        let bottom = out.get_pixel(10, 15);
        assert!(top[2] > 200 && top[0] < 50, "top should be blue, got {top:?}");
        assert!(
            bottom[0] > 200 && bottom[2] < 50,
            "bottom should be red, got {bottom:?}"
        );
    }

    #[test]
    fn negative_angle_turns_clockwise() {
        let out = rotate(split_image(20), -90.0);
        let top = out.get_pixel(10, 4);
        assert!(top[0] > 200 && top[2] < 50, "top should be red, got {top:?}");
    }

    #[test]
    fn exposed_corners_use_fill() {
        let src = RgbaImage::from_pixel(40, 40, Rgba([200, 200, 200, 255]));
        let out = rotate(src, 45.0);
        assert_eq!(*out.get_pixel(0, 0), ROTATION_FILL);
        assert_eq!(*out.get_pixel(39, 39), ROTATION_FILL);
        assert_eq!(out.get_pixel(20, 20)[3], 255);
    }

    #[test]
    fn angles_beyond_a_full_turn_are_legal() {
        let a = rotate(split_image(20), 450.0);
        let b = rotate(split_image(20), 90.0);
        let pa = a.get_pixel(10, 4);
        let pb = b.get_pixel(10, 4);
        assert!((pa[2] as i32 - pb[2] as i32).abs() <= 2);
    }
}
