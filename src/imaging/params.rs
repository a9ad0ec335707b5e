//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between request resolution (which decides the settings for each
//! image) and the [`backend`](super::backend) (which does the pixel work).
//! This separation allows swapping backends (e.g. for testing with a mock)
//! without changing resolution or batch logic.
//!
//! ## Types
//!
//! - [`Level`]: A 0–100 slider value (brightness, contrast, saturation, opacity). Clamped on construction.
//! - [`Quality`]: Lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`FilterKind`]: The closed set of stylistic filters.
//! - [`TransformParameters`]: Fully resolved settings for one image.
//! - [`EncodeParams`]: The subset the encoder needs: format, opacity, quality.

use super::format::OutputFormat;
use serde::{Deserialize, Serialize};

/// A slider value in `[0, 100]`.
///
/// 50 is neutral for brightness, contrast and saturation; 100 is fully
/// opaque for opacity.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Level(f32);

impl Level {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 100.0;
    pub const NEUTRAL: Level = Level(50.0);
    pub const OPAQUE: Level = Level(100.0);

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Multiplier relative to neutral: 50 → 1.0, 100 → 2.0, 0 → 0.0.
    pub fn factor(self) -> f32 {
        self.0 / Self::NEUTRAL.0
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Stylistic filter applied after color adjustment. Exactly one per image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    None,
    Grayscale,
    Sepia,
    Blur,
    Invert,
    Sharpen,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        FilterKind::None,
        FilterKind::Grayscale,
        FilterKind::Sepia,
        FilterKind::Blur,
        FilterKind::Invert,
        FilterKind::Sharpen,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Sepia => "sepia",
            FilterKind::Blur => "blur",
            FilterKind::Invert => "invert",
            FilterKind::Sharpen => "sharpen",
        }
    }

    /// Case-insensitive lookup by name. Unknown names return `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.name() == normalized)
    }
}

/// Fully resolved settings for one image in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParameters {
    pub target_width: u32,
    pub target_height: u32,
    /// Degrees, counter-clockwise. Not range-restricted.
    pub rotation_degrees: f32,
    pub brightness: Level,
    pub contrast: Level,
    pub saturation: Level,
    pub opacity: Level,
    pub filter: FilterKind,
    pub output_format: OutputFormat,
    /// Output filename without extension (caller override or derived from the reference).
    pub base_name: String,
}

impl TransformParameters {
    /// Neutral settings at the given size: no rotation, no color change,
    /// opaque, no filter.
    pub fn neutral(width: u32, height: u32, output_format: OutputFormat) -> Self {
        Self {
            target_width: width,
            target_height: height,
            rotation_degrees: 0.0,
            brightness: Level::NEUTRAL,
            contrast: Level::NEUTRAL,
            saturation: Level::NEUTRAL,
            opacity: Level::OPAQUE,
            filter: FilterKind::None,
            output_format,
            base_name: "image".to_string(),
        }
    }

    pub fn encode_params(&self, quality: Quality) -> EncodeParams {
        EncodeParams {
            format: self.output_format,
            opacity: self.opacity,
            quality,
        }
    }
}

/// Parameters for the compositing and encoding step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    pub opacity: Level,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_clamps_to_valid_range() {
        assert_eq!(Level::new(-10.0).value(), 0.0);
        assert_eq!(Level::new(42.5).value(), 42.5);
        assert_eq!(Level::new(500.0).value(), 100.0);
    }

    #[test]
    fn level_factor_is_relative_to_neutral() {
        assert_eq!(Level::NEUTRAL.factor(), 1.0);
        assert_eq!(Level::new(100.0).factor(), 2.0);
        assert_eq!(Level::new(0.0).factor(), 0.0);
    }

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_95() {
        assert_eq!(Quality::default().value(), 95);
    }

    #[test]
    fn filter_parse_is_case_insensitive() {
        assert_eq!(FilterKind::parse("Sepia"), Some(FilterKind::Sepia));
        assert_eq!(FilterKind::parse(" GRAYSCALE "), Some(FilterKind::Grayscale));
        assert_eq!(FilterKind::parse("none"), Some(FilterKind::None));
        assert_eq!(FilterKind::parse("vignette"), None);
    }

    #[test]
    fn filter_names_round_trip() {
        for kind in FilterKind::ALL {
            assert_eq!(FilterKind::parse(kind.name()), Some(kind));
        }
    }

    #[test]
    fn neutral_parameters() {
        let p = TransformParameters::neutral(64, 32, OutputFormat::Png);
        assert_eq!((p.target_width, p.target_height), (64, 32));
        assert_eq!(p.opacity, Level::OPAQUE);
        assert_eq!(p.filter, FilterKind::None);

        let e = p.encode_params(Quality::new(80));
        assert_eq!(e.format, OutputFormat::Png);
        assert_eq!(e.quality.value(), 80);
    }
}
