//! Parameter resolution: raw batch arrays → [`TransformParameters`] for one image.
//!
//! Resolution never fails. Anything that cannot be interpreted falls back to
//! the field default, which keeps partially-filled client forms working:
//!
//! | Field | Accepted | Fallback |
//! |---|---|---|
//! | `resX`, `resY` | positive integer after rounding, capped at `max_dimension` | configured default |
//! | `rotationState` | any finite number (degrees) | `0` |
//! | `brightness`, `contrast`, `saturation` | number, clamped to `[0, 100]` | `50` |
//! | `opacity` | number, clamped to `[0, 100]` | `100` |
//! | `filter` | filter name, any case | `none` |
//! | `outputFormat` | `jpg`, `jpeg`, `png`, `webp`, any case | source format |
//! | `overwrittenFilename` | non-blank string | derived from the reference |
//!
//! Numbers may arrive as JSON numbers, numeric strings (`"80"`), or wrapped
//! in an array whose first element is used (`[80]`).

use crate::imaging::{FilterKind, Level, OutputFormat, TransformParameters};
use crate::naming::{derive_base_name, sanitize_override};
use crate::request::ImageParameterArrays;
use serde_json::Value;

/// Configured fallbacks for the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverDefaults {
    pub width: u32,
    pub height: u32,
    /// Largest accepted target edge. Larger requests are capped.
    pub max_dimension: u32,
}

impl Default for ResolverDefaults {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            max_dimension: 8192,
        }
    }
}

/// Unwrap arrays to their first element, one level at a time.
fn first_scalar(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first().and_then(first_scalar),
        Value::Null => None,
        other => Some(other),
    }
}

fn as_finite_number(value: Option<&Value>) -> Option<f64> {
    let n = match first_scalar(value?)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn as_text(value: Option<&Value>) -> Option<&str> {
    match first_scalar(value?)? {
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

/// Permissive numeric parse: missing, null, non-numeric or non-finite → `default`.
pub fn parse_number(value: Option<&Value>, default: f64) -> f64 {
    as_finite_number(value).unwrap_or(default)
}

/// Parse a slider value and clamp it into `[0, 100]`.
pub fn parse_level(value: Option<&Value>, default: Level) -> Level {
    Level::new(parse_number(value, default.value() as f64) as f32)
}

/// Parse a target edge length. Non-positive values fall back to `default`.
pub fn parse_dimension(value: Option<&Value>, default: u32, max: u32) -> u32 {
    match as_finite_number(value).map(f64::round) {
        Some(n) if n >= 1.0 => n.min(max as f64) as u32,
        _ => default,
    }
}

pub fn parse_rotation(value: Option<&Value>) -> f32 {
    let degrees = parse_number(value, 0.0) as f32;
    // Finite f64 beyond f32 range would become infinite here.
    if degrees.is_finite() { degrees } else { 0.0 }
}

pub fn parse_format(value: Option<&Value>, source: OutputFormat) -> OutputFormat {
    as_text(value)
        .and_then(OutputFormat::parse)
        .unwrap_or(source)
}

pub fn parse_filter(value: Option<&Value>) -> FilterKind {
    as_text(value).and_then(FilterKind::parse).unwrap_or_default()
}

/// Resolve the settings for image `index` of a batch.
pub fn resolve(
    arrays: &ImageParameterArrays,
    index: usize,
    reference: &str,
    source_format: OutputFormat,
    defaults: &ResolverDefaults,
) -> TransformParameters {
    let base_name = as_text(arrays.overwritten_filename.get(index))
        .and_then(sanitize_override)
        .unwrap_or_else(|| derive_base_name(reference, index));

    TransformParameters {
        target_width: parse_dimension(
            arrays.res_x.get(index),
            defaults.width,
            defaults.max_dimension,
        ),
        target_height: parse_dimension(
            arrays.res_y.get(index),
            defaults.height,
            defaults.max_dimension,
        ),
        rotation_degrees: parse_rotation(arrays.rotation_state.get(index)),
        brightness: parse_level(arrays.brightness.get(index), Level::NEUTRAL),
        contrast: parse_level(arrays.contrast.get(index), Level::NEUTRAL),
        saturation: parse_level(arrays.saturation.get(index), Level::NEUTRAL),
        opacity: parse_level(arrays.opacity.get(index), Level::OPAQUE),
        filter: parse_filter(arrays.filter.get(index)),
        output_format: parse_format(arrays.output_format.get(index), source_format),
        base_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ParamList;
    use serde_json::json;

    fn list(value: Value) -> ParamList {
        ParamList::from(value)
    }

    // =========================================================================
    // parse_number
    // =========================================================================

    #[test]
    fn number_accepts_numbers_strings_and_wrapped() {
        assert_eq!(parse_number(Some(&json!(12.5)), 0.0), 12.5);
        assert_eq!(parse_number(Some(&json!(" 80 ")), 0.0), 80.0);
        assert_eq!(parse_number(Some(&json!([80])), 0.0), 80.0);
        assert_eq!(parse_number(Some(&json!([["7"]])), 0.0), 7.0);
    }

    #[test]
    fn number_falls_back_on_garbage() {
        assert_eq!(parse_number(None, 50.0), 50.0);
        assert_eq!(parse_number(Some(&json!(null)), 50.0), 50.0);
        assert_eq!(parse_number(Some(&json!("bright")), 50.0), 50.0);
        assert_eq!(parse_number(Some(&json!("NaN")), 50.0), 50.0);
        assert_eq!(parse_number(Some(&json!("inf")), 50.0), 50.0);
        assert_eq!(parse_number(Some(&json!(true)), 50.0), 50.0);
        assert_eq!(parse_number(Some(&json!({"v": 1})), 50.0), 50.0);
        assert_eq!(parse_number(Some(&json!([])), 50.0), 50.0);
    }

    // =========================================================================
    // bounded fields
    // =========================================================================

    #[test]
    fn levels_clamp_into_range() {
        assert_eq!(parse_level(Some(&json!(-10)), Level::NEUTRAL).value(), 0.0);
        assert_eq!(parse_level(Some(&json!(500)), Level::NEUTRAL).value(), 100.0);
        assert_eq!(parse_level(Some(&json!([500])), Level::OPAQUE).value(), 100.0);
    }

    #[test]
    fn every_bounded_field_is_clamped() {
        let arrays = ImageParameterArrays {
            brightness: list(json!([-10])),
            contrast: list(json!([500])),
            saturation: list(json!(["-3"])),
            opacity: list(json!([1e9])),
            ..Default::default()
        };
        let p = resolve(
            &arrays,
            0,
            "a.png",
            OutputFormat::Png,
            &ResolverDefaults::default(),
        );
        assert_eq!(p.brightness.value(), 0.0);
        assert_eq!(p.contrast.value(), 100.0);
        assert_eq!(p.saturation.value(), 0.0);
        assert_eq!(p.opacity.value(), 100.0);
    }

    // =========================================================================
    // dimensions / rotation
    // =========================================================================

    #[test]
    fn dimensions_round_and_reject_non_positive() {
        assert_eq!(parse_dimension(Some(&json!(199.6)), 512, 8192), 200);
        assert_eq!(parse_dimension(Some(&json!("300")), 512, 8192), 300);
        assert_eq!(parse_dimension(Some(&json!(0)), 512, 8192), 512);
        assert_eq!(parse_dimension(Some(&json!(0.4)), 512, 8192), 512);
        assert_eq!(parse_dimension(Some(&json!(-40)), 512, 8192), 512);
        assert_eq!(parse_dimension(Some(&json!("wide")), 512, 8192), 512);
    }

    #[test]
    fn dimensions_are_capped() {
        assert_eq!(parse_dimension(Some(&json!(100000)), 512, 8192), 8192);
    }

    #[test]
    fn rotation_is_not_clamped() {
        assert_eq!(parse_rotation(Some(&json!(-450))), -450.0);
        assert_eq!(parse_rotation(Some(&json!("12.5"))), 12.5);
        assert_eq!(parse_rotation(Some(&json!(1e300))), 0.0);
        assert_eq!(parse_rotation(None), 0.0);
    }

    // =========================================================================
    // enums
    // =========================================================================

    #[test]
    fn format_falls_back_to_source() {
        assert_eq!(
            parse_format(Some(&json!(" PNG ")), OutputFormat::Jpeg),
            OutputFormat::Png
        );
        assert_eq!(
            parse_format(Some(&json!("jpeg")), OutputFormat::Png),
            OutputFormat::Jpeg
        );
        assert_eq!(
            parse_format(Some(&json!("gif")), OutputFormat::WebP),
            OutputFormat::WebP
        );
        assert_eq!(parse_format(None, OutputFormat::Png), OutputFormat::Png);
        assert_eq!(
            parse_format(Some(&json!(3)), OutputFormat::Png),
            OutputFormat::Png
        );
    }

    #[test]
    fn unknown_filter_is_none() {
        assert_eq!(parse_filter(Some(&json!("Sepia"))), FilterKind::Sepia);
        assert_eq!(parse_filter(Some(&json!("vintage"))), FilterKind::None);
        assert_eq!(parse_filter(None), FilterKind::None);
    }

    // =========================================================================
    // resolve
    // =========================================================================

    #[test]
    fn short_arrays_fall_back_for_the_tail() {
        let arrays = ImageParameterArrays {
            brightness: list(json!([80])),
            ..Default::default()
        };
        let defaults = ResolverDefaults::default();
        let levels: Vec<f32> = (0..3)
            .map(|i| {
                resolve(&arrays, i, "x.png", OutputFormat::Png, &defaults)
                    .brightness
                    .value()
            })
            .collect();
        assert_eq!(levels, vec![80.0, 50.0, 50.0]);
    }

    #[test]
    fn empty_arrays_give_neutral_parameters() {
        let defaults = ResolverDefaults {
            width: 320,
            height: 240,
            max_dimension: 8192,
        };
        let p = resolve(
            &ImageParameterArrays::default(),
            0,
            "uploads/dog.webp",
            OutputFormat::WebP,
            &defaults,
        );
        let mut expected = TransformParameters::neutral(320, 240, OutputFormat::WebP);
        expected.base_name = "dog".to_string();
        assert_eq!(p, expected);
    }

    #[test]
    fn filename_override_and_fallback() {
        let arrays = ImageParameterArrays {
            overwritten_filename: list(json!(["holiday.jpg", "   ", null])),
            ..Default::default()
        };
        let defaults = ResolverDefaults::default();
        let names: Vec<String> = ["a/one.png", "a/two.png", "a/three.png"]
            .iter()
            .enumerate()
            .map(|(i, r)| resolve(&arrays, i, r, OutputFormat::Png, &defaults).base_name)
            .collect();
        assert_eq!(names, vec!["holiday", "two", "three"]);
    }

    #[test]
    fn broadcast_scalar_reaches_every_image() {
        let arrays = ImageParameterArrays {
            filter: list(json!("invert")),
            ..Default::default()
        };
        let defaults = ResolverDefaults::default();
        for i in 0..3 {
            let p = resolve(&arrays, i, "x.png", OutputFormat::Png, &defaults);
            assert_eq!(p.filter, FilterKind::Invert);
        }
    }
}
