//! Application configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` overrides any subset of them.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [defaults]
//! width = 512               # Target width when resX is missing or invalid
//! height = 512              # Target height when resY is missing or invalid
//! max_dimension = 8192      # Largest accepted target edge
//!
//! [encoding]
//! jpeg_quality = 95         # JPEG quality (1-100)
//!
//! [naming]
//! collision = "caller"      # or "random-suffix"
//!
//! [storage]
//! key_prefix = "uploads/"
//! public_url_base = "https://image-tweak-bucket.s3.amazonaws.com"
//!
//! [processing]
//! mode = "sequential"       # or "parallel"
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! timeout_secs = 30         # Batch deadline (omit for none)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [encoding]
//! jpeg_quality = 80
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Quality;
use crate::naming::CollisionPolicy;
use crate::resolve::ResolverDefaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Fallbacks used by parameter resolution.
    pub defaults: DefaultsConfig,
    /// Encoder settings.
    pub encoding: EncodingConfig,
    /// Output filename policy.
    pub naming: NamingConfig,
    /// Object keys and public URLs.
    pub storage: StorageConfig,
    /// Sequential/parallel processing and deadlines.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.width == 0 || self.defaults.height == 0 {
            return Err(ConfigError::Validation(
                "defaults.width and defaults.height must be non-zero".into(),
            ));
        }
        if self.defaults.max_dimension < self.defaults.width.max(self.defaults.height) {
            return Err(ConfigError::Validation(
                "defaults.max_dimension must be at least the default width and height".into(),
            ));
        }
        if !(1..=100).contains(&self.encoding.jpeg_quality) {
            return Err(ConfigError::Validation(
                "encoding.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.processing.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "processing.timeout_secs must be at least 1".into(),
            ));
        }
        if self.storage.public_url_base.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.public_url_base must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Fallbacks for missing or unusable request parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub width: u32,
    pub height: u32,
    /// Requested edges above this are capped.
    pub max_dimension: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let stock = ResolverDefaults::default();
        Self {
            width: stock.width,
            height: stock.height,
            max_dimension: stock.max_dimension,
        }
    }
}

impl DefaultsConfig {
    pub fn resolver_defaults(&self) -> ResolverDefaults {
        ResolverDefaults {
            width: self.width,
            height: self.height,
            max_dimension: self.max_dimension,
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// JPEG quality (1 = worst, 100 = best). PNG and WebP are lossless.
    pub jpeg_quality: u32,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: Quality::default().value() as u32,
        }
    }
}

impl EncodingConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.jpeg_quality)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    pub collision: CollisionPolicy,
}

/// Where results are stored and how they are addressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Prepended to every output filename to form the object key.
    pub key_prefix: String,
    /// Base of the public URL returned for each stored object.
    pub public_url_base: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_prefix: "uploads/".to_string(),
            public_url_base: "https://image-tweak-bucket.s3.amazonaws.com".to_string(),
        }
    }
}

/// How images within a batch are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Strictly in order; a failure stops the rest.
    #[default]
    Sequential,
    /// Transformed on a rayon pool; output order is preserved.
    Parallel,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    pub mode: ProcessingMode,
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Whole-batch deadline in seconds. Absent means no deadline.
    pub timeout_secs: Option<u64>,
}

impl ProcessingConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# image-tweak Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Parameter defaults
# ---------------------------------------------------------------------------
[defaults]
# Target size used when resX / resY is missing, not a number, or not positive.
width = 512
height = 512

# Requested edges larger than this are capped.
max_dimension = 8192

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# JPEG quality (1 = worst, 100 = best). PNG and WebP output is lossless.
jpeg_quality = 95

# ---------------------------------------------------------------------------
# Output naming
# ---------------------------------------------------------------------------
[naming]
# "caller"        -> {name}.{ext}, the caller avoids collisions
# "random-suffix" -> {name}-{8 hex chars}.{ext}
collision = "caller"

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Object key = key_prefix + filename.
key_prefix = "uploads/"

# URL returned for each stored object = public_url_base + "/" + key.
public_url_base = "https://image-tweak-bucket.s3.amazonaws.com"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# "sequential" processes images strictly in order.
# "parallel" transforms images on a worker pool; output order is unchanged.
mode = "sequential"

# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Deadline for a whole batch, in seconds. Omit for no deadline.
# timeout_secs = 30
"##
}
