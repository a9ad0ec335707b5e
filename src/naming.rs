//! Output filenames, storage keys and public URLs.
//!
//! Every processed image gets a base name, chosen in this order:
//!
//! 1. The caller's `overwrittenFilename` entry, reduced to its trailing path
//!    segment with a known image extension stripped (`"shots/cat.png"` → `cat`).
//! 2. The trailing path segment of the source reference minus its extension
//!    (`"uploads/raw/IMG_0042.jpeg"` → `IMG_0042`).
//! 3. `image-{n}` (1-based position) when neither yields anything, e.g. for
//!    inline `data:` sources.
//!
//! The extension always comes from the output format, never from the name.
//! Whether a random token is appended is decided by [`CollisionPolicy`].

use crate::imaging::OutputFormat;
use serde::{Deserialize, Serialize};

/// What to do about two requests that produce the same filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Use the name as given. Collisions are the caller's problem.
    #[default]
    Caller,
    /// Append `-{8 hex chars}` from a v4 UUID.
    RandomSuffix,
}

/// Extensions stripped from caller-supplied names.
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Last `/`- or `\`-separated segment, with any query or fragment removed.
fn trailing_segment(reference: &str) -> &str {
    let without_query = reference.split(['?', '#']).next().unwrap_or(reference);
    without_query
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(without_query)
        .trim()
}

/// Split `name.ext` into `(name, Some(ext))`. Dotfiles keep their name.
fn split_extension(segment: &str) -> (&str, Option<&str>) {
    match segment.rfind('.') {
        Some(pos) if pos > 0 => (&segment[..pos], Some(&segment[pos + 1..])),
        _ => (segment, None),
    }
}

/// Reduce a caller-supplied filename to a bare base name.
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_override(raw: &str) -> Option<String> {
    let segment = trailing_segment(raw);
    let base = match split_extension(segment) {
        (stem, Some(ext))
            if KNOWN_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext)) =>
        {
            stem
        }
        _ => segment,
    };
    let base = base.trim();
    (!base.is_empty() && base != "." && base != "..").then(|| base.to_string())
}

/// Base name derived from the source reference for image `index`.
pub fn derive_base_name(reference: &str, index: usize) -> String {
    let fallback = || format!("image-{}", index + 1);
    if reference.trim_start().starts_with("data:") {
        return fallback();
    }
    let (stem, _) = split_extension(trailing_segment(reference));
    let stem = stem.trim();
    if stem.is_empty() || stem == "." || stem == ".." {
        fallback()
    } else {
        stem.to_string()
    }
}

/// `{base}.{ext}`, or `{base}-{token}.{ext}` under [`CollisionPolicy::RandomSuffix`].
pub fn output_filename(base: &str, format: OutputFormat, policy: CollisionPolicy) -> String {
    match policy {
        CollisionPolicy::Caller => format!("{base}.{}", format.extension()),
        CollisionPolicy::RandomSuffix => {
            let token = uuid::Uuid::new_v4().simple().to_string();
            format!("{base}-{}.{}", &token[..8], format.extension())
        }
    }
}

/// Object-store key for an output file.
pub fn storage_key(prefix: &str, filename: &str) -> String {
    format!("{prefix}{filename}")
}

/// Public URL for a stored key.
pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}
