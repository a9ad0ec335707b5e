//! # Image Tweak
//!
//! A batch image adjustment pipeline. A client uploads a set of images,
//! picks per-image settings (size, rotation, color, filter, format), and
//! sends one request naming the images plus positional parameter arrays.
//! Each image is rendered, stored under a predictable key, and the batch's
//! filenames are recorded against the upload id.
//!
//! # Architecture: Per-Image Pipeline
//!
//! Every image goes through the same fixed sequence of stages:
//!
//! ```text
//! 1. Resolve    raw arrays   →  TransformParameters  (permissive, never fails)
//! 2. Geometry   source       →  resized, rotated      (Lanczos3, then about center)
//! 3. Color      pixels       →  contrast/brightness, then saturation
//! 4. Filter     pixels       →  named filter, then saturation again
//! 5. Encode     pixels       →  JPEG / PNG / WebP     (opacity baked into alpha)
//! ```
//!
//! The order is fixed. Saturation runs twice on purpose: once as a color
//! adjustment and once after the filter, so a user saturation setting still
//! shows through a sepia tone.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`request`] | Wire types: inbound batch body, success and error bodies |
//! | [`resolve`] | Raw parameter arrays → per-image [`imaging::TransformParameters`] |
//! | [`imaging`] | Pure-Rust image stages and the [`imaging::ImageBackend`] trait |
//! | [`naming`] | Output base names, filenames, storage keys and public URLs |
//! | [`storage`] | Object and metadata store traits, filesystem and in-memory stores |
//! | [`process`] | Batch orchestration: ordering, deadlines, rollback |
//! | [`handler`] | HTTP-style entry point with CORS headers |
//! | [`config`] | `config.toml` loading, validation and stock defaults |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## All-or-Nothing Batches
//!
//! A batch either stores every image and records its filenames, or leaves
//! nothing behind. Rendering happens before anything is written. Each key's
//! prior contents are captured before its first write, so a storage or
//! metadata failure puts back what the key held or deletes it if it was
//! empty. Clients never see half a batch.
//!
//! ## Permissive Parameters
//!
//! Parameter arrays come from browser forms and are routinely short, null,
//! stringly-typed or wrapped in extra arrays. The resolver accepts all of
//! that and falls back to defaults per field. Only the request envelope
//! (upload id, image list) is validated strictly.
//!
//! ## Injected Collaborators
//!
//! The image backend, object store and metadata store are traits passed in
//! by reference. Tests run the full batch logic against a recording mock and
//! in-memory stores; the CLI wires in the filesystem stores.

pub mod config;
pub mod handler;
pub mod imaging;
pub mod logging;
pub mod naming;
pub mod output;
pub mod process;
pub mod request;
pub mod resolve;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
