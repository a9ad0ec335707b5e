//! Image processing, pure Rust.
//!
//! | Stage | Module | Crate / function |
//! |---|---|---|
//! | **Decode** | [`rust_backend`] | `image::guess_format` + `load_from_memory_with_format` |
//! | **Geometry** | [`geometry`] | Lanczos3 resize, `imageproc` rotation |
//! | **Color** | [`color`] | contrast/brightness gain, HSV saturation |
//! | **Filter** | [`filters`] | grayscale, sepia, blur, invert, sharpen |
//! | **Composite + encode** | [`encode`] | opacity, JPEG/PNG/WebP encoders |
//!
//! The module is split into:
//! - **Format**: the table of supported containers
//! - **Parameters**: Data structures describing what to do to one image
//! - **Stages**: Pure pixel functions (unit testable)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining backend + naming

pub mod backend;
pub mod color;
pub mod encode;
pub mod filters;
pub mod format;
pub mod geometry;
pub mod operations;
pub mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageAsset, ImageBackend};
pub use format::OutputFormat;
pub use operations::{ProcessedResult, RenderConfig, render_bytes, render_image};
pub use params::{EncodeParams, FilterKind, Level, Quality, TransformParameters};
pub use rust_backend::RustBackend;
