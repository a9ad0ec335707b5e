//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: decode, transform, and encode. The batch layer only talks to this
//! trait, so tests can swap in a recording mock and never touch real pixels.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust, built on the
//! `image` and `imageproc` crates.

use super::format::OutputFormat;
use super::params::{EncodeParams, TransformParameters};
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode {format}: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// A decoded image, owned by the invocation that processes it.
///
/// Pixels are always held as RGBA8 while the pipeline runs; the encoder
/// picks the output color model.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub pixels: RgbaImage,
    /// Container format the bytes were decoded from.
    pub source_format: OutputFormat,
}

/// Encoded output of a single image.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// Whether the written color model has an alpha channel.
    pub has_alpha: bool,
}

/// Trait for image processing backends.
///
/// Every backend must implement all three operations so the rest of the
/// codebase is backend-agnostic.
pub trait ImageBackend: Sync {
    /// Detect the container format and decode the pixel buffer.
    fn decode(&self, bytes: &[u8]) -> Result<ImageAsset, BackendError>;

    /// Run the pixel stages: geometry, color, filter, second saturation pass.
    fn transform(
        &self,
        asset: ImageAsset,
        params: &TransformParameters,
    ) -> Result<ImageAsset, BackendError>;

    /// Apply opacity and serialize to the requested container.
    fn encode(&self, asset: ImageAsset, params: &EncodeParams) -> Result<Encoded, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::{FilterKind, Quality};
    use std::sync::Mutex;

    /// Pixel size of one queued mock decode result.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Dimensions {
        pub width: u32,
        pub height: u32,
    }

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// Each `decode` consumes the next queued [`Dimensions`] in FIFO order and
    /// fails once the queue is empty, which doubles as failure injection.
    #[derive(Default)]
    pub struct MockBackend {
        pub decode_results: Mutex<Vec<Dimensions>>,
        pub source_format: Option<OutputFormat>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode {
            len: usize,
        },
        Transform {
            width: u32,
            height: u32,
            rotation: f32,
            filter: FilterKind,
        },
        Encode {
            format: OutputFormat,
            opacity: f32,
            quality: u8,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                decode_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn decode_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Decode { .. }))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8]) -> Result<ImageAsset, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode { len: bytes.len() });

            let mut queue = self.decode_results.lock().unwrap();
            if queue.is_empty() {
                return Err(BackendError::Decode("No mock dimensions".to_string()));
            }
            let dims = queue.remove(0);
            Ok(ImageAsset {
                pixels: RgbaImage::new(dims.width, dims.height),
                source_format: self.source_format.unwrap_or(OutputFormat::Png),
            })
        }

        fn transform(
            &self,
            asset: ImageAsset,
            params: &TransformParameters,
        ) -> Result<ImageAsset, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Transform {
                width: params.target_width,
                height: params.target_height,
                rotation: params.rotation_degrees,
                filter: params.filter,
            });
            Ok(ImageAsset {
                pixels: RgbaImage::new(params.target_width, params.target_height),
                ..asset
            })
        }

        fn encode(&self, asset: ImageAsset, params: &EncodeParams) -> Result<Encoded, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format: params.format,
                opacity: params.opacity.value(),
                quality: params.quality.value(),
            });
            let (width, height) = asset.pixels.dimensions();
            Ok(Encoded {
                bytes: params.format.extension().as_bytes().to_vec(),
                format: params.format,
                width,
                height,
                has_alpha: params.format.supports_alpha(),
            })
        }
    }

    #[test]
    fn mock_decodes_in_fifo_order() {
        let backend = MockBackend::with_dimensions(vec![
            Dimensions {
                width: 800,
                height: 600,
            },
            Dimensions {
                width: 10,
                height: 20,
            },
        ]);

        let first = backend.decode(b"abc").unwrap();
        let second = backend.decode(b"de").unwrap();
        assert_eq!(first.pixels.width(), 800);
        assert_eq!(second.pixels.height(), 20);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], RecordedOp::Decode { len: 3 }));
    }

    #[test]
    fn mock_fails_when_queue_is_empty() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.decode(b"x"),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn mock_records_transform_and_encode() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 4,
            height: 4,
        }]);
        let asset = backend.decode(b"x").unwrap();

        let mut params = TransformParameters::neutral(8, 2, OutputFormat::Jpeg);
        params.rotation_degrees = 90.0;
        params.filter = FilterKind::Sepia;

        let asset = backend.transform(asset, &params).unwrap();
        let encoded = backend
            .encode(asset, &params.encode_params(Quality::new(70)))
            .unwrap();
        assert_eq!((encoded.width, encoded.height), (8, 2));

        let ops = backend.get_operations();
        assert_eq!(
            ops[1],
            RecordedOp::Transform {
                width: 8,
                height: 2,
                rotation: 90.0,
                filter: FilterKind::Sepia,
            }
        );
        assert!(matches!(
            &ops[2],
            RecordedOp::Encode {
                format: OutputFormat::Jpeg,
                quality: 70,
                ..
            }
        ));
    }
}
