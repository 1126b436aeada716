//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations a transcode needs
//! from a codec library: decode, resize, and encode. Everything above it
//! (format policy, dimension math, quality search) is backend-agnostic.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! [`MockBackend`](tests::MockBackend) below, which fabricates images and
//! encoded sizes without touching a real codec.

use super::format::OutputFormat;
use super::params::Quality;
use image::DynamicImage;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Trait for image codec backends.
///
/// Backends are shared by reference across worker threads, so every method
/// takes `&self` and implementations must be `Sync`.
pub trait ImageBackend: Sync {
    /// Decode raw file bytes. `extension` is the source file's extension,
    /// used as a format hint.
    fn decode(&self, bytes: &[u8], extension: &str) -> Result<DynamicImage, BackendError>;

    /// Resample to exactly `width` x `height`.
    fn resize(&self, img: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Encode to bytes. `quality` is `None` for formats without a quality knob.
    fn encode(
        &self,
        img: &DynamicImage,
        format: OutputFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;

    /// Mock backend that records operations without running a codec.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// Decoding fabricates a transparent RGBA image of `source_dims`; encoded
    /// output is `size_of(quality)` zero bytes.
    pub struct MockBackend {
        pub source_dims: (u32, u32),
        pub size_of: fn(Option<u32>) -> usize,
        pub fail_decode: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Resize {
            width: u32,
            height: u32,
            has_alpha: bool,
        },
        Encode {
            format: OutputFormat,
            quality: Option<u32>,
            has_alpha: bool,
        },
    }

    impl MockBackend {
        pub fn new(source_dims: (u32, u32), size_of: fn(Option<u32>) -> usize) -> Self {
            Self {
                source_dims,
                size_of,
                fail_decode: false,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_decode() -> Self {
            Self {
                fail_decode: true,
                ..Self::new((1, 1), |_| 0)
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn encode_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Encode { .. }))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, _bytes: &[u8], extension: &str) -> Result<DynamicImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(extension.to_string()));
            if self.fail_decode {
                return Err(BackendError::Decode("mock decode failure".into()));
            }
            let (w, h) = self.source_dims;
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                w,
                h,
                Rgba([0, 0, 0, 0]),
            )))
        }

        fn resize(&self, img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                width,
                height,
                has_alpha: img.color().has_alpha(),
            });
            img.resize_exact(width, height, image::imageops::FilterType::Nearest)
        }

        fn encode(
            &self,
            img: &DynamicImage,
            format: OutputFormat,
            quality: Option<Quality>,
        ) -> Result<Vec<u8>, BackendError> {
            let quality = quality.map(Quality::value);
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format,
                quality,
                has_alpha: img.color().has_alpha(),
            });
            Ok(vec![0; (self.size_of)(quality)])
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::new((800, 600), |_| 10);

        let img = backend.decode(b"", "png").unwrap();
        assert_eq!((img.width(), img.height()), (800, 600));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Decode(ext) if ext == "png"));
    }

    #[test]
    fn mock_encode_size_follows_quality() {
        let backend = MockBackend::new((4, 4), |q| q.unwrap_or(0) as usize * 2);
        let img = backend.decode(b"", "jpg").unwrap();

        let bytes = backend
            .encode(&img, OutputFormat::Jpeg, Some(Quality::new(90)))
            .unwrap();
        assert_eq!(bytes.len(), 180);
        assert_eq!(backend.encode_count(), 1);
    }

    #[test]
    fn mock_failing_decode() {
        let backend = MockBackend::failing_decode();
        assert!(matches!(
            backend.decode(b"", "jpg"),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn dimensions_display() {
        assert_eq!(Dimensions::from((255, 340)).to_string(), "255x340");
    }
}
