//! High-level transcode operation.
//!
//! [`transcode`] combines the pieces: decode through the backend, normalize
//! the color model for the output format, resize once, then either search
//! for a quality that fits the byte window or encode once for formats
//! without a quality parameter. It returns bytes and a classification; it
//! never touches the filesystem.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::normalize_dimensions;
use super::format::{EncodingTarget, OutputFormat, prepare_color};
use super::params::{InvalidConfig, Quality, TranscodeConfig};
use super::search::{SearchResult, encode_once, search_quality};
use image::GenericImageView;
use thiserror::Error;

/// Why a single image could not be transcoded.
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] InvalidConfig),
}

impl TranscodeError {
    fn decode(err: BackendError) -> Self {
        TranscodeError::Decode(match err {
            BackendError::Decode(msg) | BackendError::Encode(msg) => msg,
            BackendError::Io(e) => e.to_string(),
        })
    }

    fn encode(err: BackendError) -> Self {
        TranscodeError::Encode(match err {
            BackendError::Decode(msg) | BackendError::Encode(msg) => msg,
            BackendError::Io(e) => e.to_string(),
        })
    }
}

/// A finished encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// Quality of the final encode; `None` for formats without a quality parameter.
    pub quality: Option<Quality>,
    pub dimensions: Dimensions,
    /// Encoder invocations spent, initial encode included.
    pub encodes: u32,
}

impl Encoded {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Result of transcoding one image.
#[derive(Debug)]
pub enum Outcome {
    /// Final size is inside the target window.
    InWindow(Encoded),
    /// Valid output whose size missed the window after the search budget ran out.
    NearMiss(Encoded),
    Failed(TranscodeError),
}

impl Outcome {
    pub fn encoded(&self) -> Option<&Encoded> {
        match self {
            Outcome::InWindow(encoded) | Outcome::NearMiss(encoded) => Some(encoded),
            Outcome::Failed(_) => None,
        }
    }

    /// In-window and near-miss both count as processed.
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }
}

/// Transcode one image held in memory.
///
/// `source_extension` hints the decoder; `output_extension` selects the
/// output format (unknown extensions encode as JPEG).
pub fn transcode(
    backend: &impl ImageBackend,
    source_bytes: &[u8],
    source_extension: &str,
    output_extension: &str,
    config: &TranscodeConfig,
) -> Outcome {
    match try_transcode(
        backend,
        source_bytes,
        source_extension,
        output_extension,
        config,
    ) {
        Ok(outcome) => outcome,
        Err(err) => Outcome::Failed(err),
    }
}

fn try_transcode(
    backend: &impl ImageBackend,
    source_bytes: &[u8],
    source_extension: &str,
    output_extension: &str,
    config: &TranscodeConfig,
) -> Result<Outcome, TranscodeError> {
    config.validate()?;
    let target = EncodingTarget::from_extension(output_extension);

    let decoded = backend
        .decode(source_bytes, source_extension)
        .map_err(TranscodeError::decode)?;
    let prepared = prepare_color(decoded, &target);

    let (width, height) =
        normalize_dimensions(prepared.dimensions(), config.min_dimension, config.upscale);
    let resized = if prepared.dimensions() == (width, height) {
        prepared
    } else {
        backend.resize(&prepared, width, height)
    };

    let mut encoder = |quality: Option<Quality>| backend.encode(&resized, target.format, quality);
    let result = if target.accepts_quality {
        search_quality(&mut encoder, &config.window, &config.quality)
    } else {
        encode_once(&mut encoder, &config.window)
    };
    let result = result.map_err(TranscodeError::encode)?;

    Ok(classify(result, target.format, Dimensions { width, height }))
}

fn classify(result: SearchResult, format: OutputFormat, dimensions: Dimensions) -> Outcome {
    let in_window = result.in_window;
    let encoded = Encoded {
        bytes: result.bytes,
        format,
        quality: result.quality,
        dimensions,
        encodes: result.encodes,
    };
    if in_window {
        Outcome::InWindow(encoded)
    } else {
        Outcome::NearMiss(encoded)
    }
}
