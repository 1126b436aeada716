//! Image transcoding core. No filesystem access and no logging.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Decode** | `image` crate decoders, extension as format hint |
//! | **Color model** | [`prepare_color`]: flatten on white, widen, or expand alpha |
//! | **Resize** | [`normalize_dimensions`] + Lanczos3, exactly once |
//! | **Encode** | `image` encoders, `webp` (libwebp) for lossy WebP |
//! | **Size fit** | [`search_quality`]: bounded binary search over quality |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Window, quality bounds, and transcode configuration
//! - **Format**: Output format table and color-model policy
//! - **Search**: Quality search state machine and driver loop
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`transcode`], combining everything above

pub mod backend;
mod calculations;
pub mod format;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod search;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::normalize_dimensions;
pub use format::{ColorModel, ColorPolicy, EncodingTarget, OutputFormat, prepare_color};
pub use operations::{Encoded, Outcome, TranscodeError, transcode};
pub use params::{
    InvalidConfig, Quality, QualityConfig, TargetWindow, TranscodeConfig, UpscalePolicy,
};
pub use rust_backend::{RustBackend, supported_input_extensions};
pub use search::{QualityEncoder, SearchResult, SearchState, encode_once, search_quality};
