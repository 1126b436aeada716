//! Parameter types for transcoding.
//!
//! These structs describe *what* to aim for, not *how* to get there. They are
//! the interface between the [`operations`](super::operations) module (which
//! drives a transcode) and the [`search`](super::search) engine and
//! [`backend`](super::backend) (which do the actual encoding work). All of
//! them are plain values passed explicitly, so concurrent transcodes share
//! nothing but read-only configuration.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`TargetWindow`]: Closed byte-size interval a finished encode must land in.
//! - [`QualityConfig`]: Initial quality, floor, ceiling and attempt cap for the search.
//! - [`UpscalePolicy`]: Whether images already smaller than the target get enlarged.
//! - [`TranscodeConfig`]: Everything a single transcode needs.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rejected configuration value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidConfig {
    #[error("target window is empty: min_bytes {min} > max_bytes {max}")]
    EmptyWindow { min: u64, max: u64 },
    #[error("target window bounds must be positive")]
    ZeroWindow,
    #[error("min_dimension must be at least 1")]
    ZeroDimension,
    #[error("quality bounds must satisfy 1 <= floor ({floor}) <= initial ({initial}) <= ceiling ({ceiling}) <= 100")]
    QualityBounds { floor: u32, initial: u32, ceiling: u32 },
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
}

/// Closed byte-size interval `[min_bytes, max_bytes]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetWindow {
    pub min_bytes: u64,
    pub max_bytes: u64,
}

impl TargetWindow {
    pub fn new(min_bytes: u64, max_bytes: u64) -> Result<Self, InvalidConfig> {
        let window = Self {
            min_bytes,
            max_bytes,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.min_bytes == 0 || self.max_bytes == 0 {
            return Err(InvalidConfig::ZeroWindow);
        }
        if self.min_bytes > self.max_bytes {
            return Err(InvalidConfig::EmptyWindow {
                min: self.min_bytes,
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    pub fn contains(&self, size: u64) -> bool {
        (self.min_bytes..=self.max_bytes).contains(&size)
    }

    pub fn is_above(&self, size: u64) -> bool {
        size > self.max_bytes
    }

    pub fn is_below(&self, size: u64) -> bool {
        size < self.min_bytes
    }
}

impl Default for TargetWindow {
    /// 50 KiB – 100 KiB.
    fn default() -> Self {
        Self {
            min_bytes: 50 * 1024,
            max_bytes: 100 * 1024,
        }
    }
}

/// Quality search bounds.
///
/// - `initial`: first quality tried; if it already lands in the window no search runs
/// - `floor` / `ceiling`: inclusive binary-search range
/// - `max_attempts`: cap on search encodes after the initial encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    pub initial: u32,
    pub floor: u32,
    pub ceiling: u32,
    pub max_attempts: u32,
}

impl QualityConfig {
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        let ordered = 1 <= self.floor
            && self.floor <= self.initial
            && self.initial <= self.ceiling
            && self.ceiling <= 100;
        if !ordered {
            return Err(InvalidConfig::QualityBounds {
                floor: self.floor,
                initial: self.initial,
                ceiling: self.ceiling,
            });
        }
        if self.max_attempts == 0 {
            return Err(InvalidConfig::ZeroAttempts);
        }
        Ok(())
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            initial: 85,
            floor: 60,
            ceiling: 95,
            max_attempts: 10,
        }
    }
}

/// What to do with images whose smaller side is already at or below the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpscalePolicy {
    /// Normalize every image so its smaller side equals the target exactly.
    #[default]
    Always,
    /// Leave images at or below the target at their source dimensions.
    Never,
}

/// Everything one transcode needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeConfig {
    pub min_dimension: u32,
    pub upscale: UpscalePolicy,
    pub window: TargetWindow,
    pub quality: QualityConfig,
}

impl TranscodeConfig {
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.min_dimension == 0 {
            return Err(InvalidConfig::ZeroDimension);
        }
        self.window.validate()?;
        self.quality.validate()
    }
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            min_dimension: 255,
            upscale: UpscalePolicy::default(),
            window: TargetWindow::default(),
            quality: QualityConfig::default(),
        }
    }
}
