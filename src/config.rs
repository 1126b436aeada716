//! Tool configuration module.
//!
//! Handles loading and validating `imgfit.toml`. Every key is optional;
//! missing keys fall back to the stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [resize]
//! min_dimension = 255       # Smaller side of every output, in pixels
//! upscale = "always"        # "always" | "never" (leave small images alone)
//!
//! [window]
//! min_bytes = 51200         # 50 KiB
//! max_bytes = 102400        # 100 KiB
//!
//! [quality]
//! initial = 85              # First quality tried
//! floor = 60                # Lowest quality the search may try
//! ceiling = 95              # Highest quality the search may try
//! max_attempts = 10         # Search encodes after the first encode
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    InvalidConfig, QualityConfig, TargetWindow, TranscodeConfig, UpscalePolicy,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

impl From<InvalidConfig> for ConfigError {
    fn from(err: InvalidConfig) -> Self {
        ConfigError::Validation(err.to_string())
    }
}

/// Tool configuration loaded from `imgfit.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Output dimension settings.
    pub resize: ResizeConfig,
    /// Accepted output size range.
    pub window: TargetWindow,
    /// Quality search bounds.
    pub quality: QualityConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transcode().validate()?;
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The per-image slice of the configuration.
    pub fn transcode(&self) -> TranscodeConfig {
        TranscodeConfig {
            min_dimension: self.resize.min_dimension,
            upscale: self.resize.upscale,
            window: self.window,
            quality: self.quality,
        }
    }
}

/// Output dimension settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// Target size of each output's smaller side.
    pub min_dimension: u32,
    /// Whether images already at or below the target are enlarged.
    pub upscale: UpscalePolicy,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        let defaults = TranscodeConfig::default();
        Self {
            min_dimension: defaults.min_dimension,
            upscale: defaults.upscale,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
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

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file.
///
/// A missing file yields the stock defaults. A present file is parsed,
/// checked for unknown keys, and validated.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `imgfit.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgfit configuration
# =====================
#
# Every key is optional. Delete what you do not want to change.

[resize]
# Every output is scaled so its smaller side is exactly this many pixels.
# The aspect ratio is preserved.
min_dimension = 255
# "always": small images are enlarged to min_dimension too.
# "never": images already at or below min_dimension keep their size.
upscale = "always"

[window]
# Accepted output file size in bytes (inclusive).
min_bytes = 51200
max_bytes = 102400

[quality]
# JPEG and WebP outputs are re-encoded at different qualities until the
# file lands in the window. PNG, BMP and TIFF are encoded once.
initial = 85
floor = 60
ceiling = 95
# Encodes the search may spend after the initial one.
max_attempts = 10

[processing]
# Maximum parallel workers. Omit for one per CPU core.
# max_processes = 4
"##
}
