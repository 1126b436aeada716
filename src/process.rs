//! Batch processing of a source tree.
//!
//! Takes every image the scanner finds under the source root, runs it
//! through [`transcode`](crate::imaging::transcode) and writes the result
//! under the output root at the same relative path:
//!
//! ```text
//! assets/app_images/            assets/app_images_compressed/
//! ├── logo.png          →       ├── logo.png        (or logo.webp with --to webp)
//! └── animals/                  └── animals/
//!     └── cat.jpg       →           └── cat.jpg
//! ```
//!
//! ## Outcomes
//!
//! Each image ends up in exactly one of three states, mirrored by
//! [`ImageStatus`]:
//!
//! - **in window**: written, size inside the target window
//! - **near miss**: written, size outside the window after the search ran out
//! - **failed**: nothing written; the reason is recorded and the batch goes on
//!
//! ## Output Paths
//!
//! Every output path has at most one writer. Output paths are planned
//! before any work starts; when an extension override maps several sources
//! onto one path (`a.jpg` and `a.png` both becoming `a.webp`), the first
//! source in discovery order owns it and the others fail without writing.
//!
//! ## Parallel Processing
//!
//! Images are processed in parallel using [rayon](https://docs.rs/rayon).
//! Progress events are sent over an optional channel as each image
//! finishes, so the caller can print status lines while workers run.

use crate::config::Config;
use crate::imaging::{
    Dimensions, Encoded, ImageBackend, Outcome, OutputFormat, Quality, RustBackend,
    TranscodeConfig, transcode,
};
use crate::scan::{self, ScanError, SourceImage};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Configuration for a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessConfig {
    pub transcode: TranscodeConfig,
    /// Replace every output's extension (and therefore its format).
    /// `None` keeps each source's own extension.
    pub output_extension: Option<String>,
}

impl ProcessConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            transcode: config.transcode(),
            output_extension: None,
        }
    }
}

/// Facts about a written output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenImage {
    pub size: u64,
    pub dimensions: Dimensions,
    pub format: OutputFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    /// Encoder invocations spent on this image.
    pub encodes: u32,
}

impl From<&Encoded> for WrittenImage {
    fn from(encoded: &Encoded) -> Self {
        Self {
            size: encoded.size(),
            dimensions: encoded.dimensions,
            format: encoded.format,
            quality: encoded.quality,
            encodes: encoded.encodes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageStatus {
    InWindow(WrittenImage),
    NearMiss(WrittenImage),
    Failed { reason: String },
}

/// Per-image result, in the order the images were discovered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageReport {
    /// Source path relative to the source root, `/`-separated.
    pub source: String,
    /// Output path relative to the output root, `/`-separated.
    pub output: String,
    #[serde(flatten)]
    pub status: ImageStatus,
}

/// Progress events sent while a batch runs.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// Sent once, before any image work starts.
    Started { total: usize },
    /// Sent once per image, as soon as it finishes.
    ImageProcessed(ImageReport),
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub in_window: usize,
    pub near_miss: usize,
    pub failed: usize,
    pub reports: Vec<ImageReport>,
}

impl BatchSummary {
    pub fn from_reports(reports: Vec<ImageReport>) -> Self {
        let mut summary = BatchSummary {
            total: reports.len(),
            ..Default::default()
        };
        for report in &reports {
            match report.status {
                ImageStatus::InWindow(_) => summary.in_window += 1,
                ImageStatus::NearMiss(_) => summary.near_miss += 1,
                ImageStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary.reports = reports;
        summary
    }

    /// Images that produced an output file.
    pub fn succeeded(&self) -> usize {
        self.in_window + self.near_miss
    }
}

pub fn process(
    source_root: &Path,
    output_root: &Path,
    config: &ProcessConfig,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BatchSummary, ProcessError> {
    let backend = RustBackend::new();
    process_with_backend(&backend, source_root, output_root, config, progress)
}

/// Process images using a specific backend (allows testing with mock).
pub fn process_with_backend(
    backend: &impl ImageBackend,
    source_root: &Path,
    output_root: &Path,
    config: &ProcessConfig,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BatchSummary, ProcessError> {
    let images = scan::find_images(source_root)?;
    fs::create_dir_all(output_root)?;

    info!(
        total = images.len(),
        source = %source_root.display(),
        output = %output_root.display(),
        "starting batch"
    );
    if let Some(tx) = &progress {
        tx.send(ProcessEvent::Started {
            total: images.len(),
        })
        .ok();
    }

    let planned = plan_outputs(&images, config.output_extension.as_deref());
    let reports: Vec<ImageReport> = planned
        .par_iter()
        .map_with(progress, |tx, plan| {
            let report = process_image(backend, plan, output_root, config);
            if let Some(tx) = tx {
                tx.send(ProcessEvent::ImageProcessed(report.clone())).ok();
            }
            report
        })
        .collect();

    let summary = BatchSummary::from_reports(reports);
    info!(
        in_window = summary.in_window,
        near_miss = summary.near_miss,
        failed = summary.failed,
        "batch finished"
    );
    Ok(summary)
}

/// One source image and the output path it will write.
struct PlannedImage<'a> {
    image: &'a SourceImage,
    output: PathBuf,
    /// Earlier source that already owns `output`.
    claimed_by: Option<PathBuf>,
}

/// Assign output paths in discovery order; later sources never share a path.
fn plan_outputs<'a>(images: &'a [SourceImage], extension: Option<&str>) -> Vec<PlannedImage<'a>> {
    let mut owners: HashMap<PathBuf, &'a Path> = HashMap::new();
    images
        .iter()
        .map(|image| {
            let output = output_relative_path(&image.relative, extension);
            let claimed_by = match owners.entry(output.clone()) {
                Entry::Occupied(owner) => Some(owner.get().to_path_buf()),
                Entry::Vacant(slot) => {
                    slot.insert(&image.relative);
                    None
                }
            };
            PlannedImage {
                image,
                output,
                claimed_by,
            }
        })
        .collect()
}

/// Run one image end to end. Never fails: problems become `ImageStatus::Failed`.
fn process_image(
    backend: &impl ImageBackend,
    plan: &PlannedImage<'_>,
    output_root: &Path,
    config: &ProcessConfig,
) -> ImageReport {
    let image = plan.image;
    let relative_output = &plan.output;
    let output_extension = relative_output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let status = if let Some(owner) = &plan.claimed_by {
        ImageStatus::Failed {
            reason: format!(
                "output {} is already written from {}",
                slash_path(relative_output),
                slash_path(owner)
            ),
        }
    } else {
        match fs::read(&image.path) {
            Ok(bytes) => {
                let outcome = transcode(
                    backend,
                    &bytes,
                    &image.extension(),
                    &output_extension,
                    &config.transcode,
                );
                write_outcome(outcome, &output_root.join(relative_output))
            }
            Err(err) => ImageStatus::Failed {
                reason: format!("read failed: {err}"),
            },
        }
    };

    let source = slash_path(&image.relative);
    match &status {
        ImageStatus::InWindow(written) => {
            debug!(%source, size = written.size, encodes = written.encodes, "in window")
        }
        ImageStatus::NearMiss(written) => {
            warn!(%source, size = written.size, encodes = written.encodes, "outside target window")
        }
        ImageStatus::Failed { reason } => warn!(%source, %reason, "image failed"),
    }

    ImageReport {
        source,
        output: slash_path(relative_output),
        status,
    }
}

fn output_relative_path(relative: &Path, extension: Option<&str>) -> PathBuf {
    match extension {
        Some(ext) => relative.with_extension(ext.trim_start_matches('.')),
        None => relative.to_path_buf(),
    }
}

fn write_outcome(outcome: Outcome, path: &Path) -> ImageStatus {
    let (encoded, in_window) = match outcome {
        Outcome::InWindow(encoded) => (encoded, true),
        Outcome::NearMiss(encoded) => (encoded, false),
        Outcome::Failed(err) => {
            return ImageStatus::Failed {
                reason: err.to_string(),
            };
        }
    };

    if let Err(err) = write_output(path, &encoded.bytes) {
        return ImageStatus::Failed {
            reason: format!("write failed: {err}"),
        };
    }

    let written = WrittenImage::from(&encoded);
    if in_window {
        ImageStatus::InWindow(written)
    } else {
        ImageStatus::NearMiss(written)
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
