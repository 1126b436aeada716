//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Compress
//!
//! ```text
//! imgfit
//! Source: assets/app_images
//! Output: assets/app_images_compressed
//! Min dimension: 255px (aspect ratio preserved)
//! Target file size: 50-100KB
//! ------------------------------------------------------------
//! Found 3 images to process
//!
//! ✓ animals/cat.jpg: 73.2KB (340x255, quality: 85)
//! ⚠ icons/logo.png: 12.4KB (255x255)
//! ✗ Error processing broken.jpg: decode failed: unexpected EOF
//! ------------------------------------------------------------
//! Completed: 2/3 images processed
//! Output directory: assets/app_images_compressed
//! ```
//!
//! Status lines arrive in completion order, which varies between runs
//! because images are processed in parallel.
//!
//! ## Check
//!
//! ```text
//! Config OK: min dimension 255px, window 50-100KB, quality 60-95 (start 85)
//! 2 images in assets/app_images
//!     animals/cat.jpg
//!     icons/logo.png
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::imaging::TranscodeConfig;
use crate::process::{BatchSummary, ImageReport, ImageStatus, ProcessEvent, WrittenImage};
use crate::scan::SourceImage;
use std::path::Path;

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

fn kb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0
}

// ============================================================================
// Compress output
// ============================================================================

/// Run header: directories and the effective targets.
pub fn format_header(source: &Path, output: &Path, config: &TranscodeConfig) -> Vec<String> {
    vec![
        "imgfit".to_string(),
        format!("Source: {}", source.display()),
        format!("Output: {}", output.display()),
        format!(
            "Min dimension: {}px (aspect ratio preserved)",
            config.min_dimension
        ),
        format!(
            "Target file size: {:.0}-{:.0}KB",
            kb(config.window.min_bytes),
            kb(config.window.max_bytes)
        ),
        rule(),
    ]
}

pub fn print_header(source: &Path, output: &Path, config: &TranscodeConfig) {
    for line in format_header(source, output, config) {
        println!("{}", line);
    }
}

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { total: 0 } => vec!["No image files found".to_string()],
        ProcessEvent::Started { total } => {
            vec![format!("Found {} images to process", total), String::new()]
        }
        ProcessEvent::ImageProcessed(report) => vec![format_image_line(report)],
    }
}

/// One status line per image.
///
/// `✓` in window, `⚠` written but outside the window, `✗` failed.
pub fn format_image_line(report: &ImageReport) -> String {
    match &report.status {
        ImageStatus::InWindow(written) => written_line("✓", &report.source, written),
        ImageStatus::NearMiss(written) => written_line("⚠", &report.source, written),
        ImageStatus::Failed { reason } => {
            format!("✗ Error processing {}: {}", report.source, reason)
        }
    }
}

fn written_line(marker: &str, source: &str, written: &WrittenImage) -> String {
    let quality = written
        .quality
        .map(|q| format!(", quality: {}", q))
        .unwrap_or_default();
    format!(
        "{} {}: {:.1}KB ({}{})",
        marker,
        source,
        kb(written.size),
        written.dimensions,
        quality
    )
}

/// Closing lines after every image has reported.
pub fn format_summary(summary: &BatchSummary, output: &Path) -> Vec<String> {
    vec![
        rule(),
        format!(
            "Completed: {}/{} images processed",
            summary.succeeded(),
            summary.total
        ),
        format!("Output directory: {}", output.display()),
    ]
}

pub fn print_summary(summary: &BatchSummary, output: &Path) {
    for line in format_summary(summary, output) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Validated configuration plus the images a compress run would pick up.
pub fn format_check_output(
    config: &TranscodeConfig,
    source: &Path,
    images: &[SourceImage],
) -> Vec<String> {
    let mut lines = vec![format!(
        "Config OK: min dimension {}px, window {:.0}-{:.0}KB, quality {}-{} (start {})",
        config.min_dimension,
        kb(config.window.min_bytes),
        kb(config.window.max_bytes),
        config.quality.floor,
        config.quality.ceiling,
        config.quality.initial,
    )];
    lines.push(format!("{} images in {}", images.len(), source.display()));
    for image in images {
        lines.push(format!("    {}", image.relative.display()));
    }
    lines
}

pub fn print_check_output(config: &TranscodeConfig, source: &Path, images: &[SourceImage]) {
    for line in format_check_output(config, source, images) {
        println!("{}", line);
    }
}
