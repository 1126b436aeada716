//! Shared test utilities for the imgfit test suite.
//!
//! Provides synthetic source images and helpers that lay them out on disk
//! the way a real asset tree would look.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_fixture(&tmp.path().join("icons/logo.png"), &quadrant_rgba(64, 64), ImageFormat::Png);
//!
//! let images = find_images(tmp.path()).unwrap();
//! assert_eq!(relative_paths(&images), vec!["icons/logo.png"]);
//! ```

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

use crate::scan::SourceImage;

// =========================================================================
// Synthetic images
// =========================================================================

/// RGB image with a smooth gradient plus some texture, so lossy encoders
/// produce sizes that respond to quality.
pub fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let noise = ((x * 7919 + y * 104_729) % 64) as u8;
        Rgb([
            (x % 256) as u8,
            (y % 256) as u8,
            128u8.wrapping_add(noise),
        ])
    }))
}

/// RGBA image whose top-left quadrant is fully transparent; the rest is
/// opaque red.
pub fn quadrant_rgba(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        if x < width / 2 && y < height / 2 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([200, 30, 30, 255])
        }
    }))
}

// =========================================================================
// Encoding and disk layout
// =========================================================================

/// Encode an image with the `image` crate's default settings for `format`.
pub fn encode_fixture(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, format).unwrap();
    cursor.into_inner()
}

/// Encode and write an image, creating parent directories.
pub fn write_fixture(path: &Path, img: &DynamicImage, format: ImageFormat) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, encode_fixture(img, format)).unwrap();
}

/// Relative paths of scanned images, `/`-separated.
pub fn relative_paths(images: &[SourceImage]) -> Vec<String> {
    images
        .iter()
        .map(|img| {
            img.relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect()
}
