//! Output format capabilities and color-model normalization.
//!
//! Every output format is described by one row of [`FORMAT_TABLE`]: which
//! extensions select it, whether it can carry an alpha channel, and whether
//! its encoder takes a quality parameter. The rest of the pipeline reads
//! those flags; adding a format is a new row, not a new branch.
//!
//! | Format | Extensions | Alpha | Quality |
//! |---|---|---|---|
//! | JPEG | `jpg`, `jpeg`, anything unknown | no | yes |
//! | WebP | `webp` | no | yes |
//! | PNG | `png` | yes | no |
//! | BMP | `bmp` | no | no |
//! | TIFF | `tif`, `tiff` | yes | no |
//!
//! Lossy formats are always flattened: the WebP encoder is fed opaque RGB.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use serde::Serialize;
use std::fmt;

/// Enumerated output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    WebP,
    Png,
    Bmp,
    Tiff,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::WebP => "WebP",
            OutputFormat::Png => "PNG",
            OutputFormat::Bmp => "BMP",
            OutputFormat::Tiff => "TIFF",
        };
        f.write_str(name)
    }
}

/// Capabilities of one output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingTarget {
    pub format: OutputFormat,
    pub supports_alpha: bool,
    pub accepts_quality: bool,
}

/// One row per format, with the extensions that select it.
pub const FORMAT_TABLE: &[(&[&str], EncodingTarget)] = &[
    (
        &["jpg", "jpeg"],
        EncodingTarget {
            format: OutputFormat::Jpeg,
            supports_alpha: false,
            accepts_quality: true,
        },
    ),
    (
        &["webp"],
        EncodingTarget {
            format: OutputFormat::WebP,
            supports_alpha: false,
            accepts_quality: true,
        },
    ),
    (
        &["png"],
        EncodingTarget {
            format: OutputFormat::Png,
            supports_alpha: true,
            accepts_quality: false,
        },
    ),
    (
        &["bmp"],
        EncodingTarget {
            format: OutputFormat::Bmp,
            supports_alpha: false,
            accepts_quality: false,
        },
    ),
    (
        &["tif", "tiff"],
        EncodingTarget {
            format: OutputFormat::Tiff,
            supports_alpha: true,
            accepts_quality: false,
        },
    ),
];

impl EncodingTarget {
    /// Look up the target for an output extension.
    ///
    /// Matching is case-insensitive and ignores a leading dot. Unknown
    /// extensions fall back to JPEG.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.');
        FORMAT_TABLE
            .iter()
            .find(|(exts, _)| exts.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .map(|(_, target)| *target)
            .unwrap_or_else(|| Self::of(OutputFormat::Jpeg))
    }

    /// The table row for a format tag.
    pub fn of(format: OutputFormat) -> Self {
        let row = match format {
            OutputFormat::Jpeg => 0,
            OutputFormat::WebP => 1,
            OutputFormat::Png => 2,
            OutputFormat::Bmp => 3,
            OutputFormat::Tiff => 4,
        };
        FORMAT_TABLE[row].1
    }
}

/// Pixel representation of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    TrueColor,
    TrueColorAlpha,
    Luminance,
    LuminanceAlpha,
    /// Palette-based pixels. The `image` decoders expand palettes (and any
    /// `tRNS` transparency) on decode, so a [`DynamicImage`] never reports
    /// this; it exists for backends that hand over indexed buffers.
    Indexed,
}

impl ColorModel {
    pub fn of(img: &DynamicImage) -> Self {
        let color = img.color();
        match (color.has_color(), color.has_alpha()) {
            (true, true) => ColorModel::TrueColorAlpha,
            (true, false) => ColorModel::TrueColor,
            (false, true) => ColorModel::LuminanceAlpha,
            (false, false) => ColorModel::Luminance,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            ColorModel::TrueColorAlpha | ColorModel::LuminanceAlpha
        )
    }
}

/// Color-model change applied once per image, before resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPolicy {
    /// Composite over opaque white; result is opaque RGB.
    Flatten,
    /// Convert to RGB without touching transparency (there is none).
    Widen,
    /// Expand to RGBA, keeping transparency.
    ExpandAlpha,
    Keep,
}

impl ColorPolicy {
    pub fn for_target(target: &EncodingTarget, model: ColorModel) -> Self {
        let indexed = model == ColorModel::Indexed;
        if !target.supports_alpha {
            if model.has_alpha() || indexed {
                ColorPolicy::Flatten
            } else if model != ColorModel::TrueColor {
                ColorPolicy::Widen
            } else {
                ColorPolicy::Keep
            }
        } else if indexed {
            ColorPolicy::ExpandAlpha
        } else {
            ColorPolicy::Keep
        }
    }

    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            ColorPolicy::Flatten => DynamicImage::ImageRgb8(flatten_on_white(&img)),
            ColorPolicy::Widen => DynamicImage::ImageRgb8(img.to_rgb8()),
            ColorPolicy::ExpandAlpha => DynamicImage::ImageRgba8(img.to_rgba8()),
            ColorPolicy::Keep => img,
        }
    }
}

/// Normalize an image's color model for the given target.
pub fn prepare_color(img: DynamicImage, target: &EncodingTarget) -> DynamicImage {
    ColorPolicy::for_target(target, ColorModel::of(&img)).apply(img)
}

/// Alpha-composite over an opaque white background.
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let (width, height) = img.dimensions();
    let rgba = img.to_rgba8();
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
