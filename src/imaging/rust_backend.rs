//! Production codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, BMP, TIFF) | `image` crate (pure Rust decoders) |
//! | Decode (HEIC, HEIF) | `libheif-rs`, only with the `heic` feature |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → WebP (lossy) | `webp` crate (libwebp) with quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder`, best compression |
//! | Encode → BMP, TIFF | `image` crate encoders |

use super::backend::{BackendError, ImageBackend};
use super::format::OutputFormat;
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageFormat, ImageReader, RgbImage};
use std::borrow::Cow;
use std::io::Cursor;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
    ("bmp", ImageFormat::Bmp),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
];

/// Extensions decoded through libheif instead of the `image` crate.
#[cfg(feature = "heic")]
const HEIF_EXTENSIONS: &[&str] = &["heic", "heif"];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let exts = INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext);
    #[cfg(feature = "heic")]
    let exts = exts.chain(HEIF_EXTENSIONS.iter().copied());
    exts.collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Backend built on the `image` crate, plus libwebp for lossy WebP.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrow as RGB8 when already in that layout, convert otherwise.
fn as_rgb8(img: &DynamicImage) -> Cow<'_, RgbImage> {
    match img {
        DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
        _ => Cow::Owned(img.to_rgb8()),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = as_rgb8(img);
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {}", e)))?;
    Ok(buf)
}

fn encode_webp(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = as_rgb8(img);
    let (w, h) = rgb.dimensions();
    let encoder = webp::Encoder::from_rgb(rgb.as_raw(), w, h);

    let mut config = webp::WebPConfig::new()
        .map_err(|_| BackendError::Encode("failed to create WebPConfig".into()))?;
    config.lossless = 0;
    config.quality = quality.value() as f32;
    config.method = 4;

    let mem = encoder
        .encode_advanced(&config)
        .map_err(|e| BackendError::Encode(format!("WebP encode failed: {e:?}")))?;
    Ok(mem.to_vec())
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        &mut buf,
        CompressionType::Best,
        image::codecs::png::FilterType::Adaptive,
    );
    img.write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("PNG encode failed: {}", e)))?;
    Ok(buf)
}

fn encode_with_format(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, BackendError> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, format)
        .map_err(|e| BackendError::Encode(format!("{format:?} encode failed: {e}")))?;
    Ok(cursor.into_inner())
}

/// Decode the primary image of a HEIF container to RGBA8.
#[cfg(feature = "heic")]
fn decode_heif(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let heif_err =
        |e: libheif_rs::HeifError| BackendError::Decode(format!("HEIF decode failed: {e}"));
    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes).map_err(heif_err)?;
    let handle = ctx.primary_image_handle().map_err(heif_err)?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(heif_err)?;
    let plane = decoded
        .planes()
        .interleaved
        .ok_or_else(|| BackendError::Decode("HEIF image has no interleaved plane".into()))?;

    // Rows are padded to `stride`; copy only the pixel bytes.
    let row_len = plane.width as usize * 4;
    if plane.stride < row_len {
        return Err(BackendError::Decode("HEIF plane stride shorter than a row".into()));
    }
    let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
    for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
        let row = row
            .get(..row_len)
            .ok_or_else(|| BackendError::Decode("HEIF plane row shorter than width".into()))?;
        pixels.extend_from_slice(row);
    }
    image::RgbaImage::from_raw(plane.width, plane.height, pixels)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| BackendError::Decode("HEIF plane size does not match its dimensions".into()))
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], extension: &str) -> Result<DynamicImage, BackendError> {
        #[cfg(feature = "heic")]
        if HEIF_EXTENSIONS
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
        {
            return decode_heif(bytes);
        }

        let mut reader = ImageReader::new(Cursor::new(bytes));
        match ImageFormat::from_extension(extension) {
            Some(format) => reader.set_format(format),
            None => reader = reader.with_guessed_format()?,
        }
        reader
            .decode()
            .map_err(|e| BackendError::Decode(format!("Failed to decode .{extension}: {e}")))
    }

    fn resize(&self, img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        img.resize_exact(width, height, FilterType::Lanczos3)
    }

    fn encode(
        &self,
        img: &DynamicImage,
        format: OutputFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, BackendError> {
        let quality = quality.unwrap_or_default();
        match format {
            OutputFormat::Jpeg => encode_jpeg(img, quality),
            OutputFormat::WebP => encode_webp(img, quality),
            OutputFormat::Png => encode_png(img),
            OutputFormat::Bmp => match img {
                DynamicImage::ImageRgb8(_) => encode_with_format(img, ImageFormat::Bmp),
                _ => encode_with_format(&DynamicImage::ImageRgb8(img.to_rgb8()), ImageFormat::Bmp),
            },
            OutputFormat::Tiff => encode_with_format(img, ImageFormat::Tiff),
        }
    }
}
