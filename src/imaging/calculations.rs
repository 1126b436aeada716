//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::UpscalePolicy;

/// Calculate output dimensions so the smaller side equals `min_dimension`.
///
/// The aspect ratio is preserved as closely as integer rounding allows.
/// Square sources take the landscape branch and come out square. Both
/// outputs are at least 1.
///
/// With [`UpscalePolicy::Never`], a source whose smaller side is already at or
/// below `min_dimension` is returned unchanged.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `min_dimension` - Target size of the smaller side
/// * `upscale` - Whether small sources are enlarged
///
/// # Examples
/// ```
/// # use imgfit::imaging::{UpscalePolicy, normalize_dimensions};
/// // Portrait: width is the short side
/// assert_eq!(normalize_dimensions((600, 800), 300, UpscalePolicy::Always), (300, 400));
///
/// // Landscape: height is the short side
/// assert_eq!(normalize_dimensions((1920, 1080), 255, UpscalePolicy::Always), (453, 255));
/// ```
pub fn normalize_dimensions(
    source: (u32, u32),
    min_dimension: u32,
    upscale: UpscalePolicy,
) -> (u32, u32) {
    let (src_w, src_h) = (source.0.max(1), source.1.max(1));
    let target = min_dimension.max(1);

    if upscale == UpscalePolicy::Never && src_w.min(src_h) <= target {
        return (src_w, src_h);
    }

    if src_w < src_h {
        let h = scale_edge(src_h, src_w, target);
        (target, h)
    } else {
        let w = scale_edge(src_w, src_h, target);
        (w, target)
    }
}

/// `round(long / short * target)`, never below 1.
fn scale_edge(long: u32, short: u32, target: u32) -> u32 {
    let scaled = (long as f64 * target as f64 / short as f64).round();
    (scaled as u32).max(1)
}
