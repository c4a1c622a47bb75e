//! Image decoding, grayscale conversion, and intensity statistics.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the RGB
//! frame plus the single-channel grayscale image that edge detection
//! consumes.

use image::{GrayImage, Luma, RgbImage};

use crate::types::PipelineError;

/// Decode raw image bytes into 8-bit RGB.
///
/// Alpha is discarded; frames are treated as opaque.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Fixed-point precision of the luma weights.
const LUMA_SHIFT: u32 = 14;

/// BT.601 luma weights for R, G, B in Q14. They sum to `1 << 14`.
const LUMA_WEIGHTS: [u32; 3] = [4899, 9617, 1868];

/// Convert RGB to grayscale with the BT.601 luma weights
/// `0.299*R + 0.587*G + 0.114*B`.
///
/// Q14 integer form with round-half-up, matching OpenCV's 8-bit
/// `RGB2GRAY`.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(rgb: &RgbImage) -> GrayImage {
    let [wr, wg, wb] = LUMA_WEIGHTS;
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let weighted = u32::from(r) * wr + u32::from(g) * wg + u32::from(b) * wb;
        // Weights sum to 1 << 14, so the shifted value is at most 255.
        #[allow(clippy::cast_possible_truncation)]
        let luma = ((weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8;
        Luma([luma])
    })
}

/// Statistical median of all pixel intensities.
///
/// For an even pixel count this is the mean of the two middle values,
/// so the result can end in `.5`. Returns `0.0` for an empty image.
#[must_use]
pub fn median_intensity(gray: &GrayImage) -> f64 {
    let mut histogram = [0usize; 256];
    for pixel in gray.pixels() {
        histogram[usize::from(pixel.0[0])] += 1;
    }

    let total = gray.pixels().len();
    if total == 0 {
        return 0.0;
    }

    // Zero-based ranks of the middle element(s).
    let upper_rank = total / 2;
    let lower_rank = if total % 2 == 0 {
        upper_rank - 1
    } else {
        upper_rank
    };

    let lower = value_at_rank(&histogram, lower_rank);
    let upper = value_at_rank(&histogram, upper_rank);
    (f64::from(lower) + f64::from(upper)) / 2.0
}

/// Intensity of the `rank`-th smallest pixel according to `histogram`.
fn value_at_rank(histogram: &[usize; 256], rank: usize) -> u8 {
    let mut seen = 0usize;
    for (value, &count) in (0u8..=255).zip(histogram.iter()) {
        seen += count;
        if seen > rank {
            return value;
        }
    }
    u8::MAX
}
