//! Edge extraction: grayscale, optional bilateral smoothing, Canny.
//!
//! Produces the binary [`EdgeMask`] the tracer consumes and the
//! [`ColorMask`] the sampler reads, both flipped vertically so row 0 is
//! the bottom row of the source frame.

use image::GrayImage;

use crate::bilateral::bilateral_filter;
use crate::canny::canny;
use crate::color_mask::ColorMask;
use crate::grayscale::{median_intensity, to_grayscale};
use crate::types::{Dimensions, Frame, GradientNorm, PipelineConfig, SmoothingMode};

/// Lowest median used to derive smoothed-mode thresholds.
pub const MEDIAN_FLOOR: f64 = 10.0;
/// Highest median used to derive smoothed-mode thresholds.
pub const MEDIAN_CEILING: f64 = 245.0;

/// Binary edge map in tracer orientation (vertically flipped).
///
/// Pixels are 255 for edges and 0 for background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMask(GrayImage);

impl EdgeMask {
    /// Wrap a detector output given in source orientation, flipping it
    /// and normalizing every nonzero value to 255.
    #[must_use]
    pub fn from_detector(edges: &GrayImage) -> Self {
        let flipped = image::imageops::flip_vertical(edges);
        Self::from_flipped(flipped)
    }

    /// Wrap a mask that is already in tracer orientation.
    ///
    /// Any nonzero value counts as an edge.
    #[must_use]
    pub fn from_flipped(mut mask: GrayImage) -> Self {
        for pixel in mask.pixels_mut() {
            if pixel.0[0] != 0 {
                pixel.0[0] = 255;
            }
        }
        Self(mask)
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Mask dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Whether the pixel at `(x, y)` in tracer orientation is an edge.
    /// Out-of-range coordinates are background.
    #[must_use]
    pub fn is_edge(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.width()) || y >= i64::from(self.height()) {
            return false;
        }
        // In range per the check above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x, y) = (x as u32, y as u32);
        self.0.get_pixel(x, y).0[0] != 0
    }

    /// Number of edge pixels.
    #[cfg(test)]
    #[must_use]
    pub fn edge_pixel_count(&self) -> usize {
        self.0.pixels().filter(|p| p.0[0] != 0).count()
    }

    /// The underlying raster (tracer orientation).
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.0
    }
}

/// Canny thresholds for one extraction pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Hysteresis low threshold.
    pub low: f32,
    /// Hysteresis high threshold.
    pub high: f32,
}

/// Derive smoothed-mode thresholds from the frame's median intensity.
///
/// The median is clamped to [`MEDIAN_FLOOR`]..=[`MEDIAN_CEILING`], then
/// `low = max(0, (1 - nudge) * median)` and
/// `high = min(255, (1 + nudge) * median)`, both truncated to integers.
#[must_use]
pub fn smoothed_thresholds(median: f64, nudge: f64) -> Thresholds {
    let median = median.clamp(MEDIAN_FLOOR, MEDIAN_CEILING);
    let low = ((1.0 - nudge) * median).max(0.0).trunc();
    let high = ((1.0 + nudge) * median).min(255.0).trunc();
    // Both are within 0..=255.
    #[allow(clippy::cast_possible_truncation)]
    let (low, high) = (low as f32, high as f32);
    Thresholds { low, high }
}

/// Output of one extraction pass.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Binary edges, flipped.
    pub edges: EdgeMask,
    /// Source colours at edge pixels, flipped.
    pub colors: ColorMask,
}

/// Run edge detection on `frame` in the given mode.
///
/// The returned masks always have the frame's dimensions.
#[must_use]
#[tracing::instrument(skip(frame, config), fields(frame = frame.index()))]
pub fn extract(frame: &Frame, mode: SmoothingMode, config: &PipelineConfig) -> Extraction {
    let gray = to_grayscale(frame.pixels());
    let raw = detect_edges(&gray, mode, config);
    let edges = EdgeMask::from_detector(&raw);
    let colors = ColorMask::build(frame.pixels(), &edges);
    Extraction { edges, colors }
}

/// Canny output in source orientation for the given mode.
fn detect_edges(gray: &GrayImage, mode: SmoothingMode, config: &PipelineConfig) -> GrayImage {
    match mode {
        SmoothingMode::Plain => canny(
            gray,
            config.plain_low_threshold,
            config.plain_high_threshold,
            GradientNorm::L1,
        ),
        SmoothingMode::Smoothed => {
            let thresholds = smoothed_thresholds(median_intensity(gray), config.nudge);
            tracing::debug!(
                low = thresholds.low,
                high = thresholds.high,
                "smoothed-mode thresholds"
            );
            let filtered = bilateral_filter(gray, &config.bilateral);
            canny(&filtered, thresholds.low, thresholds.high, config.gradient)
        }
    }
}
