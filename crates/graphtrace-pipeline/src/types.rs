//! Shared types for the graphtrace frame pipeline.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::bilateral::BilateralParams;
use crate::control::ComplexityBand;
use crate::trace::TraceParams;

/// A 2D point in tracer coordinates.
///
/// The tracer works on the vertically flipped edge mask, so `y` grows
/// upward from the bottom row of the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from bottom edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Linear interpolation: `self + t * (other - self)`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            t.mul_add(other.x - self.x, self.x),
            t.mul_add(other.y - self.y, self.y),
        )
    }

    /// Multiply both coordinates by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// One decoded video frame.
///
/// Frames are identified by their 1-based index in the render and are
/// immutable once loaded.
#[derive(Debug, Clone)]
pub struct Frame {
    index: usize,
    pixels: RgbImage,
}

impl Frame {
    /// Wrap already-decoded pixel data.
    #[must_use]
    pub const fn new(index: usize, pixels: RgbImage) -> Self {
        Self { index, pixels }
    }

    /// Decode raw image bytes (PNG, JPEG, BMP, WebP) into a frame.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
    /// Returns [`PipelineError::ImageDecode`] if the image format is
    /// unrecognized or the data is corrupt.
    pub fn decode(index: usize, bytes: &[u8]) -> Result<Self, PipelineError> {
        let pixels = crate::grayscale::decode_rgb(bytes)?;
        Ok(Self::new(index, pixels))
    }

    /// 1-based frame index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The frame's RGB pixels, top row first.
    #[must_use]
    pub const fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Frame dimensions in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }
}

/// Whether edge detection is preceded by edge-preserving smoothing.
///
/// The adaptive complexity controller flips between the two modes to
/// keep a frame's expression count inside its acceptable band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMode {
    /// Grayscale straight into Canny with fixed thresholds.
    #[default]
    Plain,
    /// Bilateral filter, then Canny with median-derived thresholds.
    Smoothed,
}

/// Gradient magnitude formula used by the Canny detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientNorm {
    /// `|gx| + |gy|`. Cheaper, produces more edge pixels.
    L1,
    /// `sqrt(gx² + gy²)`. Thinner, fewer edges.
    #[default]
    L2,
}

/// Configuration for the per-frame pipeline.
///
/// Consumed once at render start; nothing re-reads it mid-render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Mode each frame's controller starts in.
    pub initial_mode: SmoothingMode,

    /// Gradient formula for smoothed mode. Plain mode always uses
    /// [`GradientNorm::L1`].
    pub gradient: GradientNorm,

    /// Spread of the median-derived Canny thresholds in smoothed mode:
    /// `low = (1 - nudge) * median`, `high = (1 + nudge) * median`.
    pub nudge: f64,

    /// Canny low threshold in plain mode.
    pub plain_low_threshold: f32,

    /// Canny high threshold in plain mode.
    pub plain_high_threshold: f32,

    /// Edge-preserving filter applied in smoothed mode.
    pub bilateral: BilateralParams,

    /// Bitmap vectorizer parameters.
    pub tracer: TraceParams,

    /// Multiplier applied to every emitted coordinate.
    pub scale_factor: f64,

    /// Acceptable expression-count band for the complexity controller.
    pub band: ComplexityBand,
}

impl PipelineConfig {
    /// Default threshold spread for smoothed mode.
    pub const DEFAULT_NUDGE: f64 = 0.33;
    /// Default plain-mode Canny low threshold.
    pub const DEFAULT_PLAIN_LOW_THRESHOLD: f32 = 30.0;
    /// Default plain-mode Canny high threshold.
    pub const DEFAULT_PLAIN_HIGH_THRESHOLD: f32 = 200.0;
    /// Default render scale factor.
    pub const DEFAULT_SCALE_FACTOR: f64 = 4.0;

    /// Check every field for values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "scale_factor must be a positive finite number, got {}",
                self.scale_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.nudge) {
            return Err(PipelineError::InvalidConfig(format!(
                "nudge must be within [0, 1], got {}",
                self.nudge
            )));
        }
        if !(self.plain_low_threshold >= 0.0
            && self.plain_low_threshold <= self.plain_high_threshold)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "plain thresholds must satisfy 0 <= low <= high, got low={} high={}",
                self.plain_low_threshold, self.plain_high_threshold
            )));
        }
        self.bilateral.validate()?;
        self.tracer.validate()?;
        self.band.validate()?;
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            initial_mode: SmoothingMode::default(),
            gradient: GradientNorm::default(),
            nudge: Self::DEFAULT_NUDGE,
            plain_low_threshold: Self::DEFAULT_PLAIN_LOW_THRESHOLD,
            plain_high_threshold: Self::DEFAULT_PLAIN_HIGH_THRESHOLD,
            bilateral: BilateralParams::default(),
            tracer: TraceParams::default(),
            scale_factor: Self::DEFAULT_SCALE_FACTOR,
            band: ComplexityBand::default(),
        }
    }
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}
