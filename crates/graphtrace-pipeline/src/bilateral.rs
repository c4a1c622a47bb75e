//! Edge-preserving bilateral smoothing before edge detection.
//!
//! Each output pixel is a weighted mean of its circular neighbourhood,
//! where the weight falls off with both spatial distance and intensity
//! difference. Flat regions get smoothed (fewer spurious Canny edges)
//! while strong boundaries survive.
//!
//! Borders are handled by reflecting about the edge pixel without
//! repeating it (`gfedcb|abcdefgh|gfedcba`).

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Bilateral filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilateralParams {
    /// Neighbourhood diameter in pixels. Must be odd.
    pub diameter: u32,
    /// Intensity sigma. Larger values mix more dissimilar intensities.
    pub sigma_color: f32,
    /// Spatial sigma in pixels.
    pub sigma_space: f32,
}

impl BilateralParams {
    /// Default neighbourhood diameter.
    pub const DEFAULT_DIAMETER: u32 = 5;
    /// Default intensity sigma.
    pub const DEFAULT_SIGMA_COLOR: f32 = 50.0;
    /// Default spatial sigma.
    pub const DEFAULT_SIGMA_SPACE: f32 = 50.0;

    pub(crate) fn validate(&self) -> Result<(), PipelineError> {
        if self.diameter == 0 || self.diameter % 2 == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "bilateral diameter must be odd and positive, got {}",
                self.diameter
            )));
        }
        if !(self.sigma_color > 0.0 && self.sigma_space > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "bilateral sigmas must be positive, got color={} space={}",
                self.sigma_color, self.sigma_space
            )));
        }
        Ok(())
    }
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self {
            diameter: Self::DEFAULT_DIAMETER,
            sigma_color: Self::DEFAULT_SIGMA_COLOR,
            sigma_space: Self::DEFAULT_SIGMA_SPACE,
        }
    }
}

/// One entry of the precomputed circular window.
struct Tap {
    dx: i64,
    dy: i64,
    weight: f32,
}

/// Apply a bilateral filter to a grayscale image.
///
/// A diameter of 1 returns the image unchanged.
#[must_use = "returns the filtered image"]
pub fn bilateral_filter(image: &GrayImage, params: &BilateralParams) -> GrayImage {
    let (w, h) = image.dimensions();
    if params.diameter <= 1 || w == 0 || h == 0 {
        return image.clone();
    }

    let radius = i64::from(params.diameter / 2);
    let space_coeff = -0.5 / (params.sigma_space * params.sigma_space);
    let color_coeff = -0.5 / (params.sigma_color * params.sigma_color);

    // Circular window: corners beyond `radius` do not contribute.
    let mut taps = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = dx * dx + dy * dy;
            if r2 > radius * radius {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let weight = (r2 as f32 * space_coeff).exp();
            taps.push(Tap { dx, dy, weight });
        }
    }

    let color_weights: [f32; 256] = std::array::from_fn(|delta| {
        #[allow(clippy::cast_precision_loss)]
        let d = delta as f32;
        (d * d * color_coeff).exp()
    });

    GrayImage::from_fn(w, h, |x, y| {
        let center = image.get_pixel(x, y).0[0];
        let mut sum = 0.0f32;
        let mut weight_sum = 0.0f32;
        for tap in &taps {
            let sx = reflect_101(i64::from(x) + tap.dx, w);
            let sy = reflect_101(i64::from(y) + tap.dy, h);
            let value = image.get_pixel(sx, sy).0[0];
            let weight = tap.weight * color_weights[usize::from(center.abs_diff(value))];
            sum += weight * f32::from(value);
            weight_sum += weight;
        }
        // The centre tap always has weight 1, so `weight_sum >= 1`.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let out = (sum / weight_sum).round().clamp(0.0, 255.0) as u8;
        Luma([out])
    })
}

/// Map a possibly out-of-range coordinate back into `0..len` by
/// reflecting about the border pixel.
fn reflect_101(coord: i64, len: u32) -> u32 {
    let len = i64::from(len);
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut c = coord.rem_euclid(period);
    if c >= len {
        c = period - c;
    }
    // `c` is in 0..len, and len came from a u32.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = c as u32;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a test image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn default_params_are_valid() {
        assert!(BilateralParams::default().validate().is_ok());
    }

    #[test]
    fn even_diameter_is_rejected() {
        let params = BilateralParams {
            diameter: 4,
            ..BilateralParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = GrayImage::new(17, 31);
        let filtered = bilateral_filter(&img, &BilateralParams::default());
        assert_eq!(filtered.dimensions(), (17, 31));
    }

    #[test]
    fn uniform_image_unchanged() {
        let img = GrayImage::from_pixel(10, 10, Luma([128]));
        let filtered = bilateral_filter(&img, &BilateralParams::default());
        assert_eq!(img, filtered);
    }

    #[test]
    fn strong_edge_is_preserved() {
        // A 255-step is ~5 color sigmas, so cross-edge weights are
        // negligible and the step survives intact.
        let img = sharp_edge_image();
        let filtered = bilateral_filter(&img, &BilateralParams::default());
        assert_eq!(filtered.get_pixel(4, 5).0[0], 0);
        assert_eq!(filtered.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn weak_noise_is_smoothed() {
        // Single bright speck of +20 on a flat field.
        let mut img = GrayImage::from_pixel(9, 9, Luma([100]));
        img.put_pixel(4, 4, Luma([120]));
        let filtered = bilateral_filter(&img, &BilateralParams::default());
        let center = filtered.get_pixel(4, 4).0[0];
        assert!(
            center < 120 && center > 100,
            "expected speck to be pulled toward the background, got {center}",
        );
    }

    #[test]
    fn diameter_one_is_identity() {
        let img = sharp_edge_image();
        let params = BilateralParams {
            diameter: 1,
            ..BilateralParams::default()
        };
        assert_eq!(bilateral_filter(&img, &params), img);
    }

    #[test]
    fn reflect_101_mirrors_without_repeating_border() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(-3, 1), 0);
    }
}
