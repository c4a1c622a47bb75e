//! Canny edge detection.
//!
//! Derived from `imageproc::edges::canny` (0.26) with these changes:
//!
//! - **No internal blur.** Callers decide whether to smooth first
//!   (plain mode feeds raw grayscale, smoothed mode feeds the bilateral
//!   output).
//! - **Selectable gradient norm.** [`GradientNorm::L1`] uses
//!   `|gx| + |gy|`; [`GradientNorm::L2`] compares squared magnitudes
//!   against squared thresholds, which avoids the square root.
//! - **Integer direction binning.** The gradient angle is quantized
//!   with fixed-point `tan(22.5°)` / `tan(67.5°)` comparisons rather
//!   than `atan2`.
//! - **Asymmetric suppression.** Along horizontal and vertical
//!   directions a pixel survives if it is strictly greater than the
//!   previous neighbour and at least equal to the next one, so a
//!   plateau two pixels wide yields a single-pixel line. Diagonal
//!   neighbours are compared strictly on both sides.
//! - **Strict thresholds.** A pixel is a candidate only if its
//!   magnitude is strictly above the low threshold, and seeds
//!   hysteresis only if strictly above the high one.
//! - **Bounds-checked 8-neighbour hysteresis.** Border pixels are
//!   eligible; magnitude outside the image reads as zero.

use image::{GrayImage, Luma};
use imageproc::definitions::{HasBlack, HasWhite, Image};
use imageproc::filter::filter_clamped;
use imageproc::kernel;

use crate::types::GradientNorm;

/// `tan(22.5°)` in Q15 fixed point.
const TG22: i32 = 13_573;

/// Classification of a pixel after non-maximum suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeClass {
    Suppressed,
    Weak,
    Strong,
}

/// Run Canny edge detection on an already-prepared grayscale image.
///
/// Returns a binary image: 255 for edge pixels, 0 for background.
/// If `low_threshold > high_threshold` the two are swapped.
#[must_use = "returns the binary edge map"]
pub fn canny(
    image: &GrayImage,
    low_threshold: f32,
    high_threshold: f32,
    norm: GradientNorm,
) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }

    let (low, high) = if low_threshold > high_threshold {
        (high_threshold, low_threshold)
    } else {
        (low_threshold, high_threshold)
    };

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);

    let magnitude = Magnitude {
        width,
        height,
        values: gx
            .pixels()
            .zip(gy.pixels())
            .map(|(h, v)| norm_magnitude(norm, h.0[0], v.0[0]))
            .collect(),
    };

    let classes = non_maximum_suppression(
        &magnitude,
        &gx,
        &gy,
        threshold_for(norm, low),
        threshold_for(norm, high),
    );
    hysteresis(&classes, width, height)
}

/// Gradient magnitude in the units the thresholds are compared in.
fn norm_magnitude(norm: GradientNorm, gx: i16, gy: i16) -> i32 {
    let (gx, gy) = (i32::from(gx), i32::from(gy));
    match norm {
        GradientNorm::L1 => gx.abs() + gy.abs(),
        GradientNorm::L2 => gx * gx + gy * gy,
    }
}

/// Convert a user threshold into magnitude units.
///
/// For integer magnitudes, `m > floor(t)` is equivalent to `m > t`.
fn threshold_for(norm: GradientNorm, threshold: f32) -> i32 {
    let t = f64::from(threshold.max(0.0));
    let t = match norm {
        GradientNorm::L1 => t,
        GradientNorm::L2 => t * t,
    };
    // Sobel magnitudes are far below i32::MAX; saturate anything larger.
    #[allow(clippy::cast_possible_truncation)]
    let floored = t.floor().min(f64::from(i32::MAX)) as i32;
    floored
}

/// Gradient magnitudes with zero padding outside the image.
struct Magnitude {
    width: u32,
    height: u32,
    values: Vec<i32>,
}

impl Magnitude {
    fn at(&self, x: i64, y: i64) -> i32 {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return 0;
        }
        // Both coordinates are non-negative and in range.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        self.values[idx]
    }
}

/// Thin gradient ridges to single-pixel lines and classify survivors
/// against the thresholds.
fn non_maximum_suppression(
    magnitude: &Magnitude,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
    low: i32,
    high: i32,
) -> Vec<EdgeClass> {
    let mut classes = Vec::with_capacity(magnitude.values.len());
    for y in 0..magnitude.height {
        for x in 0..magnitude.width {
            let (xi, yi) = (i64::from(x), i64::from(y));
            let m = magnitude.at(xi, yi);
            if m <= low {
                classes.push(EdgeClass::Suppressed);
                continue;
            }

            let dx = i32::from(gx.get_pixel(x, y).0[0]);
            let dy = i32::from(gy.get_pixel(x, y).0[0]);
            let (ax, ay) = (dx.abs(), dy.abs());
            let tg22x = ax * TG22;
            let scaled_y = ay << 15;

            let is_max = if scaled_y < tg22x {
                // Near-horizontal gradient: compare left and right.
                m > magnitude.at(xi - 1, yi) && m >= magnitude.at(xi + 1, yi)
            } else {
                let tg67x = tg22x + (ax << 16);
                if scaled_y > tg67x {
                    m > magnitude.at(xi, yi - 1) && m >= magnitude.at(xi, yi + 1)
                } else {
                    let s = if (dx < 0) == (dy < 0) { 1 } else { -1 };
                    m > magnitude.at(xi - s, yi - 1) && m > magnitude.at(xi + s, yi + 1)
                }
            };

            classes.push(match (is_max, m > high) {
                (false, _) => EdgeClass::Suppressed,
                (true, false) => EdgeClass::Weak,
                (true, true) => EdgeClass::Strong,
            });
        }
    }
    classes
}

/// Keep strong pixels and every weak pixel 8-connected to one.
fn hysteresis(classes: &[EdgeClass], width: u32, height: u32) -> GrayImage {
    let mut out: GrayImage = Image::from_pixel(width, height, Luma::black());
    let mut stack = Vec::new();
    let (w, h) = (i64::from(width), i64::from(height));

    for y in 0..height {
        for x in 0..width {
            let idx = (y as usize) * (width as usize) + (x as usize);
            if classes[idx] != EdgeClass::Strong || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma::white());
            stack.push((i64::from(x), i64::from(y)));

            while let Some((cx, cy)) = stack.pop() {
                for (nx, ny) in [
                    (cx + 1, cy),
                    (cx + 1, cy + 1),
                    (cx, cy + 1),
                    (cx - 1, cy + 1),
                    (cx - 1, cy),
                    (cx - 1, cy - 1),
                    (cx, cy - 1),
                    (cx + 1, cy - 1),
                ] {
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    // In range per the check above.
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let (ux, uy) = (nx as u32, ny as u32);
                    let nidx = (uy as usize) * (width as usize) + (ux as usize);
                    if classes[nidx] != EdgeClass::Suppressed && out.get_pixel(ux, uy).0[0] == 0 {
                        out.put_pixel(ux, uy, Luma::white());
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_positions(edges: &GrayImage) -> Vec<(u32, u32)> {
        edges
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    fn vertical_step(width: u32, height: u32, at: u32, low: u8, high: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            if x < at { Luma([low]) } else { Luma([high]) }
        })
    }

    #[test]
    fn uniform_image_produces_no_edges() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        for norm in [GradientNorm::L1, GradientNorm::L2] {
            let edges = canny(&img, 30.0, 200.0, norm);
            assert!(edge_positions(&edges).is_empty());
        }
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = GrayImage::new(17, 31);
        let edges = canny(&img, 50.0, 150.0, GradientNorm::L2);
        assert_eq!(edges.dimensions(), (17, 31));
    }

    #[test]
    fn empty_image_is_passed_through() {
        let img = GrayImage::new(0, 0);
        assert_eq!(canny(&img, 30.0, 200.0, GradientNorm::L1).dimensions(), (0, 0));
    }

    #[test]
    fn vertical_step_yields_single_column_on_dark_side() {
        // Both columns 9 and 10 carry the same magnitude; the
        // asymmetric comparison keeps only the first.
        let img = vertical_step(20, 20, 10, 0, 255);
        for norm in [GradientNorm::L1, GradientNorm::L2] {
            let positions = edge_positions(&canny(&img, 30.0, 200.0, norm));
            assert_eq!(positions.len(), 20);
            assert!(positions.iter().all(|&(x, _)| x == 9), "{positions:?}");
        }
    }

    #[test]
    fn horizontal_step_yields_single_row() {
        let img = GrayImage::from_fn(20, 20, |_, y| {
            if y < 10 { Luma([0]) } else { Luma([255]) }
        });
        let positions = edge_positions(&canny(&img, 30.0, 200.0, GradientNorm::L1));
        assert_eq!(positions.len(), 20);
        assert!(positions.iter().all(|&(_, y)| y == 9), "{positions:?}");
    }

    #[test]
    fn threshold_comparisons_are_strict() {
        // A step of 10 gives an L1 magnitude of exactly 40.
        let img = vertical_step(12, 12, 6, 100, 110);
        assert!(!edge_positions(&canny(&img, 10.0, 39.0, GradientNorm::L1)).is_empty());
        assert!(edge_positions(&canny(&img, 10.0, 40.0, GradientNorm::L1)).is_empty());
        assert!(edge_positions(&canny(&img, 40.0, 40.0, GradientNorm::L1)).is_empty());
    }

    #[test]
    fn weak_only_gradient_is_dropped() {
        let img = vertical_step(12, 12, 6, 100, 110);
        assert!(edge_positions(&canny(&img, 30.0, 200.0, GradientNorm::L1)).is_empty());
    }

    #[test]
    fn swapped_thresholds_match_ordered_ones() {
        let img = vertical_step(20, 20, 10, 0, 255);
        assert_eq!(
            canny(&img, 200.0, 30.0, GradientNorm::L2),
            canny(&img, 30.0, 200.0, GradientNorm::L2)
        );
    }

    #[test]
    fn border_edge_is_detected_without_panic() {
        let img = vertical_step(10, 10, 1, 0, 255);
        let positions = edge_positions(&canny(&img, 1.0, 2.0, GradientNorm::L1));
        assert!(positions.iter().any(|&(x, _)| x == 0));
    }

    #[test]
    fn hysteresis_follows_weak_pixels_connected_to_strong() {
        use EdgeClass::{Strong, Suppressed, Weak};
        #[rustfmt::skip]
        let classes = [
            Strong,     Weak,       Suppressed, Suppressed, Weak,
            Suppressed, Suppressed, Weak,       Suppressed, Suppressed,
            Suppressed, Suppressed, Suppressed, Suppressed, Suppressed,
        ];
        let out = hysteresis(&classes, 5, 3);
        assert_eq!(edge_positions(&out), vec![(0, 0), (1, 0), (2, 1)]);
    }

    #[test]
    fn weak_pixels_alone_are_not_edges() {
        let classes = [EdgeClass::Weak; 9];
        let out = hysteresis(&classes, 3, 3);
        assert!(edge_positions(&out).is_empty());
    }
}
