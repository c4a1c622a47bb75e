//! Bitmap vectorizer: binary edge mask → closed Bezier curves.
//!
//! Potrace-style tracing in four stages:
//!
//! 1. Boundary decomposition on the pixel-corner grid with XOR fill
//!    ([`decompose`])
//! 2. Optimal polygon by dynamic programming, then sub-pixel vertex
//!    adjustment ([`polygon`])
//! 3. Alpha-based corner/smooth classification ([`curve::smooth`])
//! 4. Optional merging of consecutive smooth segments
//!    ([`curve::optimize`])
//!
//! # Strategy pattern
//!
//! [`CurveTracer`] is the seam between the pipeline and the tracing
//! algorithm; [`TraceParams`] is the one implementation shipped.

mod curve;
mod decompose;
mod polygon;

use serde::{Deserialize, Serialize};

use crate::edge::EdgeMask;
use crate::path::CurvePath;
use crate::types::PipelineError;

/// How ambiguous diagonal pixel junctions are resolved while following
/// a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPolicy {
    /// Connect foreground (turn right on outer boundaries).
    Black,
    /// Connect background (turn right on holes).
    White,
    /// Always turn left.
    Left,
    /// Always turn right.
    Right,
    /// Side with the locally less common colour.
    #[default]
    Minority,
    /// Side with the locally more common colour.
    Majority,
}

/// Vectorizer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceParams {
    /// Paths enclosing this many pixels or fewer are discarded.
    pub turd_size: u32,

    /// Junction tie-breaking rule.
    pub turn_policy: TurnPolicy,

    /// Corner threshold. Vertices whose smoothness `alpha` reaches this
    /// value become corners. `0` makes everything a corner; values above
    /// `4/3` make everything smooth.
    pub alpha_max: f64,

    /// Merge runs of smooth segments into fewer cubics.
    pub optimize_curves: bool,

    /// Maximum deviation (in pixels) a merged curve may have from the
    /// segments it replaces.
    pub opt_tolerance: f64,
}

impl TraceParams {
    /// Default speckle floor.
    pub const DEFAULT_TURD_SIZE: u32 = 2;
    /// Default corner threshold.
    pub const DEFAULT_ALPHA_MAX: f64 = 1.0;
    /// Default curve-merge tolerance.
    pub const DEFAULT_OPT_TOLERANCE: f64 = 0.5;

    pub(crate) fn validate(&self) -> Result<(), PipelineError> {
        if !self.alpha_max.is_finite() || self.alpha_max < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "tracer alpha_max must be finite and non-negative, got {}",
                self.alpha_max
            )));
        }
        if !self.opt_tolerance.is_finite() || self.opt_tolerance < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "tracer opt_tolerance must be finite and non-negative, got {}",
                self.opt_tolerance
            )));
        }
        Ok(())
    }
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            turd_size: Self::DEFAULT_TURD_SIZE,
            turn_policy: TurnPolicy::default(),
            alpha_max: Self::DEFAULT_ALPHA_MAX,
            optimize_curves: true,
            opt_tolerance: Self::DEFAULT_OPT_TOLERANCE,
        }
    }
}

/// Trait for bitmap-to-curve tracing strategies.
///
/// Input: an edge mask in tracer orientation.
/// Output: closed curves, deterministic for a given mask.
pub trait CurveTracer {
    /// Trace every boundary in `edges`.
    fn trace(&self, edges: &EdgeMask) -> CurvePath;
}

impl CurveTracer for TraceParams {
    fn trace(&self, edges: &EdgeMask) -> CurvePath {
        trace(edges, self)
    }
}

/// Trace `edges` into closed curves.
#[must_use]
pub fn trace(edges: &EdgeMask, params: &TraceParams) -> CurvePath {
    let paths = decompose::decompose(edges, params.turd_size, params.turn_policy);

    let curves = paths
        .iter()
        .filter_map(|path| {
            let vertices = polygon::optimal_polygon(path);
            let smoothed = curve::smooth(&vertices, params.alpha_max);
            let fitted = if params.optimize_curves {
                curve::optimize(&smoothed, params.opt_tolerance)
            } else {
                smoothed
            };
            fitted.to_curve()
        })
        .collect();

    CurvePath::new(curves)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::path::Segment;
    use crate::types::Point;
    use image::{GrayImage, Luma};

    fn mask_from_fn(w: u32, h: u32, f: impl Fn(u32, u32) -> bool) -> EdgeMask {
        EdgeMask::from_flipped(GrayImage::from_fn(w, h, |x, y| {
            if f(x, y) { Luma([255]) } else { Luma([0]) }
        }))
    }

    fn approx(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-6
    }

    #[test]
    fn empty_mask_traces_nothing() {
        let mask = mask_from_fn(20, 20, |_, _| false);
        assert!(trace(&mask, &TraceParams::default()).is_empty());
    }

    #[test]
    fn rectangle_traces_to_four_corners() {
        let mask = mask_from_fn(30, 20, |x, y| (5..25).contains(&x) && (5..15).contains(&y));
        let path = trace(&mask, &TraceParams::default());
        assert_eq!(path.len(), 1);

        let curve = &path.curves[0];
        assert_eq!(curve.segments.len(), 4);
        assert!(curve.is_closed());

        let expected = [
            Point::new(5.0, 5.0),
            Point::new(25.0, 5.0),
            Point::new(25.0, 15.0),
            Point::new(5.0, 15.0),
        ];
        for segment in &curve.segments {
            let Segment::Corner { control, .. } = *segment else {
                panic!("expected corner, got {segment:?}");
            };
            assert!(
                expected.iter().any(|&e| approx(e, control)),
                "unexpected corner {control:?}"
            );
        }
    }

    #[test]
    fn corner_ends_are_side_midpoints() {
        let mask = mask_from_fn(30, 20, |x, y| (5..25).contains(&x) && (5..15).contains(&y));
        let path = trace(&mask, &TraceParams::default());
        let midpoints = [
            Point::new(15.0, 5.0),
            Point::new(25.0, 10.0),
            Point::new(15.0, 15.0),
            Point::new(5.0, 10.0),
        ];
        for segment in &path.curves[0].segments {
            assert!(midpoints.iter().any(|&m| approx(m, segment.end())));
        }
    }

    #[test]
    fn disc_produces_smooth_segments() {
        let mask = mask_from_fn(40, 40, |x, y| {
            let dx = f64::from(x) - 20.0;
            let dy = f64::from(y) - 20.0;
            dx.hypot(dy) < 12.0
        });
        let path = trace(&mask, &TraceParams::default());
        assert_eq!(path.len(), 1);
        assert!(
            path.curves[0]
                .segments
                .iter()
                .any(|s| matches!(s, Segment::Smooth { .. }))
        );
        assert!(path.curves[0].is_closed());
    }

    #[test]
    fn ring_traces_outer_boundary_and_hole() {
        let mask = mask_from_fn(30, 30, |x, y| {
            let outer = (5..25).contains(&x) && (5..25).contains(&y);
            let hole = (10..20).contains(&x) && (10..20).contains(&y);
            outer && !hole
        });
        let path = trace(&mask, &TraceParams::default());
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn specks_at_or_below_turd_size_are_dropped() {
        let two_pixels = mask_from_fn(10, 10, |x, y| y == 4 && (4..6).contains(&x));
        assert!(trace(&two_pixels, &TraceParams::default()).is_empty());

        let three_pixels = mask_from_fn(10, 10, |x, y| y == 4 && (4..7).contains(&x));
        assert_eq!(trace(&three_pixels, &TraceParams::default()).len(), 1);
    }

    #[test]
    fn zero_alpha_max_makes_every_vertex_a_corner() {
        let mask = mask_from_fn(40, 40, |x, y| {
            let dx = f64::from(x) - 20.0;
            let dy = f64::from(y) - 20.0;
            dx.hypot(dy) < 12.0
        });
        let params = TraceParams {
            alpha_max: 0.0,
            ..TraceParams::default()
        };
        let path = trace(&mask, &params);
        assert!(
            path.curves
                .iter()
                .flat_map(|c| &c.segments)
                .all(|s| matches!(s, Segment::Corner { .. }))
        );
    }

    #[test]
    fn optimization_never_adds_segments() {
        let mask = mask_from_fn(40, 40, |x, y| {
            let dx = f64::from(x) - 20.0;
            let dy = f64::from(y) - 20.0;
            dx.hypot(dy) < 12.0
        });
        let plain = trace(
            &mask,
            &TraceParams {
                optimize_curves: false,
                ..TraceParams::default()
            },
        );
        let optimized = trace(&mask, &TraceParams::default());
        assert!(optimized.segment_count() <= plain.segment_count());
    }

    #[test]
    fn tracing_is_deterministic() {
        let mask = mask_from_fn(32, 32, |x, y| (x * 7 + y * 3) % 11 < 4);
        let params = TraceParams::default();
        assert_eq!(trace(&mask, &params), trace(&mask, &params));
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let params = TraceParams {
            opt_tolerance: -0.1,
            ..TraceParams::default()
        };
        assert!(params.validate().is_err());
    }
}
