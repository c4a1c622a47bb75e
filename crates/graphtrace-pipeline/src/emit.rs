//! Expression emitter: traced curves → coloured parametric formulas.
//!
//! Every corner segment becomes two straight-line formulas and every
//! smooth segment one cubic Bezier written as a nested De Casteljau
//! expansion in `t`. Coordinates are multiplied by the render scale
//! factor before formatting with six decimals.

use serde::{Deserialize, Serialize};

use crate::color_mask::ColorMask;
use crate::path::{CurvePath, Segment};
use crate::sample;
use crate::types::Point;

/// A parametric formula over `t ∈ [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Formula {
    /// `(1-t)·from + t·to`.
    Linear {
        /// Value at `t = 0`.
        from: Point,
        /// Value at `t = 1`.
        to: Point,
    },
    /// Cubic Bezier through four control points.
    Cubic {
        /// Value at `t = 0`.
        p0: Point,
        /// First control point.
        p1: Point,
        /// Second control point.
        p2: Point,
        /// Value at `t = 1`.
        p3: Point,
    },
}

/// `(1-t)·a + t·b`, written so both endpoints are exact.
fn mix(a: f64, b: f64, t: f64) -> f64 {
    (1.0 - t) * a + t * b
}

fn mix_points(a: Point, b: Point, t: f64) -> Point {
    Point::new(mix(a.x, b.x, t), mix(a.y, b.y, t))
}

impl Formula {
    /// Point on the formula at parameter `t`.
    ///
    /// Evaluates in the same nesting order as [`Self::to_latex`].
    #[must_use]
    pub fn evaluate(&self, t: f64) -> Point {
        match *self {
            Self::Linear { from, to } => mix_points(from, to, t),
            Self::Cubic { p0, p1, p2, p3 } => {
                let a = mix_points(mix_points(p0, p1, t), mix_points(p1, p2, t), t);
                let b = mix_points(mix_points(p1, p2, t), mix_points(p2, p3, t), t);
                mix_points(a, b, t)
            }
        }
    }

    /// The same formula with every point multiplied by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        match self {
            Self::Linear { from, to } => Self::Linear {
                from: from.scaled(factor),
                to: to.scaled(factor),
            },
            Self::Cubic { p0, p1, p2, p3 } => Self::Cubic {
                p0: p0.scaled(factor),
                p1: p1.scaled(factor),
                p2: p2.scaled(factor),
                p3: p3.scaled(factor),
            },
        }
    }

    /// Graphing-calculator source for the formula, as an `(x(t),y(t))`
    /// pair.
    #[must_use]
    pub fn to_latex(&self) -> String {
        match *self {
            Self::Linear { from, to } => format!(
                "({},{})",
                linear_term(from.x, to.x),
                linear_term(from.y, to.y)
            ),
            Self::Cubic { p0, p1, p2, p3 } => format!(
                "({},{})",
                cubic_term([p0.x, p1.x, p2.x, p3.x]),
                cubic_term([p0.y, p1.y, p2.y, p3.y])
            ),
        }
    }
}

fn linear_term(a: f64, b: f64) -> String {
    format!("(1-t){a:.6}+t{b:.6}")
}

fn cubic_term([c0, c1, c2, c3]: [f64; 4]) -> String {
    format!(
        "(1-t)((1-t)({})+t({}))+t((1-t)({})+t({}))",
        linear_term(c0, c1),
        linear_term(c1, c2),
        linear_term(c1, c2),
        linear_term(c2, c3)
    )
}

/// One coloured formula as handed to the serving layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    /// `expr-<n>`, numbered from 1 within a frame.
    pub id: String,
    /// Formula source.
    pub latex: String,
    /// `#rrggbb`, lowercase.
    pub color: String,
    /// Hides the formula text in the calculator UI. Always `true`.
    pub secret: bool,
}

/// Ordered expressions for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameResult {
    expressions: Vec<Expression>,
}

impl FrameResult {
    /// Wrap an ordered expression list.
    #[must_use]
    pub const fn new(expressions: Vec<Expression>) -> Self {
        Self { expressions }
    }

    /// Number of expressions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    /// Whether the frame produced nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// The expressions in emission order.
    #[must_use]
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }
}

/// Formulas for one segment starting at `start`, each paired with the
/// unscaled point its colour is sampled at.
#[must_use]
pub fn segment_formulas(start: Point, segment: &Segment) -> Vec<(Formula, Point)> {
    match *segment {
        Segment::Corner { control, end } => vec![
            (
                Formula::Linear {
                    from: start,
                    to: control,
                },
                start,
            ),
            (
                Formula::Linear {
                    from: control,
                    to: end,
                },
                control,
            ),
        ],
        Segment::Smooth {
            control1,
            control2,
            end,
        } => vec![(
            Formula::Cubic {
                p0: start,
                p1: control1,
                p2: control2,
                p3: end,
            },
            start,
        )],
    }
}

/// Sample point → `(row, col)` on the colour mask, truncating toward zero.
#[allow(clippy::cast_possible_truncation)]
fn sample_position(p: Point) -> (isize, isize) {
    (p.y as isize, p.x as isize)
}

/// Turn every segment of `path` into expressions, coloured from
/// `colors` and scaled by `scale`.
#[must_use]
pub fn emit(path: &CurvePath, colors: &ColorMask, scale: f64) -> FrameResult {
    let expressions = path
        .curves
        .iter()
        .flat_map(|curve| curve.pieces())
        .flat_map(|(start, segment)| segment_formulas(start, segment))
        .enumerate()
        .map(|(i, (formula, at))| {
            let (row, col) = sample_position(at);
            Expression {
                id: format!("expr-{}", i + 1),
                latex: formula.scaled(scale).to_latex(),
                color: sample::sample_hex(colors, row, col),
                secret: true,
            }
        })
        .collect();
    FrameResult::new(expressions)
}
