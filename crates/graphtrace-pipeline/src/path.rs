//! Traced curve geometry: closed curves built from corner and smooth
//! segments.

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// One piece of a closed curve.
///
/// The start point is implicit: it is the previous segment's end, or the
/// owning [`Curve`]'s start for the first segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Sharp turn: straight line to `control`, then straight line to `end`.
    Corner {
        /// The corner vertex.
        control: Point,
        /// Where the segment ends.
        end: Point,
    },
    /// Cubic Bezier from the implicit start through two control points.
    Smooth {
        /// First control point.
        control1: Point,
        /// Second control point.
        control2: Point,
        /// Where the segment ends.
        end: Point,
    },
}

impl Segment {
    /// The segment's end point.
    #[must_use]
    pub const fn end(&self) -> Point {
        match *self {
            Self::Corner { end, .. } | Self::Smooth { end, .. } => end,
        }
    }
}

/// A closed loop of segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    /// Start (and, since the curve is closed, final end) point.
    pub start: Point,
    /// Segments in traversal order.
    pub segments: Vec<Segment>,
}

impl Curve {
    /// Create a curve from its start point and segments.
    #[must_use]
    pub const fn new(start: Point, segments: Vec<Segment>) -> Self {
        Self { start, segments }
    }

    /// Iterate segments paired with their implicit start points.
    pub fn pieces(&self) -> impl Iterator<Item = (Point, &Segment)> + '_ {
        let mut cursor = self.start;
        self.segments.iter().map(move |segment| {
            let from = cursor;
            cursor = segment.end();
            (from, segment)
        })
    }

    /// Whether the last segment ends where the curve starts.
    ///
    /// An empty curve counts as closed.
    #[cfg(test)]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.segments
            .last()
            .is_none_or(|last| last.end() == self.start)
    }
}

/// All curves traced from one edge mask, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurvePath {
    /// The traced curves.
    pub curves: Vec<Curve>,
}

impl CurvePath {
    /// Wrap a list of curves.
    #[must_use]
    pub const fn new(curves: Vec<Curve>) -> Self {
        Self { curves }
    }

    /// Number of curves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// Whether no curves were traced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Total segments across all curves.
    #[cfg(test)]
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.curves.iter().map(|c| c.segments.len()).sum()
    }
}
