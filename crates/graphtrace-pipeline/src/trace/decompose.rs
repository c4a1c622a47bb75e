//! Boundary decomposition on the pixel-corner grid.
//!
//! Paths run along pixel edges (between pixels) rather than through
//! pixel centres, so a straight run of N pixels yields N unit steps.
//! Each traced boundary has its interior XOR-inverted in a working copy
//! of the bitmap, which turns holes into foreground for the next scan
//! and makes nesting fall out naturally.

use super::TurnPolicy;
use crate::edge::EdgeMask;

/// Whether a path bounds foreground or a hole in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Sign {
    /// Outer boundary of a foreground region.
    Positive,
    /// Boundary of a hole.
    Negative,
}

/// A closed path on the pixel-corner grid.
#[derive(Debug, Clone)]
pub(super) struct PixelPath {
    /// Corners visited, one per unit step.
    pub points: Vec<(i64, i64)>,
    /// Enclosed pixel count.
    pub area: i64,
    pub sign: Sign,
}

/// Dense boolean bitmap. Row `y` of the edge mask is row `y` here.
#[derive(Clone)]
struct Bitmap {
    width: i64,
    height: i64,
    data: Vec<bool>,
}

impl Bitmap {
    fn from_mask(mask: &EdgeMask) -> Self {
        let width = i64::from(mask.width());
        let height = i64::from(mask.height());
        let data = mask.as_image().pixels().map(|p| p.0[0] != 0).collect();
        Self {
            width,
            height,
            data,
        }
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        usize::try_from(y * self.width + x).ok()
    }

    /// Pixel value; out-of-range reads as background.
    fn get(&self, x: i64, y: i64) -> bool {
        self.index(x, y).is_some_and(|i| self.data[i])
    }

    /// Invert row `y` between columns `x` and `reference` (half-open,
    /// whichever order they come in).
    fn invert_span(&mut self, y: i64, x: i64, reference: i64) {
        let (from, to) = if x < reference {
            (x, reference)
        } else {
            (reference, x)
        };
        for xi in from.max(0)..to.min(self.width) {
            if let Some(i) = self.index(xi, y) {
                self.data[i] = !self.data[i];
            }
        }
    }

    /// Next set pixel scanning rows downward from `y0`, starting at
    /// column `x0` in the first row.
    fn find_next(&self, x0: i64, y0: i64) -> Option<(i64, i64)> {
        (0..=y0).rev().find_map(|y| {
            let start = if y == y0 { x0 } else { 0 };
            (start..self.width).find(|&x| self.get(x, y)).map(|x| (x, y))
        })
    }

    /// Whether the neighbourhood of corner `(x, y)` is mostly foreground.
    ///
    /// Checks square rings of growing radius and returns on the first
    /// one that is not balanced.
    fn majority(&self, x: i64, y: i64) -> bool {
        let vote = |set: bool| if set { 1 } else { -1 };
        for i in 2..5 {
            let mut count = 0i32;
            for a in (-i + 1)..=(i - 1) {
                count += vote(self.get(x + a, y + i - 1));
                count += vote(self.get(x + i - 1, y + a - 1));
                count += vote(self.get(x + a - 1, y - i));
                count += vote(self.get(x - i, y + a));
            }
            if count > 0 {
                return true;
            } else if count < 0 {
                return false;
            }
        }
        false
    }
}

/// Split `mask` into closed boundary paths in discovery order
/// (top row of the bitmap first, left to right).
///
/// Paths enclosing `turd_size` pixels or fewer are dropped.
pub(super) fn decompose(mask: &EdgeMask, turd_size: u32, policy: TurnPolicy) -> Vec<PixelPath> {
    let original = Bitmap::from_mask(mask);
    let mut work = original.clone();
    let mut paths = Vec::new();

    let mut cursor = (0, work.height - 1);
    while let Some((x, y)) = work.find_next(cursor.0, cursor.1) {
        let sign = if original.get(x, y) {
            Sign::Positive
        } else {
            Sign::Negative
        };
        let path = find_path(&work, x, y + 1, sign, policy);
        xor_path(&mut work, &path);
        if path.area > i64::from(turd_size) {
            paths.push(path);
        }
        cursor = (x, y);
    }

    paths
}

/// Follow one boundary starting at corner `(x0, y0)`, heading down,
/// keeping foreground on the left.
fn find_path(bm: &Bitmap, x0: i64, y0: i64, sign: Sign, policy: TurnPolicy) -> PixelPath {
    let mut points = Vec::new();
    let (mut x, mut y) = (x0, y0);
    let (mut dx, mut dy) = (0i64, -1i64);
    let mut area = 0i64;

    loop {
        points.push((x, y));
        x += dx;
        y += dy;
        area += x * dy;

        if x == x0 && y == y0 {
            break;
        }

        // Pixels ahead-right (c) and ahead-left (d) of the heading.
        let c = bm.get(x + (dx + dy - 1) / 2, y + (dy - dx - 1) / 2);
        let d = bm.get(x + (dx - dy - 1) / 2, y + (dy + dx - 1) / 2);

        let turn_right = if c && !d {
            match policy {
                TurnPolicy::Right => true,
                TurnPolicy::Left => false,
                TurnPolicy::Black => sign == Sign::Positive,
                TurnPolicy::White => sign == Sign::Negative,
                TurnPolicy::Majority => bm.majority(x, y),
                TurnPolicy::Minority => !bm.majority(x, y),
            }
        } else if c {
            true
        } else if !d {
            false
        } else {
            // Foreground left, background right: go straight.
            continue;
        };

        (dx, dy) = if turn_right { (dy, -dx) } else { (-dy, dx) };
    }

    PixelPath { points, area, sign }
}

/// Invert the interior of `path` in `bm`.
///
/// Every vertical step toggles its row from the step's column to a
/// fixed reference column; toggles pair up outside the path and cancel.
fn xor_path(bm: &mut Bitmap, path: &PixelPath) {
    let (Some(&(reference, _)), Some(&(_, last_y))) = (path.points.first(), path.points.last())
    else {
        return;
    };

    let mut prev_y = last_y;
    for &(x, y) in &path.points {
        if y != prev_y {
            bm.invert_span(y.min(prev_y), x, reference);
            prev_y = y;
        }
    }
}
