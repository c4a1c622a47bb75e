//! Optimal polygon approximation and sub-pixel vertex adjustment.
//!
//! 1. Prefix sums of point coordinates make any sub-path's least-squares
//!    line available in O(1).
//! 2. For every point, find the furthest point reachable by a "straight"
//!    sub-path (one that never uses all four step directions and stays
//!    within a half-pixel corridor).
//! 3. Dynamic programming picks the polygon with the fewest vertices,
//!    breaking ties by total deviation.
//! 4. Each vertex is moved, within its unit square, to the point closest
//!    to both adjacent best-fit lines.

// Index arithmetic mixes signed offsets with slice indices.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::float_cmp,
    clippy::many_single_char_names,
    clippy::similar_names
)]

use super::decompose::{PixelPath, Sign};
use crate::types::Point;

/// Upper bound used where a constraint places no limit on a step count.
const INFTY: i64 = 10_000_000;

/// Running sums of coordinates relative to the path's first point.
#[derive(Debug, Clone, Copy, Default)]
struct Sums {
    x: f64,
    y: f64,
    x2: f64,
    xy: f64,
    y2: f64,
}

/// 3×3 symmetric matrix representing squared distance to a line.
type Quadform = [[f64; 3]; 3];

/// Compute the adjusted polygon for `path`.
///
/// Hole paths come back in reversed vertex order.
pub(super) fn optimal_polygon(path: &PixelPath) -> Vec<Point> {
    let points = &path.points;
    if points.is_empty() {
        return Vec::new();
    }
    let sums = calc_sums(points);
    let lon = longest_straight(points);
    let po = best_polygon(points, &sums, &lon);
    let mut vertices = adjust_vertices(points, &sums, &po);
    if path.sign == Sign::Negative {
        vertices.reverse();
    }
    vertices
}

const fn cyclic(a: usize, b: usize, c: usize) -> bool {
    if a <= c { a <= b && b < c } else { a <= b || b < c }
}

const fn xprod(p1: (i64, i64), p2: (i64, i64)) -> i64 {
    p1.0 * p2.1 - p1.1 * p2.0
}

fn wrap(a: i64, n: usize) -> usize {
    a.rem_euclid(n as i64) as usize
}

fn calc_sums(points: &[(i64, i64)]) -> Vec<Sums> {
    let (x0, y0) = points[0];
    let mut acc = Sums::default();
    let mut sums = Vec::with_capacity(points.len() + 1);
    sums.push(acc);
    for &(px, py) in points {
        let x = (px - x0) as f64;
        let y = (py - y0) as f64;
        acc = Sums {
            x: acc.x + x,
            y: acc.y + y,
            x2: x.mul_add(x, acc.x2),
            xy: x.mul_add(y, acc.xy),
            y2: y.mul_add(y, acc.y2),
        };
        sums.push(acc);
    }
    sums
}

/// For each point `i`, the furthest index `lon[i]` such that every
/// sub-path starting between `i` and `lon[i]` stays straight up to it.
fn longest_straight(pt: &[(i64, i64)]) -> Vec<usize> {
    let n = pt.len();

    // nc[i]: next index whose point differs from pt[i] in both x and y.
    let mut nc = vec![0usize; n];
    let mut k = 0usize;
    for i in (0..n).rev() {
        if pt[i].0 != pt[k].0 && pt[i].1 != pt[k].1 {
            k = i + 1;
        }
        nc[i] = k;
    }

    let direction = |from: (i64, i64), to: (i64, i64)| -> usize {
        let d = (3 + 3 * (to.0 - from.0).signum() + (to.1 - from.1).signum()) / 2;
        d as usize
    };

    let mut pivk = vec![0usize; n];
    for i in (0..n).rev() {
        let mut ct = [0u32; 4];
        ct[direction(pt[i], pt[(i + 1) % n])] += 1;

        let mut constraint = [(0i64, 0i64); 2];
        let mut k = nc[i];
        let mut k1 = i;

        let pivot = loop {
            ct[direction(pt[k1], pt[k])] += 1;
            if ct.iter().all(|&c| c > 0) {
                break Some(k1);
            }

            let cur = (pt[k].0 - pt[i].0, pt[k].1 - pt[i].1);
            if xprod(constraint[0], cur) < 0 || xprod(constraint[1], cur) > 0 {
                break None;
            }

            if cur.0.abs() > 1 || cur.1.abs() > 1 {
                let off = (
                    cur.0 + if cur.1 >= 0 && (cur.1 > 0 || cur.0 < 0) { 1 } else { -1 },
                    cur.1 + if cur.0 <= 0 && (cur.0 < 0 || cur.1 < 0) { 1 } else { -1 },
                );
                if xprod(constraint[0], off) >= 0 {
                    constraint[0] = off;
                }
                let off = (
                    cur.0 + if cur.1 <= 0 && (cur.1 < 0 || cur.0 < 0) { 1 } else { -1 },
                    cur.1 + if cur.0 >= 0 && (cur.0 > 0 || cur.1 < 0) { 1 } else { -1 },
                );
                if xprod(constraint[1], off) <= 0 {
                    constraint[1] = off;
                }
            }

            k1 = k;
            k = nc[k1];
            if !cyclic(k, i, k1) {
                break None;
            }
        };

        pivk[i] = pivot.unwrap_or_else(|| {
            // k1 satisfied the constraint and k did not: find the last
            // point on the straight run k1..k that still does.
            let dk = (
                (pt[k].0 - pt[k1].0).signum(),
                (pt[k].1 - pt[k1].1).signum(),
            );
            let cur = (pt[k1].0 - pt[i].0, pt[k1].1 - pt[i].1);
            let a = xprod(constraint[0], cur);
            let b = xprod(constraint[0], dk);
            let c = xprod(constraint[1], cur);
            let d = xprod(constraint[1], dk);
            let mut j = INFTY;
            if b < 0 {
                j = a.div_euclid(-b);
            }
            if d > 0 {
                j = j.min((-c).div_euclid(d));
            }
            wrap(k1 as i64 + j, n)
        });
    }

    let mut lon = vec![0usize; n];
    let mut j = pivk[n - 1];
    lon[n - 1] = j;
    for i in (0..n - 1).rev() {
        if cyclic(i + 1, pivk[i], j) {
            j = pivk[i];
        }
        lon[i] = j;
    }

    let mut i = n - 1;
    while cyclic((i + 1) % n, j, lon[i]) {
        lon[i] = j;
        if i == 0 {
            break;
        }
        i -= 1;
    }

    lon
}

/// Deviation of the points `i..=j` from the straight segment joining
/// `pt[i]` and `pt[j]`. `j` may exceed `n - 1` to wrap once.
fn penalty3(pt: &[(i64, i64)], sums: &[Sums], i: usize, j: usize) -> f64 {
    let n = pt.len();
    let (j, r): (usize, f64) = if j >= n { (j - n, 1.0) } else { (j, 0.0) };

    let x = r.mul_add(sums[n].x, sums[j + 1].x - sums[i].x);
    let y = r.mul_add(sums[n].y, sums[j + 1].y - sums[i].y);
    let x2 = r.mul_add(sums[n].x2, sums[j + 1].x2 - sums[i].x2);
    let xy = r.mul_add(sums[n].xy, sums[j + 1].xy - sums[i].xy);
    let y2 = r.mul_add(sums[n].y2, sums[j + 1].y2 - sums[i].y2);
    let k = (j + 1) as f64 - i as f64 + r * n as f64;

    let px = (pt[i].0 + pt[j].0) as f64 / 2.0 - pt[0].0 as f64;
    let py = (pt[i].1 + pt[j].1) as f64 / 2.0 - pt[0].1 as f64;
    let ey = (pt[j].0 - pt[i].0) as f64;
    let ex = -((pt[j].1 - pt[i].1) as f64);

    let a = (x2 - 2.0 * x * px) / k + px * px;
    let b = (xy - x * py - y * px) / k + px * py;
    let c = (y2 - 2.0 * y * py) / k + py * py;

    let s = ex * ex * a + 2.0 * ex * ey * b + ey * ey * c;
    s.max(0.0).sqrt()
}

/// Indices of the polygon vertices with the fewest segments, then the
/// least total deviation.
fn best_polygon(pt: &[(i64, i64)], sums: &[Sums], lon: &[usize]) -> Vec<usize> {
    let n = pt.len();

    // clip0[i]: furthest index reachable from i in one segment.
    let clip0: Vec<usize> = (0..n)
        .map(|i| {
            let mut c = wrap(lon[wrap(i as i64 - 1, n)] as i64 - 1, n);
            if c == i {
                c = (i + 1) % n;
            }
            if c < i { n } else { c }
        })
        .collect();

    // clip1[j]: earliest index that reaches j in one segment.
    let mut clip1 = vec![0usize; n + 1];
    let mut j = 1;
    for (i, &reach) in clip0.iter().enumerate() {
        while j <= reach {
            clip1[j] = i;
            j += 1;
        }
    }

    // seg0[j]: furthest index reachable from 0 in j segments.
    let mut seg0 = Vec::new();
    let mut i = 0;
    while i < n {
        seg0.push(i);
        i = clip0[i];
    }
    seg0.push(n);
    let m = seg0.len() - 1;

    // seg1[j]: earliest index from which n is reachable in m - j segments.
    let mut seg1 = vec![0usize; m + 1];
    let mut i = n;
    for j in (1..=m).rev() {
        seg1[j] = i;
        i = clip1[i];
    }
    seg1[0] = 0;

    let mut pen = vec![0.0f64; n + 1];
    let mut prev = vec![0usize; n + 1];
    for j in 1..=m {
        for i in seg1[j]..=seg0[j] {
            let mut best = -1.0f64;
            for k in (clip1[i]..=seg0[j - 1]).rev() {
                let this = penalty3(pt, sums, k, i) + pen[k];
                if best < 0.0 || this < best {
                    prev[i] = k;
                    best = this;
                }
            }
            pen[i] = best;
        }
    }

    let mut po = vec![0usize; m];
    let mut i = n;
    for slot in po.iter_mut().rev() {
        i = prev[i];
        *slot = i;
    }
    po
}

/// Least-squares line through points `i..=j` (indices taken cyclically):
/// returns the centroid (relative to `pt[0]`) and unit direction.
fn point_slope(pt: &[(i64, i64)], sums: &[Sums], i: i64, j: i64) -> (Point, Point) {
    let n = pt.len() as i64;
    let (mut i, mut j, mut r) = (i, j, 0i64);
    while j >= n {
        j -= n;
        r += 1;
    }
    while i >= n {
        i -= n;
        r -= 1;
    }
    while j < 0 {
        j += n;
        r -= 1;
    }
    while i < 0 {
        i += n;
        r += 1;
    }

    let (iu, ju, nu) = (i as usize, j as usize, n as usize);
    let rf = r as f64;
    let x = rf.mul_add(sums[nu].x, sums[ju + 1].x - sums[iu].x);
    let y = rf.mul_add(sums[nu].y, sums[ju + 1].y - sums[iu].y);
    let x2 = rf.mul_add(sums[nu].x2, sums[ju + 1].x2 - sums[iu].x2);
    let xy = rf.mul_add(sums[nu].xy, sums[ju + 1].xy - sums[iu].xy);
    let y2 = rf.mul_add(sums[nu].y2, sums[ju + 1].y2 - sums[iu].y2);
    let k = (j + 1 - i + r * n) as f64;

    let ctr = Point::new(x / k, y / k);

    let mut a = (x2 - x * x / k) / k;
    let b = (xy - x * y / k) / k;
    let mut c = (y2 - y * y / k) / k;

    // Larger eigenvalue; its eigenvector is the line direction.
    let lambda2 = (a + c + (a - c).mul_add(a - c, 4.0 * b * b).sqrt()) / 2.0;
    a -= lambda2;
    c -= lambda2;

    let dir = if a.abs() >= c.abs() {
        let l = a.hypot(b);
        if l == 0.0 {
            Point::new(0.0, 0.0)
        } else {
            Point::new(-b / l, a / l)
        }
    } else {
        let l = c.hypot(b);
        if l == 0.0 {
            Point::new(0.0, 0.0)
        } else {
            Point::new(-c / l, b / l)
        }
    };

    (ctr, dir)
}

fn quadform(q: &Quadform, w: Point) -> f64 {
    let v = [w.x, w.y, 1.0];
    let mut sum = 0.0;
    for (l, row) in q.iter().enumerate() {
        for (k, &entry) in row.iter().enumerate() {
            sum += v[l] * entry * v[k];
        }
    }
    sum
}

fn add_outer(q: &mut Quadform, v: [f64; 3], d: f64) {
    for (l, row) in q.iter_mut().enumerate() {
        for (k, entry) in row.iter_mut().enumerate() {
            *entry += v[l] * v[k] / d;
        }
    }
}

/// Move each polygon vertex to the point of its unit square closest to
/// both adjacent best-fit lines.
fn adjust_vertices(pt: &[(i64, i64)], sums: &[Sums], po: &[usize]) -> Vec<Point> {
    let n = pt.len();
    let m = po.len();
    if m == 0 {
        return Vec::new();
    }
    let (x0, y0) = (pt[0].0 as f64, pt[0].1 as f64);

    let forms: Vec<Quadform> = (0..m)
        .map(|i| {
            let next = po[(i + 1) % m];
            let j = wrap(next as i64 - po[i] as i64, n) as i64 + po[i] as i64;
            let (ctr, dir) = point_slope(pt, sums, po[i] as i64, j);

            let mut q = [[0.0; 3]; 3];
            let d = dir.x.mul_add(dir.x, dir.y * dir.y);
            if d != 0.0 {
                let v = [dir.y, -dir.x, dir.x.mul_add(ctr.y, -dir.y * ctr.x)];
                add_outer(&mut q, v, d);
            }
            q
        })
        .collect();

    (0..m)
        .map(|i| {
            let s = Point::new(pt[po[i]].0 as f64 - x0, pt[po[i]].1 as f64 - y0);
            let j = (i + m - 1) % m;

            let mut q = [[0.0; 3]; 3];
            for l in 0..3 {
                for k in 0..3 {
                    q[l][k] = forms[j][l][k] + forms[i][l][k];
                }
            }

            let w = loop {
                let det = q[0][0].mul_add(q[1][1], -q[0][1] * q[1][0]);
                if det != 0.0 {
                    break Point::new(
                        (-q[0][2]).mul_add(q[1][1], q[1][2] * q[0][1]) / det,
                        q[0][2].mul_add(q[1][0], -q[1][2] * q[0][0]) / det,
                    );
                }
                // Parallel lines: add an orthogonal axis through the vertex.
                let (v0, v1) = if q[0][0] > q[1][1] {
                    (-q[0][1], q[0][0])
                } else if q[1][1] != 0.0 {
                    (-q[1][1], q[1][0])
                } else {
                    (1.0, 0.0)
                };
                let d = v0.mul_add(v0, v1 * v1);
                let v = [v0, v1, (-v1).mul_add(s.y, -v0 * s.x)];
                add_outer(&mut q, v, d);
            };

            if (w.x - s.x).abs() <= 0.5 && (w.y - s.y).abs() <= 0.5 {
                return Point::new(w.x + x0, w.y + y0);
            }

            // Minimum lies outside the unit square: search its boundary.
            let mut min = quadform(&q, s);
            let mut best = s;

            if q[0][0] != 0.0 {
                for z in 0..2 {
                    let wy = s.y - 0.5 + f64::from(z);
                    let wx = -q[0][1].mul_add(wy, q[0][2]) / q[0][0];
                    let cand = quadform(&q, Point::new(wx, wy));
                    if (wx - s.x).abs() <= 0.5 && cand < min {
                        min = cand;
                        best = Point::new(wx, wy);
                    }
                }
            }

            if q[1][1] != 0.0 {
                for z in 0..2 {
                    let wx = s.x - 0.5 + f64::from(z);
                    let wy = -q[1][0].mul_add(wx, q[1][2]) / q[1][1];
                    let cand = quadform(&q, Point::new(wx, wy));
                    if (wy - s.y).abs() <= 0.5 && cand < min {
                        min = cand;
                        best = Point::new(wx, wy);
                    }
                }
            }

            for l in 0..2 {
                for k in 0..2 {
                    let corner = Point::new(s.x - 0.5 + f64::from(l), s.y - 0.5 + f64::from(k));
                    let cand = quadform(&q, corner);
                    if cand < min {
                        min = cand;
                        best = corner;
                    }
                }
            }

            Point::new(best.x + x0, best.y + y0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Corner walk around an axis-aligned `w`×`h` rectangle whose
    /// top-left corner is `(x, y + h)`, in tracing order.
    fn rectangle_path(x: i64, y: i64, w: i64, h: i64) -> Vec<(i64, i64)> {
        let mut points = Vec::new();
        for i in 0..h {
            points.push((x, y + h - i));
        }
        for i in 0..w {
            points.push((x + i, y));
        }
        for i in 0..h {
            points.push((x + w, y + i));
        }
        for i in 0..w {
            points.push((x + w - i, y + h));
        }
        points
    }

    #[test]
    fn cyclic_ordering() {
        assert!(cyclic(1, 2, 3));
        assert!(!cyclic(1, 3, 3));
        assert!(cyclic(5, 6, 2));
        assert!(cyclic(5, 1, 2));
        assert!(!cyclic(5, 3, 2));
    }

    #[test]
    fn straight_run_has_zero_penalty() {
        let pt = rectangle_path(0, 0, 10, 6);
        let sums = calc_sums(&pt);
        // Points 6..=16 run along the bottom edge.
        assert!(penalty3(&pt, &sums, 6, 16) < 1e-9);
        // Cutting across a corner deviates.
        assert!(penalty3(&pt, &sums, 3, 9) > 0.1);
    }

    #[test]
    fn penalty_wraps_past_the_last_point() {
        let pt = rectangle_path(0, 0, 10, 6);
        let n = pt.len();
        let sums = calc_sums(&pt);
        // The top edge (22..32) continues into point 0.
        assert!(penalty3(&pt, &sums, 22, n) < 1e-9);
        // Wrapping down the left side cuts the top-left corner.
        assert!(penalty3(&pt, &sums, 28, n + 2) > 0.1);
    }

    #[test]
    fn rectangle_polygon_has_four_vertices_at_corners() {
        let pt = rectangle_path(2, 3, 12, 8);
        let path = PixelPath {
            area: 96,
            points: pt,
            sign: Sign::Positive,
        };
        let vertices = optimal_polygon(&path);
        assert_eq!(vertices.len(), 4);
        let corners = [
            Point::new(2.0, 11.0),
            Point::new(2.0, 3.0),
            Point::new(14.0, 3.0),
            Point::new(14.0, 11.0),
        ];
        for (v, c) in vertices.iter().zip(corners) {
            assert!(v.distance(c) < 1e-6, "{v:?} != {c:?}");
        }
    }

    #[test]
    fn hole_polygon_is_reversed() {
        let pt = rectangle_path(2, 3, 12, 8);
        let positive = optimal_polygon(&PixelPath {
            area: 96,
            points: pt.clone(),
            sign: Sign::Positive,
        });
        let mut negative = optimal_polygon(&PixelPath {
            area: 96,
            points: pt,
            sign: Sign::Negative,
        });
        negative.reverse();
        assert_eq!(positive, negative);
    }

    #[test]
    fn point_slope_of_horizontal_run() {
        let pt = rectangle_path(0, 0, 10, 6);
        let sums = calc_sums(&pt);
        let (ctr, dir) = point_slope(&pt, &sums, 6, 16);
        // Centroid of (0..=10, 0) relative to pt[0] = (0, 6).
        assert!((ctr.x - 5.0).abs() < 1e-9);
        assert!((ctr.y + 6.0).abs() < 1e-9);
        assert!(dir.y.abs() < 1e-9);
        assert!((dir.x.abs() - 1.0).abs() < 1e-9);
    }
}
