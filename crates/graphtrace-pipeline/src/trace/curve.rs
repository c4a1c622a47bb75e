//! Corner classification, Bezier generation, and curve optimization.
//!
//! Every polygon vertex gets a smoothness value `alpha` from how far it
//! sticks out relative to its neighbours. Sharp vertices
//! (`alpha >= alpha_max`) become corners, the rest become cubic
//! segments whose control points sit on the polygon edges. The optional
//! optimization pass then replaces runs of same-direction smooth
//! segments with a single cubic where the fit stays within tolerance.

#![allow(clippy::float_cmp, clippy::many_single_char_names, clippy::similar_names)]

use crate::path::{Curve, Segment};
use crate::types::Point;

/// `cos(179°)`: consecutive edges turning more sharply than this are
/// never merged into one curve.
const COS179: f64 = -0.999_847_695_156_391_3;

/// Lower clamp for the smoothness parameter of a smooth vertex.
const ALPHA_MIN: f64 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Corner,
    CurveTo,
}

/// Segment list in the tracer's working representation.
///
/// For segment `i`, `c[i][2]` is its end point. Corners use `c[i][1]` as
/// the corner vertex; curves use `c[i][0]` and `c[i][1]` as control
/// points.
#[derive(Debug, Clone)]
pub(super) struct TracedCurve {
    tag: Vec<Tag>,
    c: Vec<[Point; 3]>,
    vertex: Vec<Point>,
    alpha: Vec<f64>,
}

impl TracedCurve {
    fn with_len(len: usize) -> Self {
        let origin = Point::new(0.0, 0.0);
        Self {
            tag: vec![Tag::Corner; len],
            c: vec![[origin; 3]; len],
            vertex: vec![origin; len],
            alpha: vec![0.0; len],
        }
    }

    const fn len(&self) -> usize {
        self.tag.len()
    }

    /// Convert to the public representation. Starts at the last
    /// segment's end so the curve closes on itself.
    pub(super) fn to_curve(&self) -> Option<Curve> {
        let start = self.c.last()?[2];
        let segments = self
            .tag
            .iter()
            .zip(&self.c)
            .map(|(tag, c)| match tag {
                Tag::Corner => Segment::Corner {
                    control: c[1],
                    end: c[2],
                },
                Tag::CurveTo => Segment::Smooth {
                    control1: c[0],
                    control2: c[1],
                    end: c[2],
                },
            })
            .collect();
        Some(Curve::new(start, segments))
    }
}

fn sign(x: f64) -> i32 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Twice the signed area of triangle `p0 p1 p2`.
fn dpara(p0: Point, p1: Point, p2: Point) -> f64 {
    let (x1, y1) = (p1.x - p0.x, p1.y - p0.y);
    let (x2, y2) = (p2.x - p0.x, p2.y - p0.y);
    x1.mul_add(y2, -(x2 * y1))
}

/// Cross product of `p0→p1` and `p2→p3`.
fn cprod(p0: Point, p1: Point, p2: Point, p3: Point) -> f64 {
    let (x1, y1) = (p1.x - p0.x, p1.y - p0.y);
    let (x2, y2) = (p3.x - p2.x, p3.y - p2.y);
    x1.mul_add(y2, -(x2 * y1))
}

/// Dot product of `p0→p1` and `p0→p2`.
fn iprod(p0: Point, p1: Point, p2: Point) -> f64 {
    let (x1, y1) = (p1.x - p0.x, p1.y - p0.y);
    let (x2, y2) = (p2.x - p0.x, p2.y - p0.y);
    x1.mul_add(x2, y1 * y2)
}

/// Dot product of `p0→p1` and `p2→p3`.
fn iprod1(p0: Point, p1: Point, p2: Point, p3: Point) -> f64 {
    let (x1, y1) = (p1.x - p0.x, p1.y - p0.y);
    let (x2, y2) = (p3.x - p2.x, p3.y - p2.y);
    x1.mul_add(x2, y1 * y2)
}

/// Denominator for the smoothness ratio: distance from `p0` to `p2`
/// in the L-infinity sense, measured orthogonally.
fn ddenom(p0: Point, p2: Point) -> f64 {
    let ry = f64::from(sign(p2.x - p0.x));
    let rx = -f64::from(sign(p2.y - p0.y));
    ry.mul_add(p2.x - p0.x, -(rx * (p2.y - p0.y)))
}

fn bezier(t: f64, p0: Point, p1: Point, p2: Point, p3: Point) -> Point {
    let s = 1.0 - t;
    let a = s * s * s;
    let b = 3.0 * s * s * t;
    let c = 3.0 * t * t * s;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

/// Parameter in [0, 1] where the Bezier `p0..p3` is parallel to
/// `q0→q1`, or `-1` if there is none.
fn tangent(p0: Point, p1: Point, p2: Point, p3: Point, q0: Point, q1: Point) -> f64 {
    let a_ = cprod(p0, p1, q0, q1);
    let b_ = cprod(p1, p2, q0, q1);
    let c_ = cprod(p2, p3, q0, q1);

    let a = a_ - 2.0 * b_ + c_;
    let b = -2.0 * a_ + 2.0 * b_;
    let c = a_;

    let d = b.mul_add(b, -4.0 * a * c);
    if a == 0.0 || d < 0.0 {
        return -1.0;
    }

    let s = d.sqrt();
    let r1 = (-b + s) / (2.0 * a);
    let r2 = (-b - s) / (2.0 * a);
    if (0.0..=1.0).contains(&r1) {
        r1
    } else if (0.0..=1.0).contains(&r2) {
        r2
    } else {
        -1.0
    }
}

/// Classify each polygon vertex and place control points.
pub(super) fn smooth(vertices: &[Point], alpha_max: f64) -> TracedCurve {
    let m = vertices.len();
    let mut curve = TracedCurve::with_len(m);
    curve.vertex = vertices.to_vec();

    for i in 0..m {
        let j = (i + 1) % m;
        let k = (i + 2) % m;
        let (vi, vj, vk) = (vertices[i], vertices[j], vertices[k]);
        let mid = vk.lerp(vj, 0.5);

        let denom = ddenom(vi, vk);
        let mut alpha = if denom == 0.0 {
            4.0 / 3.0
        } else {
            let dd = (dpara(vi, vj, vk) / denom).abs();
            let a = if dd > 1.0 { 1.0 - 1.0 / dd } else { 0.0 };
            a / 0.75
        };

        if alpha >= alpha_max {
            curve.tag[j] = Tag::Corner;
            curve.c[j][1] = vj;
            curve.c[j][2] = mid;
        } else {
            alpha = alpha.clamp(ALPHA_MIN, 1.0);
            curve.tag[j] = Tag::CurveTo;
            curve.c[j][0] = vi.lerp(vj, 0.5 + 0.5 * alpha);
            curve.c[j][1] = vk.lerp(vj, 0.5 + 0.5 * alpha);
            curve.c[j][2] = mid;
        }
        curve.alpha[j] = alpha;
    }

    curve
}

/// A candidate cubic replacing segments `i+1..=j`.
#[derive(Debug, Clone, Copy)]
struct Merge {
    pen: f64,
    c: [Point; 2],
    s: f64,
    alpha: f64,
}

/// Replace runs of smooth segments with single cubics where the result
/// stays within `tolerance` of the original geometry.
pub(super) fn optimize(curve: &TracedCurve, tolerance: f64) -> TracedCurve {
    let m = curve.len();
    if m == 0 {
        return curve.clone();
    }
    let v = &curve.vertex;

    // Convexity: +1 right turn, -1 left turn, 0 corner.
    let convc: Vec<i32> = (0..m)
        .map(|i| match curve.tag[i] {
            Tag::CurveTo => sign(dpara(v[(i + m - 1) % m], v[i], v[(i + 1) % m])),
            Tag::Corner => 0,
        })
        .collect();

    // Cumulative area under the curve, for O(1) area of any run.
    let mut areac = vec![0.0f64; m + 1];
    let mut area = 0.0;
    let p0 = v[0];
    for i in 0..m {
        let i1 = (i + 1) % m;
        if curve.tag[i1] == Tag::CurveTo {
            let alpha = curve.alpha[i1];
            area += 0.3 * alpha * (4.0 - alpha) * dpara(curve.c[i][2], v[i1], curve.c[i1][2]) / 2.0;
            area += dpara(p0, curve.c[i][2], curve.c[i1][2]) / 2.0;
        }
        areac[i + 1] = area;
    }

    let mut pt = vec![0usize; m + 1];
    let mut pen = vec![0.0f64; m + 1];
    let mut len = vec![0usize; m + 1];
    let mut opt: Vec<Option<Merge>> = vec![None; m + 1];

    for j in 1..=m {
        pt[j] = j - 1;
        pen[j] = pen[j - 1];
        len[j] = len[j - 1] + 1;

        for i in (0..j - 1).rev() {
            let Some(o) = opti_penalty(curve, i, j % m, tolerance, &convc, &areac) else {
                break;
            };
            if len[j] > len[i] + 1 || (len[j] == len[i] + 1 && pen[j] > pen[i] + o.pen) {
                pt[j] = i;
                pen[j] = pen[i] + o.pen;
                len[j] = len[i] + 1;
                opt[j] = Some(o);
            }
        }
    }

    let om = len[m];
    let mut out = TracedCurve::with_len(om);
    let mut j = m;
    for i in (0..om).rev() {
        let jm = j % m;
        match opt[j].filter(|_| pt[j] != j - 1) {
            None => {
                out.tag[i] = curve.tag[jm];
                out.c[i] = curve.c[jm];
                out.vertex[i] = curve.vertex[jm];
                out.alpha[i] = curve.alpha[jm];
            }
            Some(o) => {
                out.tag[i] = Tag::CurveTo;
                out.c[i] = [o.c[0], o.c[1], curve.c[jm][2]];
                out.vertex[i] = curve.c[jm][2].lerp(curve.vertex[jm], o.s);
                out.alpha[i] = o.alpha;
            }
        }
        j = pt[j];
    }

    out
}

/// Try to replace segments `i+1..=j` by one cubic. Returns `None` if
/// the run is not mergeable or the fit exceeds `tolerance`.
#[allow(clippy::too_many_lines)]
fn opti_penalty(
    curve: &TracedCurve,
    i: usize,
    j: usize,
    tolerance: f64,
    convc: &[i32],
    areac: &[f64],
) -> Option<Merge> {
    let m = curve.len();
    let v = &curve.vertex;

    if i == j {
        return None;
    }

    // Convex, corner-free, and no turn sharper than 179°.
    let i1 = (i + 1) % m;
    let conv = convc[i1];
    if conv == 0 {
        return None;
    }
    let d = v[i].distance(v[i1]);
    let mut k = i1;
    while k != j {
        let k1 = (k + 1) % m;
        let k2 = (k + 2) % m;
        if convc[k1] != conv {
            return None;
        }
        if sign(cprod(v[i], v[i1], v[k1], v[k2])) != conv {
            return None;
        }
        if iprod1(v[i], v[i1], v[k1], v[k2]) < d * v[k1].distance(v[k2]) * COS179 {
            return None;
        }
        k = k1;
    }

    let p0 = curve.c[i][2];
    let p1 = v[i1];
    let p2 = v[j];
    let p3 = curve.c[j][2];

    let mut area = areac[j] - areac[i];
    area -= dpara(v[0], curve.c[i][2], curve.c[j][2]) / 2.0;
    if i >= j {
        area += areac[m];
    }

    // Intersection o of p0p1 and p2p3: o = lerp(p0, p1, t) = lerp(p3, p2, s).
    let a1 = dpara(p0, p1, p2);
    let a2 = dpara(p0, p1, p3);
    let a3 = dpara(p0, p2, p3);
    let a4 = a1 + a3 - a2;

    if a2 == a1 {
        return None;
    }

    let t = a3 / (a3 - a4);
    let s = a2 / (a2 - a1);
    let a = a2 * t / 2.0;
    if a == 0.0 || !t.is_finite() || !s.is_finite() {
        return None;
    }

    let r = area / a;
    let disc = 4.0 - r / 0.3;
    if disc < 0.0 {
        return None;
    }
    let alpha = 2.0 - disc.sqrt();

    let c0 = p0.lerp(p1, t * alpha);
    let c1 = p3.lerp(p2, s * alpha);
    let mut pen = 0.0;

    // Tangency with each polygon edge in the run.
    let mut k = i1;
    while k != j {
        let k1 = (k + 1) % m;
        let t = tangent(p0, c0, c1, p3, v[k], v[k1]);
        if t < -0.5 {
            return None;
        }
        let pt = bezier(t, p0, c0, c1, p3);
        let d = v[k].distance(v[k1]);
        if d == 0.0 {
            return None;
        }
        let d1 = dpara(v[k], v[k1], pt) / d;
        if d1.abs() > tolerance {
            return None;
        }
        if iprod(v[k], v[k1], pt) < 0.0 || iprod(v[k1], v[k], pt) < 0.0 {
            return None;
        }
        pen += d1 * d1;
        k = k1;
    }

    // Distance from each original segment's bulge.
    let mut k = i;
    while k != j {
        let k1 = (k + 1) % m;
        let (e0, e1) = (curve.c[k][2], curve.c[k1][2]);
        let t = tangent(p0, c0, c1, p3, e0, e1);
        if t < -0.5 {
            return None;
        }
        let pt = bezier(t, p0, c0, c1, p3);
        let d = e0.distance(e1);
        if d == 0.0 {
            return None;
        }
        let mut d1 = dpara(e0, e1, pt) / d;
        let mut d2 = dpara(e0, e1, v[k1]) / d * 0.75 * curve.alpha[k1];
        if d2 < 0.0 {
            d1 = -d1;
            d2 = -d2;
        }
        if d1 < d2 - tolerance {
            return None;
        }
        if d1 < d2 {
            pen += (d1 - d2) * (d1 - d2);
        }
        k = k1;
    }

    Some(Merge {
        pen,
        c: [c0, c1],
        s,
        alpha,
    })
}
