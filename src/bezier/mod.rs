//! Bezier graph and flattener.
//!
//! A [`BezContour`] is the raw client-authored boundary (straight
//! segments mixed with quadratic/cubic curves); [`flatten`] reduces it to
//! a plain [`Contour`] of polyline vertices at a fixed subdivision
//! density, the way `ConvertContour` does in the original airport
//! composer.

use crate::geometry::{Contour, Point2};
use serde::{Deserialize, Serialize};

/// Fixed number of polyline samples emitted per curved join.
pub const BEZIER_DETAIL: usize = 8;

/// A single vertex of a [`BezContour`]. `next_cp` is the outgoing control
/// point (used to curve the join to the *next* node); `prev_cp` is the
/// incoming control point (used to curve the join *from* the previous
/// node).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BezNode {
    pub pt: Point2,
    pub next_cp: Option<Point2>,
    pub prev_cp: Option<Point2>,
}

impl BezNode {
    pub fn linear(pt: Point2) -> Self {
        Self { pt, next_cp: None, prev_cp: None }
    }

    pub fn is_finite(&self) -> bool {
        self.pt.is_finite()
            && self.next_cp.map_or(true, |c| c.is_finite())
            && self.prev_cp.map_or(true, |c| c.is_finite())
    }
}

/// An ordered closed sequence of [`BezNode`]s, consumed once by
/// [`flatten`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BezContour {
    pub nodes: Vec<BezNode>,
}

impl BezContour {
    pub fn new(nodes: Vec<BezNode>) -> Self {
        Self { nodes }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinKind {
    Linear,
    Quadratic,
    Cubic,
}

fn classify(next_cp_present: bool, prev_cp_present: bool) -> JoinKind {
    match (next_cp_present, prev_cp_present) {
        (false, false) => JoinKind::Linear,
        (true, false) | (false, true) => JoinKind::Quadratic,
        (true, true) => JoinKind::Cubic,
    }
}

fn lerp(a: Point2, b: Point2, t: f64) -> Point2 {
    a.lerp(&b, t)
}

fn de_casteljau_quadratic(p0: Point2, p1: Point2, p2: Point2, t: f64) -> Point2 {
    lerp(lerp(p0, p1, t), lerp(p1, p2, t), t)
}

fn de_casteljau_cubic(p0: Point2, p1: Point2, p2: Point2, p3: Point2, t: f64) -> Point2 {
    let a = lerp(p0, p1, t);
    let b = lerp(p1, p2, t);
    let c = lerp(p2, p3, t);
    lerp(lerp(a, b, t), lerp(b, c, t), t)
}

/// Flattens a closed [`BezContour`] of size N into a [`Contour`] at fixed
/// subdivision density [`BEZIER_DETAIL`].
///
/// For a linear join only the anchor is emitted; the next anchor is always
/// produced by the following iteration, which is what guarantees exact
/// closure of the ring.
pub fn flatten(bc: &BezContour, hole: bool) -> Contour {
    let n = bc.nodes.len();
    let mut out = Vec::new();
    if n == 0 {
        return Contour::new(out, hole);
    }

    for i in 0..n {
        let cur = bc.nodes[i];
        let next = bc.nodes[(i + 1) % n];

        match classify(cur.next_cp.is_some(), next.prev_cp.is_some()) {
            JoinKind::Linear => {
                out.push(cur.pt);
            }
            JoinKind::Quadratic => {
                let ctrl = cur.next_cp.or(next.prev_cp).expect("classify guarantees one cp present");
                for k in 0..BEZIER_DETAIL {
                    let t = k as f64 / BEZIER_DETAIL as f64;
                    out.push(de_casteljau_quadratic(cur.pt, ctrl, next.pt, t));
                }
            }
            JoinKind::Cubic => {
                let c1 = cur.next_cp.expect("cubic join requires next_cp");
                let c2 = next.prev_cp.expect("cubic join requires prev_cp");
                for k in 0..BEZIER_DETAIL {
                    let t = k as f64 / BEZIER_DETAIL as f64;
                    out.push(de_casteljau_cubic(cur.pt, c1, c2, next.pt, t));
                }
            }
        }
    }

    Contour::new(out, hole)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_linear_returns_input_anchors() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let bc = BezContour::new(pts.iter().map(|p| BezNode::linear(*p)).collect());
        let flattened = flatten(&bc, false);
        assert_eq!(flattened.points.len(), 4);
        for (a, b) in flattened.points.iter().zip(pts.iter()) {
            assert!((a.lon - b.lon).abs() < 1e-12 && (a.lat - b.lat).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cubic_semicircle_has_expected_vertex_count_and_radius() {
        // Two-node closed contour approximating a unit circle via cubic
        // control points (the standard 4-point-per-quadrant kappa constant
        // adapted to a 2-node / 2-curve circle for this smoke test).
        let k = 1.333_333_333_333; // approximate control-point reach for a 2-segment circle
        let top = Point2::new(0.0, 1.0);
        let bottom = Point2::new(0.0, -1.0);

        let top_next_cp = Point2::new(k, 1.0);
        let bottom_prev_cp = Point2::new(k, -1.0);
        let bottom_next_cp = Point2::new(-k, -1.0);
        let top_prev_cp = Point2::new(-k, 1.0);

        let bc = BezContour::new(vec![
            BezNode { pt: top, next_cp: Some(top_next_cp), prev_cp: Some(top_prev_cp) },
            BezNode { pt: bottom, next_cp: Some(bottom_next_cp), prev_cp: Some(bottom_prev_cp) },
        ]);

        let flattened = flatten(&bc, false);
        assert_eq!(flattened.points.len(), BEZIER_DETAIL * 2);

        // Not a perfect circle (2-segment cubic approximation), but every
        // sample should be in the right ballpark rather than wildly off.
        for p in &flattened.points {
            let r = (p.lon * p.lon + p.lat * p.lat).sqrt();
            assert!(r > 0.5 && r < 1.6, "radius out of range: {r}");
        }
    }

    #[test]
    fn test_quadratic_join_interpolates_toward_control_point() {
        let a = BezNode { pt: Point2::new(0.0, 0.0), next_cp: Some(Point2::new(0.5, 1.0)), prev_cp: None };
        let b = BezNode::linear(Point2::new(1.0, 0.0));
        let bc = BezContour::new(vec![a, b]);
        let flattened = flatten(&bc, false);
        // First sample (t=0) should be the anchor itself.
        assert!((flattened.points[0].lon - 0.0).abs() < 1e-9);
        assert!((flattened.points[0].lat - 0.0).abs() < 1e-9);
        // Mid curve should bulge toward the control point (positive lat).
        let mid = flattened.points[BEZIER_DETAIL / 2];
        assert!(mid.lat > 0.0);
    }
}
