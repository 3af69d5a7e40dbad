//! Three idempotent cleanup passes, always applied in this order before
//! clipping and before tesselation.

use crate::diagnostics::Diagnostics;
use crate::geodesy::{self, TangentPlane};
use crate::geometry::{Contour, Point2, Polygon};

/// Max distance between consecutive vertices before they're considered
/// duplicates and collapsed.
pub const DUPLICATE_EPS_M: f64 = 0.01;

/// Area threshold (square meters) below which the middle vertex of three
/// consecutive points is considered collinear and removed. The original
/// quoted `1e-12` in squared-degree units; §9 Design Notes directs
/// converting that to a metric threshold via local scale, fixed here at
/// `1e-4 m²` as the note suggests.
pub const COLLINEAR_AREA_EPS_M2: f64 = 1e-4;

/// Runs all three passes over a polygon and its holes, in order:
/// remove bad contours, remove duplicate vertices, reduce collinear runs.
pub fn clean_polygon(polygon: &Polygon, diagnostics: &dyn Diagnostics) -> Polygon {
    let mut out = polygon.clone();
    remove_bad_contours(&mut out, diagnostics);
    for c in &mut out.contours {
        remove_duplicate_vertices(c);
    }
    remove_bad_contours(&mut out, diagnostics);
    for c in &mut out.contours {
        reduce_collinear_degeneracy(c);
    }
    remove_bad_contours(&mut out, diagnostics);
    out
}

/// Drops contours with fewer than three distinct vertices or zero signed
/// area.
pub fn remove_bad_contours(polygon: &mut Polygon, diagnostics: &dyn Diagnostics) {
    let before = polygon.contours.len();
    polygon.contours.retain(|c| !c.is_empty_or_degenerate());
    let removed = before - polygon.contours.len();
    if removed > 0 {
        diagnostics.debug(&format!("remove_bad_contours: dropped {removed} degenerate contour(s)"));
    }
}

/// Collapses consecutive vertices within [`DUPLICATE_EPS_M`] of each
/// other (great-circle distance).
pub fn remove_duplicate_vertices(contour: &mut Contour) {
    if contour.points.len() < 2 {
        return;
    }
    let mut out: Vec<Point2> = Vec::with_capacity(contour.points.len());
    for &p in &contour.points {
        if let Some(&last) = out.last() {
            if geodesy::distance_m(last, p) <= DUPLICATE_EPS_M {
                continue;
            }
        }
        out.push(p);
    }
    // Closure check: drop a trailing vertex that duplicates the first.
    if out.len() > 1 && geodesy::distance_m(out[0], *out.last().unwrap()) <= DUPLICATE_EPS_M {
        out.pop();
    }
    contour.points = out;
}

/// Removes the middle vertex of any consecutive triple whose triangle
/// area (in local tangent-plane square meters) is below
/// [`COLLINEAR_AREA_EPS_M2`].
pub fn reduce_collinear_degeneracy(contour: &mut Contour) {
    if contour.points.len() < 3 {
        return;
    }
    let centroid = contour.centroid();
    let plane = TangentPlane::new(centroid);

    loop {
        let n = contour.points.len();
        if n < 4 {
            // a triangle can't be reduced any further without destroying it
            break;
        }
        let mut removed_any = false;
        let mut i = 0;
        while i < contour.points.len() {
            let n = contour.points.len();
            if n < 4 {
                break;
            }
            let prev = contour.points[(i + n - 1) % n];
            let cur = contour.points[i];
            let next = contour.points[(i + 1) % n];

            let (ax, ay) = plane.to_local_m(prev);
            let (bx, by) = plane.to_local_m(cur);
            let (cx, cy) = plane.to_local_m(next);

            let area2 = ((bx - ax) * (cy - ay) - (cx - ax) * (by - ay)).abs();
            if area2 < 2.0 * COLLINEAR_AREA_EPS_M2 {
                contour.points.remove(i);
                removed_any = true;
            } else {
                i += 1;
            }
        }
        if !removed_any {
            break;
        }
    }
}
