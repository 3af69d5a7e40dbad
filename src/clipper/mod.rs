//! Clipper front-end.
//!
//! Wraps a 2D polygon Boolean library behind a thin adapter so the rest of
//! the crate never touches `geo` types directly. All coordinates are
//! snapped to a fixed grid before the underlying library sees them and
//! unsnapped on the way out — this plays the role the original's
//! integer-coordinate Clipper library filled, and the grid/rounding choice
//! is a one-time contract (see `DESIGN.md`): **`GRID_UNITS_PER_DEGREE =
//! 1e8`**, i.e. one grid unit is ≈1.1 mm at the equator, rounded
//! half-to-even.

use crate::diagnostics::Diagnostics;
use crate::geodesy;
use crate::geometry::{Contour, Point2, Polygon, TexMethod};
use geo::BooleanOps;

/// Grid units per degree of longitude/latitude. One unit is ≤ 1 mm at the
/// equator, satisfying the contract in §4.4/§9.
pub const GRID_UNITS_PER_DEGREE: f64 = 1.0e8;

fn quantize(v: f64) -> f64 {
    // Half-to-even (banker's rounding) at the grid resolution.
    let scaled = v * GRID_UNITS_PER_DEGREE;
    let rounded = round_half_to_even(scaled);
    rounded / GRID_UNITS_PER_DEGREE
}

fn round_half_to_even(x: f64) -> f64 {
    let floor = x.floor();
    let diff = x - floor;
    if (diff - 0.5).abs() < 1e-9 {
        if (floor as i64) % 2 == 0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        x.round()
    }
}

fn quantize_point(p: Point2) -> Point2 {
    Point2::new(quantize(p.lon), quantize(p.lat))
}

fn contour_to_geo_ring(c: &Contour) -> geo::LineString<f64> {
    let mut coords: Vec<geo::Coord<f64>> = c
        .points
        .iter()
        .map(|p| {
            let q = quantize_point(*p);
            geo::Coord { x: q.lon, y: q.lat }
        })
        .collect();
    if let Some(first) = coords.first().copied() {
        coords.push(first);
    }
    geo::LineString::new(coords)
}

fn polygon_to_geo(p: &Polygon) -> Option<geo::Polygon<f64>> {
    let outer = p.outer()?;
    if outer.is_empty_or_degenerate() {
        return None;
    }
    let exterior = contour_to_geo_ring(outer);
    let interiors: Vec<geo::LineString<f64>> = p.holes().iter().map(contour_to_geo_ring).collect();
    Some(geo::Polygon::new(exterior, interiors))
}

fn geo_ring_to_contour(ls: &geo::LineString<f64>, hole: bool) -> Contour {
    let mut pts: Vec<Point2> = ls.coords().map(|c| Point2::new(c.x, c.y)).collect();
    // geo rings are closed (first == last); our Contour storage is not.
    if pts.len() > 1 && pts.first().map(|a| a.approx_eq_degish(pts.last().unwrap())).unwrap_or(false) {
        pts.pop();
    }
    Contour::new(pts, hole)
}

fn geo_polygon_to_polygon(gp: &geo::Polygon<f64>, tex_method: TexMethod) -> Polygon {
    let mut poly = Polygon::new(geo_ring_to_contour(gp.exterior(), false), tex_method);
    for interior in gp.interiors() {
        poly.add_hole(geo_ring_to_contour(interior, true));
    }
    poly
}

fn multi_to_polygons(mp: &geo::MultiPolygon<f64>, tex_method: TexMethod) -> Vec<Polygon> {
    mp.0.iter()
        .map(|gp| geo_polygon_to_polygon(gp, tex_method))
        .filter(|p| p.outer().map_or(false, |o| !o.is_empty_or_degenerate()))
        .collect()
}

fn as_multi(p: &Polygon) -> geo::MultiPolygon<f64> {
    match polygon_to_geo(p) {
        Some(gp) => geo::MultiPolygon(vec![gp]),
        None => geo::MultiPolygon(vec![]),
    }
}

/// Union of two polygons. Empty operands yield the other operand
/// untouched (an empty-operand union is the identity).
pub fn union(a: &Polygon, b: &Polygon) -> Vec<Polygon> {
    if a.is_empty() {
        return vec![b.clone()];
    }
    if b.is_empty() {
        return vec![a.clone()];
    }
    let ma = as_multi(a);
    let mb = as_multi(b);
    multi_to_polygons(&ma.union(&mb), a.tex_method)
}

/// Difference `a - b`. Empty `a` or a `b` that fully covers `a` both yield
/// an empty result.
pub fn difference(a: &Polygon, b: &Polygon) -> Vec<Polygon> {
    if a.is_empty() || b.is_empty() {
        return if a.is_empty() { vec![] } else { vec![a.clone()] };
    }
    let ma = as_multi(a);
    let mb = as_multi(b);
    multi_to_polygons(&ma.difference(&mb), a.tex_method)
}

/// Intersection of two polygons. Either operand empty yields empty.
pub fn intersection(a: &Polygon, b: &Polygon) -> Vec<Polygon> {
    if a.is_empty() || b.is_empty() {
        return vec![];
    }
    let ma = as_multi(a);
    let mb = as_multi(b);
    multi_to_polygons(&ma.intersection(&mb), a.tex_method)
}

/// Union of many polygons in one pass, folding left to right. Used by
/// `ClosedPoly::finish` to grow the airport-feature accumulator.
pub fn union_all(polygons: &[Polygon]) -> Vec<Polygon> {
    let mut acc: Vec<Polygon> = Vec::new();
    for p in polygons {
        if acc.is_empty() {
            acc = vec![p.clone()];
            continue;
        }
        let mut next = Vec::new();
        for a in &acc {
            next.extend(union(a, p));
        }
        acc = next;
    }
    acc
}

/// Number of disc samples used per convex corner when expanding a contour.
/// Grounded on the same fixed-sample-count circle discretization the
/// teacher's geometry utilities use.
const EXPAND_DISC_SAMPLES: usize = 12;

/// Offsets every contour of `polygon` outward by `meters` via a Minkowski
/// sum with a disc approximation: each edge is offset by its perpendicular,
/// and convex corners are filled with a fan of disc samples, then the
/// resulting (possibly self-overlapping) fans are unioned together.
///
/// A zero-area polygon expands to empty, matching the edge case in §4.4.
pub fn expand(polygon: &Polygon, meters: f64, diagnostics: &dyn Diagnostics) -> Polygon {
    let Some(outer) = polygon.outer() else {
        return Polygon::empty(polygon.tex_method);
    };
    if outer.area() < 1e-18 {
        diagnostics.warn("expand: zero-area polygon, returning empty");
        return Polygon::empty(polygon.tex_method);
    }

    let centroid = outer.centroid();
    let plane = geodesy::TangentPlane::new(centroid);

    let mut pieces: Vec<Polygon> = Vec::new();
    for contour in &polygon.contours {
        pieces.push(expand_contour(contour, meters, &plane));
    }

    let merged = union_all(&pieces);
    merged
        .into_iter()
        .max_by(|a, b| a.area().partial_cmp(&b.area()).unwrap())
        .unwrap_or_else(|| Polygon::empty(polygon.tex_method))
}

fn expand_contour(contour: &Contour, meters: f64, plane: &geodesy::TangentPlane) -> Polygon {
    use crate::geometry::utils_2d::{discretize_circle, polygon_signed_area};

    let local: Vec<[f64; 2]> = contour.points.iter().map(|p| {
        let (e, n) = plane.to_local_m(*p);
        [e, n]
    }).collect();

    let mut fans: Vec<Vec<[f64; 2]>> = Vec::new();
    let n = local.len();
    for i in 0..n {
        let p = local[i];
        fans.push(discretize_circle(p, meters.abs(), EXPAND_DISC_SAMPLES));
    }

    // Also push each offset edge as a thin rectangle so the union fills
    // between disc fans even when corners are far apart.
    let mut quads: Vec<Vec<[f64; 2]>> = Vec::new();
    for i in 0..n {
        let a = local[i];
        let b = local[(i + 1) % n];
        let dx = b[0] - a[0];
        let dy = b[1] - a[1];
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1e-9 {
            continue;
        }
        let nx = -dy / len * meters;
        let ny = dx / len * meters;
        quads.push(vec![
            [a[0] + nx, a[1] + ny],
            [b[0] + nx, b[1] + ny],
            [b[0] - nx, b[1] - ny],
            [a[0] - nx, a[1] - ny],
        ]);
    }

    let to_polygon = |raw: Vec<[f64; 2]>| -> Polygon {
        let pts: Vec<Point2> = raw.iter().map(|[x, y]| plane.from_local_m(*x, *y)).collect();
        let mut c = Contour::new(pts, false);
        if c.signed_area() < 0.0 {
            c.points.reverse();
        }
        Polygon::new(c, TexMethod::ByLandClass)
    };

    let mut all = Vec::new();
    for fan in fans {
        if polygon_signed_area(&fan).abs() > 1e-12 {
            all.push(to_polygon(fan));
        }
    }
    for quad in quads {
        all.push(to_polygon(quad));
    }

    union_all(&all).into_iter().max_by(|a, b| a.area().partial_cmp(&b.area()).unwrap()).unwrap_or_else(|| Polygon::empty(TexMethod::ByLandClass))
}

/// Splits every edge longer than `max_m` (great-circle distance) by
/// inserting interpolated vertices, used for the airport superpoly's 400 m
/// cap before tesselation.
pub fn split_long_edges(polygon: &Polygon, max_m: f64) -> Polygon {
    let mut out = polygon.clone();
    for contour in &mut out.contours {
        *contour = split_contour_long_edges(contour, max_m);
    }
    out
}

fn split_contour_long_edges(contour: &Contour, max_m: f64) -> Contour {
    if contour.points.is_empty() {
        return contour.clone();
    }
    let n = contour.points.len();
    let mut out = Vec::new();
    for i in 0..n {
        let a = contour.points[i];
        let b = contour.points[(i + 1) % n];
        out.push(a);
        let (course, _, dist) = geodesy::inverse(a, b);
        if dist > max_m {
            let segments = (dist / max_m).ceil() as usize;
            for k in 1..segments {
                let step_m = dist * (k as f64 / segments as f64);
                let (p, _) = geodesy::direct(a, course, step_m);
                out.push(p);
            }
        }
    }
    Contour::new(out, contour.hole)
}

impl Point2 {
    fn approx_eq_degish(&self, other: &Point2) -> bool {
        (self.lon - other.lon).abs() < 1e-12 && (self.lat - other.lat).abs() < 1e-12
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullDiagnostics;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(
            Contour::new(
                vec![
                    Point2::new(x0, y0),
                    Point2::new(x1, y0),
                    Point2::new(x1, y1),
                    Point2::new(x0, y1),
                ],
                false,
            ),
            TexMethod::ByLandClass,
        )
    }

    #[test]
    fn test_union_of_overlapping_squares() {
        let a = square(0.0, 0.0, 1.0, 1.0);
        let b = square(0.5, 0.5, 1.5, 1.5);
        let result = union(&a, &b);
        assert_eq!(result.len(), 1);
        assert!(result[0].area() > a.area());
    }

    #[test]
    fn test_difference_self_is_empty() {
        let a = square(0.0, 0.0, 1.0, 1.0);
        let result = difference(&a, &a);
        assert!(result.is_empty() || result.iter().all(|p| p.area() < 1e-9));
    }

    #[test]
    fn test_intersection_of_disjoint_is_empty() {
        let a = square(0.0, 0.0, 1.0, 1.0);
        let b = square(5.0, 5.0, 6.0, 6.0);
        assert!(intersection(&a, &b).is_empty());
    }

    #[test]
    fn test_split_long_edges_caps_edge_length() {
        let p = square(0.0, 0.0, 0.01, 0.01); // roughly 1.1 km edges
        let split = split_long_edges(&p, 400.0);
        let outer = split.outer().unwrap();
        let n = outer.points.len();
        for i in 0..n {
            let a = outer.points[i];
            let b = outer.points[(i + 1) % n];
            let (_, _, dist) = geodesy::inverse(a, b);
            assert!(dist <= 400.0 + 1e-6, "edge too long: {dist}");
        }
    }

    #[test]
    fn test_expand_zero_area_is_empty() {
        let degenerate = Polygon::new(Contour::new(vec![Point2::new(0.0, 0.0), Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)], false), TexMethod::ByLandClass);
        let diag = NullDiagnostics;
        let expanded = expand(&degenerate, 20.0, &diag);
        assert!(expanded.is_empty() || expanded.area() < 1e-6);
    }

    #[test]
    fn test_expand_grows_area() {
        let a = square(0.0, 0.0, 0.001, 0.001);
        let diag = NullDiagnostics;
        let expanded = expand(&a, 20.0, &diag);
        assert!(expanded.area() > a.area());
    }
}
