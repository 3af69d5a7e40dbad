//! Mesh differential geometry and tesselation: per-triangle area/normal,
//! area-weighted smooth vertex normals (including neighbor-tile faces),
//! and polygon-with-holes tesselation via `earcutr`.

use crate::diagnostics::Diagnostics;
use crate::error::{GeomError, Result};
use crate::geodesy;
use crate::geometry::{ApproxEq, EcefPoint, EcefVector, Point3, Polygon};

/// Coincident-vertex-coordinate tolerance on ECEF meters, used by the
/// degenerate-triangle check below.
pub const SG_EPSILON: f64 = 1e-9;

/// Approximate spherical-triangle area on the WGS84 mean-radius sphere,
/// using the geodetic (not ECEF) vertices. Adequate at single-triangle
/// scale; not a replacement for a true geodesic area computation over
/// large regions (Non-goals).
pub fn triangle_area_m2(g1: Point3, g2: Point3, g3: Point3) -> f64 {
    let p1 = geodesy::geod_to_ecef(g1);
    let p2 = geodesy::geod_to_ecef(g2);
    let p3 = geodesy::geod_to_ecef(g3);
    0.5 * (p2 - p1).cross(&(p3 - p1)).norm()
}

/// Flat face normal for triangle (v1, v2, v3) in ECEF Cartesian.
///
/// Degenerate slivers — area below `1e-12` or any two vertices coincident
/// within [`SG_EPSILON`] on any axis — fall back to the "up" normal at
/// `v1`, biasing toward the local ellipsoidal radial rather than an
/// arbitrary or NaN direction.
pub fn face_normal(v1: EcefPoint, v2: EcefPoint, v3: EcefPoint) -> EcefVector {
    let e1 = v2 - v1;
    let e2 = v3 - v1;
    let cross = e1.cross(&e2);
    let area2 = cross.norm();

    let degenerate = area2 < 2.0 * 1e-12
        || coincident_axis(v1, v2)
        || coincident_axis(v2, v3)
        || coincident_axis(v1, v3);

    if degenerate {
        geodesy::ecef_up(v1)
    } else {
        cross / area2
    }
}

fn coincident_axis(a: EcefPoint, b: EcefPoint) -> bool {
    (a.x - b.x).abs() < SG_EPSILON && (a.y - b.y).abs() < SG_EPSILON && (a.z - b.z).abs() < SG_EPSILON
}

/// Accumulates area-weighted face normal contributions per node index
/// across a stage-3 node set, including faces contributed by neighboring
/// tiles via the shared-edge database — the caller simply calls
/// [`VertexNormalAccumulator::add_face`] once per incident face regardless
/// of which tile computed it.
#[derive(Debug, Default)]
pub struct VertexNormalAccumulator {
    sums: Vec<EcefVector>,
    weights: Vec<f64>,
}

impl VertexNormalAccumulator {
    pub fn new(node_count: usize) -> Self {
        Self {
            sums: vec![EcefVector::zeros(); node_count],
            weights: vec![0.0; node_count],
        }
    }

    /// Adds one face's contribution to each of its three incident nodes.
    pub fn add_face(&mut self, node_indices: [usize; 3], area_m2: f64, normal: EcefVector) {
        for &idx in &node_indices {
            self.add_single(idx, area_m2, normal);
        }
    }

    /// Adds one face's contribution to a single node. Used for faces
    /// contributed by a neighboring tile across a shared edge, where only
    /// the shared vertex's index in *this* tile's node set is known — the
    /// neighbor face's other two vertices belong to the neighbor's own
    /// node set and are accumulated there instead.
    pub fn add_single(&mut self, idx: usize, area_m2: f64, normal: EcefVector) {
        self.sums[idx] += normal * area_m2;
        self.weights[idx] += area_m2;
    }

    /// Finalizes every node's normal: the area-weighted mean, normalized,
    /// falling back to the ECEF "up" direction at `fallback_positions[i]`
    /// for any node with zero incident area (an isolated vertex).
    pub fn finalize(self, fallback_positions: &[EcefPoint], diagnostics: &dyn Diagnostics) -> Vec<EcefVector> {
        let n = self.sums.len();
        let mut out = Vec::with_capacity(n);
        let one_percent = (n / 100).max(1);

        for i in 0..n {
            if self.weights[i] > 0.0 {
                let mean = self.sums[i] / self.weights[i];
                let norm = mean.norm();
                out.push(if norm > SG_EPSILON { mean / norm } else { geodesy::ecef_up(fallback_positions[i]) });
            } else {
                out.push(geodesy::ecef_up(fallback_positions[i]));
            }
            if i % one_percent == 0 {
                diagnostics.debug(&format!("vertex normals: {}% complete", (i * 100) / n.max(1)));
            }
        }
        out
    }
}

/// Tesselates a polygon-with-holes into triangles via `earcutr`. Returns
/// triangle index triples into a flattened vertex list where index 0 is
/// the outer ring's first vertex and hole vertices follow in ring order
/// (the same layout `earcutr::earcut`'s `hole_indices` parameter expects).
pub fn tesselate(polygon: &Polygon) -> Result<(Vec<[f64; 2]>, Vec<[usize; 3]>)> {
    let Some(outer) = polygon.outer() else {
        return Err(GeomError::InputMalformed("tesselate: polygon has no outer contour".into()));
    };
    if outer.points.len() < 3 {
        return Err(GeomError::InputMalformed("tesselate: outer contour has fewer than 3 vertices".into()));
    }

    let mut flat: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();
    let mut vertex_count = 0usize;

    for p in &outer.points {
        flat.push(p.lon);
        flat.push(p.lat);
        vertex_count += 1;
    }
    for hole in polygon.holes() {
        hole_indices.push(vertex_count);
        for p in &hole.points {
            flat.push(p.lon);
            flat.push(p.lat);
            vertex_count += 1;
        }
    }

    let triangles = earcutr::earcut(&flat, &hole_indices, 2)
        .map_err(|e| GeomError::NumericalDegenerate(format!("earcut failed: {e:?}")))?;

    if triangles.is_empty() {
        return Err(GeomError::NumericalDegenerate("tesselate: earcut produced zero triangles".into()));
    }

    let vertices: Vec<[f64; 2]> = flat.chunks(2).map(|c| [c[0], c[1]]).collect();
    let tris: Vec<[usize; 3]> = triangles.chunks(3).map(|c| [c[0], c[1], c[2]]).collect();
    Ok((vertices, tris))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullDiagnostics;
    use crate::geometry::{Contour, Point2, TexMethod};

    #[test]
    fn test_triangle_area_is_positive_for_nondegenerate_triangle() {
        let g1 = Point3::new(-122.0, 47.0, 0.0);
        let g2 = Point3::new(-122.001, 47.0, 0.0);
        let g3 = Point3::new(-122.0, 47.001, 0.0);
        let area = triangle_area_m2(g1, g2, g3);
        assert!(area > 0.0);
    }

    #[test]
    fn test_face_normal_degenerate_falls_back_to_up() {
        let v = geodesy::geod_to_ecef(Point3::new(10.0, 20.0, 0.0));
        // all three vertices identical: zero area, must fall back
        let normal = face_normal(v, v, v);
        let up = geodesy::ecef_up(v);
        assert!(normal.approx_eq(&up));
    }

    #[test]
    fn test_face_normal_nondegenerate_is_unit_length() {
        let g1 = geodesy::geod_to_ecef(Point3::new(-122.0, 47.0, 0.0));
        let g2 = geodesy::geod_to_ecef(Point3::new(-121.999, 47.0, 0.0));
        let g3 = geodesy::geod_to_ecef(Point3::new(-122.0, 47.001, 0.0));
        let normal = face_normal(g1, g2, g3);
        assert!((normal.norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_vertex_normal_accumulator_averages_two_faces() {
        let v0 = geodesy::geod_to_ecef(Point3::new(0.0, 0.0, 0.0));
        let mut acc = VertexNormalAccumulator::new(1);
        let up = geodesy::ecef_up(v0);
        acc.add_face([0, 0, 0], 10.0, up);
        acc.add_face([0, 0, 0], 5.0, up);
        let diag = NullDiagnostics;
        let normals = acc.finalize(&[v0], &diag);
        assert!(normals[0].approx_eq(&up));
    }

    #[test]
    fn test_tesselate_square_produces_two_triangles() {
        let p = Polygon::new(
            Contour::new(
                vec![
                    Point2::new(0.0, 0.0),
                    Point2::new(1.0, 0.0),
                    Point2::new(1.0, 1.0),
                    Point2::new(0.0, 1.0),
                ],
                false,
            ),
            TexMethod::ByLandClass,
        );
        let (vertices, tris) = tesselate(&p).expect("square should tesselate");
        assert_eq!(vertices.len(), 4);
        assert_eq!(tris.len(), 2);
    }

    #[test]
    fn test_tesselate_rejects_degenerate_outer() {
        let p = Polygon::new(Contour::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)], false), TexMethod::ByLandClass);
        assert!(tesselate(&p).is_err());
    }
}
