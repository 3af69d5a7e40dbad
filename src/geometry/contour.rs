//! [`Contour`] and [`Polygon`]: the ring and outer+holes aggregate that
//! flow through cleanup, clipping and tesselation.

use super::primitives::Point2;
use super::utils_2d;
use serde::{Deserialize, Serialize};

/// How a finished [`Polygon`]'s texture coordinates should be computed in
/// the mesh stage (§4.8 step 20).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TexMethod {
    /// Pavement: textured from a geodetic reference point and a heading.
    ByRefAndHeading,
    /// Terrain: textured from the land-class table.
    ByLandClass,
}

/// An ordered closed ring of vertices. The first and last vertex are never
/// duplicated in storage — closure is implicit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<Point2>,
    pub hole: bool,
}

impl Contour {
    pub fn new(points: Vec<Point2>, hole: bool) -> Self {
        Self { points, hole }
    }

    pub fn is_empty_or_degenerate(&self) -> bool {
        self.points.len() < 3 || self.signed_area().abs() < f64::EPSILON
    }

    fn as_raw(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.lon, p.lat]).collect()
    }

    pub fn signed_area(&self) -> f64 {
        utils_2d::polygon_signed_area(&self.as_raw())
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Ensures the ring winds counter-clockwise (outer) or clockwise
    /// (hole), matching the orientation convention most polygon clippers
    /// (including `geo`'s) expect.
    pub fn ensure_orientation(&mut self, ccw: bool) {
        let is_ccw = self.signed_area() > 0.0;
        if is_ccw != ccw {
            self.points.reverse();
        }
    }

    pub fn centroid(&self) -> Point2 {
        let [x, y] = utils_2d::polygon_centroid(&self.as_raw());
        Point2::new(x, y)
    }

    /// Every edge length ≤ `max_deg` (in the locally-planar degree frame);
    /// callers needing a metric threshold convert via the geodesy module
    /// first. See [`crate::clipper::split_long_edges`] for the
    /// great-circle-aware entry point used by the rest of the crate.
    pub fn split_long_edges(&self, max_deg: f64) -> Contour {
        if self.points.is_empty() {
            return self.clone();
        }
        let mut out = Vec::new();
        let n = self.points.len();
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            out.push(a);
            let len = a.planar_distance(&b);
            if len > max_deg {
                let segments = (len / max_deg).ceil() as usize;
                for k in 1..segments {
                    let t = k as f64 / segments as f64;
                    out.push(a.lerp(&b, t));
                }
            }
        }
        Contour::new(out, self.hole)
    }
}

/// Outer contour plus zero or more hole contours, annotated with a
/// texturing method. `contours[0]` is always the outer ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    pub contours: Vec<Contour>,
    pub tex_method: TexMethod,
    /// Resolved surface material name (set once a [`crate::closedpoly`]
    /// superpoly is built); `None` for a bare clip result.
    pub material: Option<String>,
    /// Tile-construct stage-2 step 13 flattens any polygon carrying this
    /// flag to a single elevation rather than interpolating the grid
    /// (and later skips it in the stage-3 boundary-averaging pass).
    pub fixed_elevation: bool,
}

impl Polygon {
    pub fn new(outer: Contour, tex_method: TexMethod) -> Self {
        debug_assert!(!outer.hole, "outer contour must not be flagged as a hole");
        Self {
            contours: vec![outer],
            tex_method,
            material: None,
            fixed_elevation: false,
        }
    }

    pub fn empty(tex_method: TexMethod) -> Self {
        Self {
            contours: Vec::new(),
            tex_method,
            material: None,
            fixed_elevation: false,
        }
    }

    pub fn with_fixed_elevation(mut self, fixed: bool) -> Self {
        self.fixed_elevation = fixed;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn outer(&self) -> Option<&Contour> {
        self.contours.first()
    }

    pub fn holes(&self) -> &[Contour] {
        if self.contours.len() > 1 {
            &self.contours[1..]
        } else {
            &[]
        }
    }

    pub fn add_hole(&mut self, mut hole: Contour) {
        hole.hole = true;
        self.contours.push(hole);
    }

    pub fn area(&self) -> f64 {
        let outer = self.outer().map(Contour::area).unwrap_or(0.0);
        let holes: f64 = self.holes().iter().map(Contour::area).sum();
        (outer - holes).max(0.0)
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }
}
