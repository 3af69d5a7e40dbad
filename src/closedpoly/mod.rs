//! Closed polygon composer: accumulates a boundary plus holes from
//! Bezier-noded client input, flattens and cleans them, and produces
//! either a textured pavement superpoly or a plain user-border base.

use crate::bezier::{self, BezContour, BezNode};
use crate::clipper;
use crate::diagnostics::Diagnostics;
use crate::error::{GeomError, Result};
use crate::geometry::{Contour, Point2, Polygon, TexMethod};
use serde::{Deserialize, Serialize};

/// Distinguishes the two constructors of the original two-constructor
/// `ClosedPoly` class: a textured pavement feature carries surface
/// metadata the plain border case never needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClosedKind {
    Pavement {
        surface_type: i32,
        smoothness: f32,
        texture_heading: f64,
    },
    Boundary,
}

/// A single labelled mirror contour traced alongside a pavement poly's
/// boundary and holes (painted markings, edge lighting, etc). Supplemented
/// from the original source's `LinearFeature`; the spec's distillation
/// dropped this detail but it is cheap to carry and several downstream
/// consumers in the original expect it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearFeature {
    pub description: String,
    pub width: f64,
    pub nodes: Vec<BezNode>,
}

impl LinearFeature {
    fn new(description: String, width: f64) -> Self {
        Self { description, width, nodes: Vec::new() }
    }

    fn add_node(&mut self, node: BezNode) {
        self.nodes.push(node);
    }

    fn finish(&self) -> Contour {
        bezier::flatten(&BezContour::new(self.nodes.clone()), false)
    }
}

/// Accumulates one closed polygon's worth of client input: a boundary
/// contour, zero or more hole contours, and (for pavement polys) the
/// linear features traced along each contour's edge.
pub struct ClosedPoly {
    pub description: String,
    pub kind: ClosedKind,

    boundary: Option<BezContour>,
    holes: Vec<BezContour>,
    cur_contour: Option<Vec<BezNode>>,

    features: Vec<LinearFeature>,
    cur_feature: Option<LinearFeature>,

    hull: Option<Contour>,
    pre_tess: Option<Polygon>,
}

impl ClosedPoly {
    pub fn new_boundary(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind: ClosedKind::Boundary,
            boundary: None,
            holes: Vec::new(),
            cur_contour: None,
            features: Vec::new(),
            cur_feature: None,
            hull: None,
            pre_tess: None,
        }
    }

    pub fn new_pavement(surface_type: i32, smoothness: f32, texture_heading: f64, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind: ClosedKind::Pavement { surface_type, smoothness, texture_heading },
            boundary: None,
            holes: Vec::new(),
            cur_contour: None,
            features: Vec::new(),
            cur_feature: None,
            hull: None,
            pre_tess: None,
        }
    }

    fn is_pavement(&self) -> bool {
        matches!(self.kind, ClosedKind::Pavement { .. })
    }

    /// Appends one Bezier node to the contour currently being traced. For
    /// pavement polys, also appends it to the linear feature tracing this
    /// contour's edge, creating one on first use.
    pub fn add_node(&mut self, node: BezNode) {
        self.cur_contour.get_or_insert_with(Vec::new).push(node);

        if self.is_pavement() {
            if self.cur_feature.is_none() {
                let label = if self.boundary.is_some() { "hole" } else { "boundary" };
                self.cur_feature = Some(LinearFeature::new(format!("{} - {label}", self.description), 1.0));
            }
            self.cur_feature.as_mut().unwrap().add_node(node);
        }
    }

    /// Closes the contour currently being traced: the first call records
    /// the outer boundary (and computes its convex hull), every
    /// subsequent call appends a hole.
    pub fn close_cur_contour(&mut self, diagnostics: &dyn Diagnostics) {
        if let Some(feature) = self.cur_feature.take() {
            self.features.push(feature);
        }

        let Some(nodes) = self.cur_contour.take() else {
            diagnostics.warn("close_cur_contour called with no active contour, ignoring");
            return;
        };
        let contour = BezContour::new(nodes);

        if self.boundary.is_none() {
            self.hull = compute_convex_hull(&contour, diagnostics);
            self.boundary = Some(contour);
        } else {
            self.holes.push(contour);
        }
    }

    /// Flattens and cleans the boundary and holes into a tesselation-ready
    /// [`Polygon`]. Consumes the raw Bezier contours; call this once, after
    /// the last [`ClosedPoly::close_cur_contour`].
    pub fn finish(&mut self, diagnostics: &dyn Diagnostics) {
        let Some(boundary) = &self.boundary else {
            diagnostics.alert("ClosedPoly::finish: no boundary recorded");
            return;
        };

        let outer = bezier::flatten(boundary, false);
        let mut poly = Polygon::new(outer, TexMethod::ByRefAndHeading);
        for hole in &self.holes {
            poly.add_hole(bezier::flatten(hole, true));
        }

        self.pre_tess = Some(crate::polygon::clean_polygon(&poly, diagnostics));
    }

    /// Surface material name for a pavement poly's `surface_type`. Mirrors
    /// the original lookup table exactly; an unrecognized surface type is
    /// not a recoverable data error in the source (it calls `exit(1)`), so
    /// this aborts the process rather than returning a `Result`.
    fn surface_material(surface_type: i32) -> &'static str {
        match surface_type {
            1 => "pa_tiedown",
            2 => "pc_tiedown",
            3 | 4 | 5 | 12 | 13 | 14 | 15 => "grass_rwy",
            other => panic!("ClosedPoly::BuildBtg: unknown surface type {other}"),
        }
    }

    /// Builds the tesselation-ready superpoly for an airport pavement
    /// feature: clips against the running `accum` polygon, splits long
    /// edges to 400 m, folds itself into `accum`, and (if `apt_base`/
    /// `apt_clearing` are supplied) grows the airport base and safety
    /// clearing by 20 m / 50 m.
    pub fn build_btg_airport_feature(
        &self,
        accum: &mut Vec<Polygon>,
        apt_base: &mut Option<Polygon>,
        apt_clearing: &mut Option<Polygon>,
        diagnostics: &dyn Diagnostics,
    ) -> Result<(Polygon, &'static str)> {
        let ClosedKind::Pavement { surface_type, texture_heading: _, .. } = self.kind else {
            return Err(GeomError::Internal("build_btg_airport_feature called on a non-pavement ClosedPoly".into()));
        };
        let material = Self::surface_material(surface_type);

        let pre_tess = self
            .pre_tess
            .as_ref()
            .ok_or_else(|| GeomError::Internal("build_btg_airport_feature called before finish()".into()))?;

        if pre_tess.is_empty() {
            return Err(GeomError::NumericalDegenerate(format!("{}: pre_tess has no contours", self.description)));
        }

        let accumulated = clipper::union_all(accum);
        let running = accumulated.into_iter().next().unwrap_or_else(|| Polygon::empty(pre_tess.tex_method));

        let clipped = clipper::difference(pre_tess, &running)
            .into_iter()
            .next()
            .unwrap_or_else(|| Polygon::empty(pre_tess.tex_method));
        let split = clipper::split_long_edges(&clipped, 400.0);

        accum.push(pre_tess.clone());

        if let Some(base) = apt_base {
            let grown = clipper::expand(pre_tess, 20.0, diagnostics);
            *base = clipper::union(base, &grown).into_iter().next().unwrap_or(grown);
        } else {
            *apt_base = Some(clipper::expand(pre_tess, 20.0, diagnostics));
        }
        if let Some(clearing) = apt_clearing {
            let grown = clipper::expand(pre_tess, 50.0, diagnostics);
            *clearing = clipper::union(clearing, &grown).into_iter().next().unwrap_or(grown);
        } else {
            *apt_clearing = Some(clipper::expand(pre_tess, 50.0, diagnostics));
        }

        Ok((split.with_material(material), material))
    }

    /// Builds the base/clearing contribution for a user-defined border
    /// (no surface material, no accumulator interaction): widened by 2 m
    /// and 5 m respectively so the border never collapses to zero area
    /// when drawn exactly on a tile edge.
    pub fn build_btg_user_border(&self, apt_base: &mut Option<Polygon>, apt_clearing: &mut Option<Polygon>, diagnostics: &dyn Diagnostics) -> Result<()> {
        let pre_tess = self
            .pre_tess
            .as_ref()
            .ok_or_else(|| GeomError::Internal("build_btg_user_border called before finish()".into()))?;
        if pre_tess.is_empty() {
            return Ok(());
        }

        let base = clipper::expand(pre_tess, 2.0, diagnostics);
        let safe_base = clipper::expand(pre_tess, 5.0, diagnostics);

        *apt_clearing = Some(match apt_clearing.take() {
            Some(existing) => clipper::union(&existing, &safe_base).into_iter().next().unwrap_or(safe_base),
            None => safe_base,
        });
        *apt_base = Some(match apt_base.take() {
            Some(existing) => clipper::union(&existing, &base).into_iter().next().unwrap_or(base),
            None => base,
        });

        Ok(())
    }

    pub fn features(&self) -> impl Iterator<Item = (&LinearFeature, Contour)> + '_ {
        self.features.iter().map(|f| (f, f.finish()))
    }

    pub fn hull(&self) -> Option<&Contour> {
        self.hull.as_ref()
    }
}

/// Builds the convex hull of a boundary's anchor points. A boundary with
/// two or fewer nodes can't form a hull; the original just logs and
/// leaves the hull unset, and callers must tolerate that rather than
/// treating it as fatal.
fn compute_convex_hull(contour: &BezContour, diagnostics: &dyn Diagnostics) -> Option<Contour> {
    if contour.nodes.len() <= 2 {
        diagnostics.alert(&format!("Boundary size too small: {}. Ignoring...", contour.nodes.len()));
        return None;
    }

    let points: Vec<Point2> = contour.nodes.iter().map(|n| n.pt).collect();
    Some(Contour::new(monotone_chain_hull(&points), false))
}

/// Andrew's monotone chain convex hull, grounded on the same algorithm
/// family `geo::ConvexHull` implements, reimplemented locally over
/// [`Point2`] so this module doesn't need to round-trip through `geo`
/// just for a hull.
fn monotone_chain_hull(points: &[Point2]) -> Vec<Point2> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.lon.partial_cmp(&b.lon).unwrap().then(a.lat.partial_cmp(&b.lat).unwrap()));
    pts.dedup_by(|a, b| a.planar_distance_sq(b) < 1e-18);

    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: Point2, a: Point2, b: Point2| -> f64 { (a.lon - o.lon) * (b.lat - o.lat) - (a.lat - o.lat) * (b.lon - o.lon) };

    let mut lower: Vec<Point2> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point2> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullDiagnostics;

    fn square_nodes() -> Vec<BezNode> {
        vec![
            BezNode::linear(Point2::new(0.0, 0.0)),
            BezNode::linear(Point2::new(1.0, 0.0)),
            BezNode::linear(Point2::new(1.0, 1.0)),
            BezNode::linear(Point2::new(0.0, 1.0)),
        ]
    }

    #[test]
    fn test_boundary_and_hole_roundtrip_to_pre_tess() {
        let diag = NullDiagnostics;
        let mut poly = ClosedPoly::new_pavement(1, 0.0, 90.0, "test apron");

        for n in square_nodes() {
            poly.add_node(n);
        }
        poly.close_cur_contour(&diag);
        assert!(poly.hull().is_some());
        assert_eq!(poly.features.len(), 1);

        poly.finish(&diag);
        let pre_tess = poly.pre_tess.as_ref().expect("finish should populate pre_tess");
        assert_eq!(pre_tess.contours.len(), 1);
        assert!(pre_tess.area() > 0.0);
    }

    #[test]
    fn test_small_boundary_yields_no_hull() {
        let diag = NullDiagnostics;
        let mut poly = ClosedPoly::new_boundary("border");
        poly.add_node(BezNode::linear(Point2::new(0.0, 0.0)));
        poly.add_node(BezNode::linear(Point2::new(1.0, 0.0)));
        poly.close_cur_contour(&diag);
        assert!(poly.hull().is_none());
    }

    #[test]
    fn test_surface_material_lookup() {
        assert_eq!(ClosedPoly::surface_material(1), "pa_tiedown");
        assert_eq!(ClosedPoly::surface_material(2), "pc_tiedown");
        assert_eq!(ClosedPoly::surface_material(3), "grass_rwy");
        assert_eq!(ClosedPoly::surface_material(14), "grass_rwy");
    }

    #[test]
    #[should_panic(expected = "unknown surface type")]
    fn test_surface_material_unknown_panics() {
        ClosedPoly::surface_material(99);
    }

    #[test]
    fn test_user_border_expands_base_and_clearing() {
        let diag = NullDiagnostics;
        let mut poly = ClosedPoly::new_boundary("user border");
        for n in square_nodes() {
            poly.add_node(n);
        }
        poly.close_cur_contour(&diag);
        poly.finish(&diag);

        let mut base = None;
        let mut clearing = None;
        poly.build_btg_user_border(&mut base, &mut clearing, &diag).expect("should succeed");

        let base = base.expect("base should be populated");
        let clearing = clearing.expect("clearing should be populated");
        assert!(clearing.area() > base.area());
    }

    #[test]
    fn test_convex_hull_of_square_has_four_vertices() {
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.5, 0.5), // interior point, must not appear in hull
        ];
        let hull = monotone_chain_hull(&pts);
        assert_eq!(hull.len(), 4);
    }
}
