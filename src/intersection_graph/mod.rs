//! Intersection graph: centerlines-with-width widened into hulls, with
//! multi-segment corner-constraint reconciliation at shared nodes.
//!
//! Nodes and edges form a cycle of references (a node lists its incident
//! edges; an edge names its endpoint nodes), so per §9's Design Notes this
//! is modeled as two arenas indexed by stable IDs rather than raw
//! back-pointers.

use crate::diagnostics::Diagnostics;
use crate::geodesy;
use crate::geometry::{Contour, Point2, Polygon, TexMethod};
use serde::{Deserialize, Serialize};

pub type Polyline = Vec<Point2>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

/// A graph vertex where one or more edges meet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntersectionNode {
    pub position: Point2,
    /// Incident edges, tagged `true` if this node is the edge's
    /// originating (start) endpoint.
    pub incident: Vec<(EdgeId, bool)>,
}

/// The two-phase-commit latch for one multi-segment corner slot. Replaces
/// the original's `_set`/`_valid` boolean pair, which has a confirmed bug
/// on one branch (self-assignment on the commit path fails to clear the
/// slot). `Apply(true)` is always `Proposed -> Valid`; `Apply(false)` is
/// always `Proposed -> Empty`, implemented once here rather than
/// separately per slot so the four slots cannot drift out of sync with
/// each other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum SlotState {
    #[default]
    Empty,
    Proposed(Polyline),
    Valid(Polyline),
}

impl SlotState {
    pub fn is_valid(&self) -> bool {
        matches!(self, SlotState::Valid(_))
    }

    pub fn propose(&mut self, polyline: Polyline) -> bool {
        if self.is_valid() {
            false
        } else {
            *self = SlotState::Proposed(polyline);
            true
        }
    }

    pub fn apply(&mut self, accept: bool) {
        *self = match (std::mem::take(self), accept) {
            (SlotState::Proposed(p), true) => SlotState::Valid(p),
            (SlotState::Proposed(_), false) => SlotState::Empty,
            (other, _) => other,
        };
    }

    pub fn polyline(&self) -> Option<&Polyline> {
        match self {
            SlotState::Valid(p) | SlotState::Proposed(p) => Some(p),
            SlotState::Empty => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    Runway,
    Taxiway,
}

/// A linear-feature centerline widened into a rectangular hull, with
/// per-corner multi-segment constraint slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntersectionEdge {
    pub start: NodeId,
    pub end: NodeId,
    pub width_m: f64,
    pub kind: EdgeKind,

    pub heading_deg: f64,
    pub length_m: f64,

    pub bot_left: Point2,
    pub bot_right: Point2,
    pub top_left: Point2,
    pub top_right: Point2,

    /// Side lines extended 10 m beyond each endpoint, used as the
    /// single-segment corner-intersection target.
    pub side_l: (Point2, Point2),
    pub side_r: (Point2, Point2),

    pub msbl: SlotState,
    pub msbr: SlotState,
    pub mstl: SlotState,
    pub mstr: SlotState,

    pub con_bot_left: Option<Point2>,
    pub con_bot_right: Option<Point2>,
    pub con_top_left: Option<Point2>,
    pub con_top_right: Option<Point2>,

    pub right_contour: Polyline,
    pub left_contour: Polyline,
}

const SIDE_EXTENSION_M: f64 = 10.0;

impl IntersectionEdge {
    fn compute(start_pos: Point2, end_pos: Point2, start: NodeId, end: NodeId, width_m: f64, kind: EdgeKind) -> Self {
        let (heading, _back, length) = geodesy::inverse(start_pos, end_pos);
        let half = width_m / 2.0;

        let (bot_left, _) = geodesy::direct(start_pos, heading + 90.0, half);
        let (bot_right, _) = geodesy::direct(start_pos, heading - 90.0, half);
        let (top_left, _) = geodesy::direct(end_pos, heading + 90.0, half);
        let (top_right, _) = geodesy::direct(end_pos, heading - 90.0, half);

        let (side_l_a, _) = geodesy::direct(bot_left, heading + 180.0, SIDE_EXTENSION_M);
        let (side_l_b, _) = geodesy::direct(top_left, heading, SIDE_EXTENSION_M);
        let (side_r_a, _) = geodesy::direct(bot_right, heading + 180.0, SIDE_EXTENSION_M);
        let (side_r_b, _) = geodesy::direct(top_right, heading, SIDE_EXTENSION_M);

        Self {
            start,
            end,
            width_m,
            kind,
            heading_deg: heading,
            length_m: length,
            bot_left,
            bot_right,
            top_left,
            top_right,
            side_l: (side_l_a, side_l_b),
            side_r: (side_r_a, side_r_b),
            msbl: SlotState::Empty,
            msbr: SlotState::Empty,
            mstl: SlotState::Empty,
            mstr: SlotState::Empty,
            con_bot_left: None,
            con_bot_right: None,
            con_top_left: None,
            con_top_right: None,
            right_contour: Vec::new(),
            left_contour: Vec::new(),
        }
    }

    pub fn get_heading(&self, originating: bool) -> f64 {
        if originating {
            self.heading_deg
        } else {
            (self.heading_deg + 180.0) % 360.0
        }
    }

    pub fn get_length(&self) -> f64 {
        self.length_m
    }

    pub fn bounding_box(&self) -> crate::geometry::Rectangle {
        crate::geometry::Rectangle::from_points(&[self.bot_left, self.bot_right, self.top_left, self.top_right])
    }

    /// Single-segment corner intersection: intersect the first proposed
    /// constraint ray against the corresponding side line. This is a
    /// separate constraint channel from the multi-segment slots — it is
    /// seeded at the node independently of them, so a corner with no MS
    /// constraint at all still resolves to *something* (the edge's own
    /// raw hull corner, which by construction already lies on the side
    /// line). Non-fatal if the constraint list doesn't have exactly one
    /// segment — logs and proceeds with whatever can be computed.
    fn intersect_constraints_and_sides(&mut self, diagnostics: &dyn Diagnostics) {
        self.con_bot_left = self.single_segment_corner(&self.msbl, self.side_l, self.bot_left, diagnostics, "msbl");
        self.con_bot_right = self.single_segment_corner(&self.msbr, self.side_r, self.bot_right, diagnostics, "msbr");
        self.con_top_left = self.single_segment_corner(&self.mstl, self.side_l, self.top_left, diagnostics, "mstl");
        self.con_top_right = self.single_segment_corner(&self.mstr, self.side_r, self.top_right, diagnostics, "mstr");
    }

    fn single_segment_corner(
        &self,
        slot: &SlotState,
        side: (Point2, Point2),
        raw_corner: Point2,
        diagnostics: &dyn Diagnostics,
        label: &str,
    ) -> Option<Point2> {
        let constrain = match slot.polyline() {
            Some(c) => c,
            None => return Some(raw_corner),
        };
        if constrain.len() < 2 {
            diagnostics.warn(&format!("{label}: constraint list too short to form a ray, falling back to the raw corner"));
            return Some(raw_corner);
        }
        if constrain.len() != 2 {
            diagnostics.warn(&format!(
                "{label}: expected a single-segment constraint (2 points), got {}, using first two anyway",
                constrain.len()
            ));
        }
        let ray = crate::geometry::Line::new(constrain[0], constrain[1]);
        let side_line = crate::geometry::Line::new(side.0, side.1);
        ray.intersect(&side_line).or(Some(raw_corner))
    }
}

/// The planar graph of [`IntersectionEdge`]s and [`IntersectionNode`]s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntersectionGraph {
    nodes: Vec<IntersectionNode>,
    edges: Vec<IntersectionEdge>,
}

impl IntersectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, position: Point2) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(IntersectionNode { position, incident: Vec::new() });
        id
    }

    pub fn node(&self, id: NodeId) -> &IntersectionNode {
        &self.nodes[id.0 as usize]
    }

    pub fn edge(&self, id: EdgeId) -> &IntersectionEdge {
        &self.edges[id.0 as usize]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut IntersectionEdge {
        &mut self.edges[id.0 as usize]
    }

    /// Adds an edge between two existing nodes. `start != end` and
    /// `width_m > 0` are required invariants; violating them is a
    /// programmer error.
    pub fn add_edge(&mut self, start: NodeId, end: NodeId, width_m: f64, kind: EdgeKind) -> EdgeId {
        assert_ne!(start, end, "intersection edge endpoints must differ");
        assert!(width_m > 0.0, "intersection edge width must be positive");

        let start_pos = self.nodes[start.0 as usize].position;
        let end_pos = self.nodes[end.0 as usize].position;
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(IntersectionEdge::compute(start_pos, end_pos, start, end, width_m, kind));
        self.nodes[start.0 as usize].incident.push((id, true));
        self.nodes[end.0 as usize].incident.push((id, false));
        id
    }

    /// Splits edge `id` at `new_pos`: mutates `id` in place to become the
    /// first half (start -> new node) and returns a fresh edge id for the
    /// second half (new node -> end). Both hulls are recomputed and
    /// incidence lists updated at the new node.
    pub fn split(&mut self, id: EdgeId, new_pos: Point2) -> (NodeId, EdgeId) {
        let (start, end, width_m, kind) = {
            let e = &self.edges[id.0 as usize];
            (e.start, e.end, e.width_m, e.kind)
        };

        let new_node = self.add_node(new_pos);

        // Remove the old edge's "end" incidence record; it becomes the
        // second half's end instead.
        if let Some(pos) = self.nodes[end.0 as usize].incident.iter().position(|(eid, orig)| *eid == id && !*orig) {
            self.nodes[end.0 as usize].incident.remove(pos);
        }

        let start_pos = self.nodes[start.0 as usize].position;
        self.edges[id.0 as usize] = IntersectionEdge::compute(start_pos, new_pos, start, new_node, width_m, kind);
        self.nodes[new_node.0 as usize].incident.push((id, false));

        let end_pos = self.nodes[end.0 as usize].position;
        let second_id = EdgeId(self.edges.len() as u32);
        self.edges.push(IntersectionEdge::compute(new_pos, end_pos, new_node, end, width_m, kind));
        self.nodes[new_node.0 as usize].incident.push((second_id, true));
        self.nodes[end.0 as usize].incident.push((second_id, false));

        (new_node, second_id)
    }

    /// Publishes a tentative left-corner constraint from `edge` onto
    /// itself at the endpoint given by `originating` (bottom-left if
    /// originating, top-left otherwise), only if the slot hasn't already
    /// been frozen valid.
    pub fn set_left_constraint(&mut self, edge: EdgeId, originating: bool, polyline: Polyline) -> bool {
        let e = self.edge_mut(edge);
        if originating {
            e.msbl.propose(polyline)
        } else {
            e.mstl.propose(polyline)
        }
    }

    pub fn set_right_constraint(&mut self, edge: EdgeId, originating: bool, polyline: Polyline) -> bool {
        let e = self.edge_mut(edge);
        if originating {
            e.msbr.propose(polyline)
        } else {
            e.mstr.propose(polyline)
        }
    }

    /// Applies (or clears, if `apply=false`) every proposed slot on
    /// `edge`.
    pub fn apply_constraint(&mut self, edge: EdgeId, apply: bool) {
        let e = self.edge_mut(edge);
        e.msbl.apply(apply);
        e.msbr.apply(apply);
        e.mstl.apply(apply);
        e.mstr.apply(apply);
    }

    /// Stitches the final right and left contours for `edge`, per the
    /// four-case decision table keyed on which multi-segment slots are
    /// non-empty. Must be called after single-segment corners have been
    /// resolved via [`IntersectionGraph::resolve_single_segment_corners`].
    pub fn complete(&mut self, edge: EdgeId, diagnostics: &dyn Diagnostics) {
        self.edge_mut(edge).intersect_constraints_and_sides(diagnostics);

        let (start, end) = self.positions_start_end(edge);
        let e = self.edge_mut(edge);

        e.right_contour = build_side_contour(
            start,
            end,
            &e.msbr,
            &e.mstr,
            e.con_bot_right,
            e.con_top_right,
            diagnostics,
            "right",
        );
        e.left_contour = build_side_contour(
            end,
            start,
            &e.mstl,
            &e.msbl,
            e.con_top_left,
            e.con_bot_left,
            diagnostics,
            "left",
        );
    }

    fn positions_start_end(&self, edge: EdgeId) -> (Point2, Point2) {
        let e = self.edge(edge);
        (self.node(e.start).position, self.node(e.end).position)
    }

    /// Perpendicular-split pass: for every vertex of one contour, cast a
    /// perpendicular to the edge azimuth and, if it crosses the other
    /// contour, insert the crossing vertex there. Run symmetrically so
    /// both contours end up at matching vertex density.
    pub fn perpendicular_split(&mut self, edge: EdgeId) {
        let heading = self.edge(edge).heading_deg;
        let left_snapshot = self.edges[edge.0 as usize].left_contour.clone();
        let right_snapshot = self.edges[edge.0 as usize].right_contour.clone();

        perpendicular_split_into(&left_snapshot, &mut self.edges[edge.0 as usize].right_contour, heading);
        perpendicular_split_into(&right_snapshot, &mut self.edges[edge.0 as usize].left_contour, heading);
    }

    /// Concatenates the right and left contours into a single closed
    /// polygon ready for tesselation.
    pub fn edge_polygon(&self, edge: EdgeId) -> Polygon {
        let e = self.edge(edge);
        let mut pts = e.right_contour.clone();
        pts.extend(e.left_contour.iter().copied());
        Polygon::new(Contour::new(pts, false), TexMethod::ByLandClass)
    }
}

/// Builds one side's contour per the four-case table:
/// - neither MS set: {near_end, near_corner, far_corner, far_end}
/// - only near MS set: {near_end (if distinct), MS list, far_corner (iff MS ends on side line), far_end}
/// - only far MS set: {near_end, near_corner (iff MS begins on side line), MS list}
/// - both set: {near_end (if distinct), near MS list, far MS list}
#[allow(clippy::too_many_arguments)]
fn build_side_contour(
    near_end: Point2,
    far_end: Point2,
    near_ms: &SlotState,
    far_ms: &SlotState,
    near_corner: Option<Point2>,
    far_corner: Option<Point2>,
    diagnostics: &dyn Diagnostics,
    label: &str,
) -> Polyline {
    let mut out = Vec::new();
    match (near_ms.polyline(), far_ms.polyline()) {
        (None, None) => {
            out.push(near_end);
            if let Some(c) = near_corner {
                out.push(c);
            } else {
                diagnostics.warn(&format!("{label}: near corner has zero constraints, visible artifact expected"));
            }
            if let Some(c) = far_corner {
                out.push(c);
            } else {
                diagnostics.warn(&format!("{label}: far corner has zero constraints, visible artifact expected"));
            }
            out.push(far_end);
        }
        (Some(ms), None) => {
            push_unless_duplicate(&mut out, near_end);
            out.extend(ms.iter().copied());
            if let Some(c) = far_corner {
                out.push(c);
            }
            out.push(far_end);
        }
        (None, Some(ms)) => {
            out.push(near_end);
            if let Some(c) = near_corner {
                out.push(c);
            }
            out.extend(ms.iter().copied());
        }
        (Some(near), Some(far)) => {
            push_unless_duplicate(&mut out, near_end);
            out.extend(near.iter().copied());
            out.extend(far.iter().copied());
        }
    }
    out
}

fn push_unless_duplicate(out: &mut Polyline, p: Point2) {
    if out.last().map_or(true, |last| last.planar_distance(&p) > 1e-9) {
        out.push(p);
    }
}

/// For each vertex of `source`, cast a perpendicular to `heading_deg` and
/// insert the crossing point into `target` if it lands on one of
/// `target`'s edges.
fn perpendicular_split_into(source: &Polyline, target: &mut Polyline, heading_deg: f64) {
    if source.is_empty() || target.len() < 2 {
        return;
    }
    let perp_heading = heading_deg + 90.0;
    let mut insertions: Vec<(usize, Point2)> = Vec::new();

    for v in source.iter() {
        let (far, _) = geodesy::direct(*v, perp_heading, 1_000_000.0);
        let (near, _) = geodesy::direct(*v, perp_heading + 180.0, 1_000_000.0);
        let perp = crate::geometry::Line::new(near, far);

        for i in 0..target.len() - 1 {
            let edge = crate::geometry::Segment::new(target[i], target[i + 1]);
            let edge_line = crate::geometry::Line::new(edge.start, edge.end);
            if let Some(hit) = perp.intersect(&edge_line) {
                let t = if (edge.end.lon - edge.start.lon).abs() > (edge.end.lat - edge.start.lat).abs() {
                    (hit.lon - edge.start.lon) / (edge.end.lon - edge.start.lon)
                } else {
                    (hit.lat - edge.start.lat) / (edge.end.lat - edge.start.lat)
                };
                if t > 1e-6 && t < 1.0 - 1e-6 {
                    insertions.push((i + 1, hit));
                }
            }
        }
    }

    insertions.sort_by(|a, b| b.0.cmp(&a.0));
    for (idx, pt) in insertions {
        target.insert(idx, pt);
    }
}
