//! The tile-construct three-stage state machine (§4.8): load and clip a
//! tile's land-class table, reconcile shared edges with its four
//! neighbors across two rounds, tesselate, and compute mesh differential
//! geometry. Grounded on `TGConstruct::ConstructBucketStage1/2/3` in
//! `tgconstruct.cxx`.
//!
//! Serializing the result to BTG/STG is out of scope (§1) — [`Tile::into_mesh`]
//! hands the caller an in-memory [`TileMesh`] to do that with.

pub mod area_type;
pub mod custom_objects;
pub mod node_set;
pub mod options;
pub mod shared_edge;
pub mod texcoord;

pub use area_type::AreaType;
pub use custom_objects::{Beacon, CustomObject, Sign, Windsock};
pub use node_set::{Face, FaceRef, Node, NodeSet};
pub use options::{ElevationSource, LandCoverClassifier, TileOptions};
pub use shared_edge::{NeighborFace, SharedBoundaryNode, SharedEdgeStage1, SharedEdgeStage2, Side, TileId};
pub use texcoord::{TexCoordParams, DEFAULT_TEXTURE_TILE_M};

use crate::diagnostics::Diagnostics;
use crate::error::{GeomError, Result};
use crate::geodesy;
use crate::geometry::{Point2, Polygon, Rectangle, Segment};
use crate::mesh::VertexNormalAccumulator;
use std::collections::HashMap;

/// Approximate meters per degree, used only to convert the meter-valued
/// epsilons in [`TileOptions`] into the degree-valued epsilons
/// [`Side::contains`] expects. §9's local-scale conversion note applies
/// here the same way it does to the collinear-area epsilon in
/// `crate::polygon::cleanup`: good enough at tile scale, not a
/// substitute for true ellipsoidal math.
const APPROX_METERS_PER_DEGREE: f64 = 111_320.0;

fn meters_to_deg(m: f64) -> f64 {
    m / APPROX_METERS_PER_DEGREE
}

/// One land-class polygon plus the texture parameters its vertices are
/// rendered with, and (for airport/fixed-elevation features) the flat
/// elevation stage 2 should assign its nodes instead of sampling the
/// grid.
#[derive(Debug, Clone)]
pub struct ShapeEntry {
    pub polygon: Polygon,
    pub tex_params: TexCoordParams,
    pub fixed_elevation_m: Option<f64>,
}

/// One polygon submitted to [`Tile::load_landclass`], before priority
/// clipping groups it under its `area_type`.
#[derive(Debug, Clone)]
pub struct LandclassInput {
    pub area_type: AreaType,
    pub polygon: Polygon,
    pub tex_params: Option<TexCoordParams>,
    pub fixed_elevation_m: Option<f64>,
}

impl LandclassInput {
    pub fn terrain(area_type: AreaType, polygon: Polygon) -> Self {
        Self { area_type, polygon, tex_params: None, fixed_elevation_m: None }
    }

    pub fn airport(area_type: AreaType, polygon: Polygon, tex_params: TexCoordParams, fixed_elevation_m: f64) -> Self {
        Self { area_type, polygon, tex_params: Some(tex_params), fixed_elevation_m: Some(fixed_elevation_m) }
    }
}

/// One shape's computed texture coordinates, in the same contour layout
/// as its source polygon (§4.8 step 20).
#[derive(Debug, Clone)]
pub struct ShapeTexCoords {
    pub area_type: AreaType,
    pub shape_idx: usize,
    pub contours: Vec<Vec<[f32; 2]>>,
}

/// The finished, stage-3-complete tile, handed to the caller for
/// serialization.
#[derive(Debug, Clone)]
pub struct TileMesh {
    pub id: TileId,
    pub is_ocean: bool,
    pub nodes: Vec<Node>,
    pub faces: Vec<Face>,
    pub texcoords: Vec<ShapeTexCoords>,
    pub custom_objects: Vec<CustomObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Fresh,
    Stage1Done,
    Stage2Done,
    Stage3Done,
}

/// A single tile's working state across the three construction stages.
pub struct Tile {
    id: TileId,
    bounds: Rectangle,
    options: TileOptions,
    stage: Stage,
    is_ocean: bool,

    landclass: Vec<(AreaType, Vec<ShapeEntry>)>,
    shared_points_buffer: Vec<Point2>,
    fixed_elevations: HashMap<(i64, i64), f64>,

    faces_pending: Vec<(FaceRef, [Point2; 3])>,
    nodes: NodeSet,
    faces: Vec<Face>,
    texcoords: Vec<ShapeTexCoords>,
    custom_objects: Vec<CustomObject>,
}

impl Tile {
    pub fn new(id: TileId, options: TileOptions) -> Self {
        Self {
            id,
            bounds: id.bounds(),
            options,
            stage: Stage::Fresh,
            is_ocean: false,
            landclass: Vec::new(),
            shared_points_buffer: Vec::new(),
            fixed_elevations: HashMap::new(),
            faces_pending: Vec::new(),
            nodes: NodeSet::new(),
            faces: Vec::new(),
            texcoords: Vec::new(),
            custom_objects: Vec::new(),
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn is_ocean(&self) -> bool {
        self.is_ocean
    }

    pub fn add_custom_object(&mut self, object: CustomObject) {
        self.custom_objects.push(object);
    }

    // ---- stage 1 -------------------------------------------------------

    /// Steps 1-6: seed the elevation grid, load and classify the
    /// land-class table, clip by priority, clean, and make the shared-edge
    /// stage-1 record available via [`Tile::shared_edge_stage1`].
    pub fn run_stage1(
        &mut self,
        elevation: &dyn ElevationSource,
        landclass: Vec<LandclassInput>,
        cover: Option<&dyn LandCoverClassifier>,
        diagnostics: &dyn Diagnostics,
    ) -> Result<()> {
        assert_eq!(self.stage, Stage::Fresh, "run_stage1 called out of order");

        // step 1: seed the node set with the elevation grid's own lattice.
        for p in elevation.grid_samples(self.bounds) {
            self.nodes.add(p);
        }

        // step 2: no land-class data at all means open ocean, unless the
        // caller explicitly asked to treat this tile as land regardless.
        if landclass.is_empty() && !self.options.ignore_landmass {
            self.is_ocean = true;
            diagnostics.info(&format!("tile {}: no land-class polygons, treating as ocean", self.id.bucket_path()));
            self.stage = Stage::Stage1Done;
            return Ok(());
        }

        // step 3: optional land-cover raster reclassification of anything
        // still carrying the catch-all area type.
        let mut landclass = landclass;
        if let Some(classifier) = cover {
            for input in &mut landclass {
                if input.area_type == AreaType::Default {
                    if let Some(outer) = input.polygon.outer() {
                        if let Some(reclassified) = classifier.classify(outer.centroid()) {
                            input.area_type = reclassified;
                        }
                    }
                }
            }
        }

        // step 4: clip by priority, higher-priority classes overwrite lower.
        let clipped = clip_by_priority(landclass);

        // step 5: clean every surviving fragment; step 6's shared-edge
        // record is derived lazily from `self.landclass` afterward.
        for (area_type, entries) in clipped {
            let mut kept = Vec::new();
            for entry in entries {
                let cleaned = crate::polygon::clean_polygon(&entry.polygon, diagnostics);
                if cleaned.is_empty() {
                    continue;
                }
                kept.push(ShapeEntry { polygon: cleaned, ..entry });
            }
            if !kept.is_empty() {
                self.landclass.push((area_type, kept));
            }
        }

        if self.landclass.is_empty() && !self.options.ignore_landmass {
            self.is_ocean = true;
            diagnostics.info(&format!("tile {}: land-class table emptied by clipping, treating as ocean", self.id.bucket_path()));
        }

        self.stage = Stage::Stage1Done;
        Ok(())
    }

    /// Step 6: every land-class vertex lying on tile side `side`, for the
    /// caller to persist and hand to that neighbor's stage 2. `None` for
    /// an ocean tile (no record to exchange).
    pub fn shared_edge_stage1(&self, side: Side) -> Option<SharedEdgeStage1> {
        if self.is_ocean {
            return None;
        }
        let eps_deg = meters_to_deg(self.options.edge_snap_eps_m);
        let mut points = Vec::new();
        for (_area_type, shapes) in &self.landclass {
            for shape in shapes {
                for contour in &shape.polygon.contours {
                    for &p in &contour.points {
                        if side.contains(&self.bounds, p, eps_deg) {
                            points.push(p);
                        }
                    }
                }
            }
        }
        Some(SharedEdgeStage1 { tile: self.id, side, points })
    }

    // ---- stage 2 -------------------------------------------------------

    /// Steps 8-14: merge in each neighbor's stage-1 shared points, repair
    /// T-junctions, tesselate, lock the node set, interpolate elevations,
    /// and build the per-node face lookup.
    ///
    /// `neighbors[i]` (indexed by [`Side::ALL`]) must be that neighbor's
    /// own `shared_edge_stage1(side.opposite())` record — the points it
    /// reports lying on *its* side facing this tile. A `None` entry is
    /// treated as an ocean neighbor (§7): no extra boundary points are
    /// merged in for that side.
    pub fn run_stage2(
        &mut self,
        elevation: &dyn ElevationSource,
        neighbors: &[Option<SharedEdgeStage1>; 4],
        diagnostics: &dyn Diagnostics,
    ) -> Result<()> {
        assert_eq!(self.stage, Stage::Stage1Done, "run_stage2 called out of order");

        if self.is_ocean {
            self.stage = Stage::Stage2Done;
            return Ok(());
        }

        // step 8: collect neighbor shared points for the T-junction pass.
        for (side, neighbor) in Side::ALL.iter().zip(neighbors.iter()) {
            match neighbor {
                Some(record) => self.shared_points_buffer.extend_from_slice(&record.points),
                None => diagnostics.debug(&format!("tile {}: no neighbor record on {:?}, treating as ocean neighbor", self.id.bucket_path(), side)),
            }
        }

        // step 9: fix T-junctions against every vertex in the tile (both
        // self-contour and neighbor-reported).
        self.fix_t_junctions(diagnostics);

        // step 10: tesselate every shape, seeding the node set as we go.
        self.tesselate_all(diagnostics);

        // step 11: sort and lock the node set.
        self.nodes.sort_and_lock();

        // step 12: resolve each pending triangle's vertices to node indices.
        self.resolve_face_node_indices()?;

        self.mark_boundary_nodes();

        // step 13: interpolate elevations, flattening fixed-elevation shapes.
        self.interpolate_elevations(elevation, diagnostics)?;

        // step 14: build the per-node incident-face lookup.
        self.build_faces_per_node();

        self.stage = Stage::Stage2Done;
        Ok(())
    }

    fn fix_t_junctions(&mut self, diagnostics: &dyn Diagnostics) {
        let eps_m = self.options.t_junction_eps_m;

        let mut candidates: Vec<Point2> = Vec::new();
        for (_area_type, shapes) in &self.landclass {
            for shape in shapes {
                for contour in &shape.polygon.contours {
                    candidates.extend_from_slice(&contour.points);
                }
            }
        }
        candidates.extend_from_slice(&self.shared_points_buffer);

        let mut inserted = 0usize;
        for (_area_type, shapes) in self.landclass.iter_mut() {
            for shape in shapes.iter_mut() {
                for contour in shape.polygon.contours.iter_mut() {
                    inserted += snap_t_junctions_into_contour(contour, &candidates, eps_m);
                }
            }
        }
        if inserted > 0 {
            diagnostics.debug(&format!("tile {}: fix_t_junctions inserted {inserted} vertex(es)", self.id.bucket_path()));
        }
    }

    fn tesselate_all(&mut self, diagnostics: &dyn Diagnostics) {
        let mut pending = Vec::new();
        for (area_type, shapes) in self.landclass.iter() {
            let area_type = *area_type;
            for (shape_idx, shape) in shapes.iter().enumerate() {
                match crate::mesh::tesselate(&shape.polygon) {
                    Ok((vertices, tris)) => {
                        if let Some(elev) = shape.fixed_elevation_m {
                            for v in &vertices {
                                let p = Point2::new(v[0], v[1]);
                                self.fixed_elevations.insert(quantize_key(p), elev);
                            }
                        }
                        for (tri_idx, tri) in tris.iter().enumerate() {
                            let pts = [
                                Point2::new(vertices[tri[0]][0], vertices[tri[0]][1]),
                                Point2::new(vertices[tri[1]][0], vertices[tri[1]][1]),
                                Point2::new(vertices[tri[2]][0], vertices[tri[2]][1]),
                            ];
                            for p in pts {
                                if shape.fixed_elevation_m.is_some() {
                                    self.nodes.add_fixed_elevation(p);
                                } else {
                                    self.nodes.add(p);
                                }
                            }
                            pending.push((FaceRef { area_type, shape_idx, segment_idx: 0, tri_idx }, pts));
                        }
                    }
                    Err(e) => {
                        diagnostics.warn(&format!("tile {}: tesselate skipped shape {shape_idx} of {area_type:?}: {e}", self.id.bucket_path()));
                    }
                }
            }
        }
        self.faces_pending = pending;
    }

    fn resolve_face_node_indices(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.faces_pending);
        self.faces = Vec::with_capacity(pending.len());
        for (id, pts) in pending {
            let mut idxs = [0usize; 3];
            for (i, p) in pts.iter().enumerate() {
                idxs[i] = self
                    .nodes
                    .index_of(*p)
                    .ok_or_else(|| GeomError::Internal(format!("tesselate produced a vertex not present in the node set: {p:?}")))?;
            }
            if idxs[0] == idxs[1] || idxs[1] == idxs[2] || idxs[0] == idxs[2] {
                return Err(GeomError::NumericalDegenerate(format!("triangle with coincident node indices: {id:?}")));
            }
            self.faces.push(Face { id, nodes: idxs, area_m2: 0.0, normal: crate::geometry::EcefVector::zeros() });
        }
        Ok(())
    }

    fn mark_boundary_nodes(&mut self) {
        let bounds = self.bounds;
        let eps_deg = meters_to_deg(self.options.edge_snap_eps_m);
        for node in self.nodes.nodes_mut() {
            if Side::ALL.iter().any(|s| s.contains(&bounds, node.pos, eps_deg)) {
                node.boundary = true;
            }
        }
    }

    fn interpolate_elevations(&mut self, elevation: &dyn ElevationSource, diagnostics: &dyn Diagnostics) -> Result<()> {
        let n = self.nodes.len();
        if n == 0 {
            return Ok(());
        }
        let one_percent = (n / 100).max(1);
        for i in 0..n {
            let (pos, fixed) = {
                let node = self.nodes.get(i);
                (node.pos, node.fixed_elevation)
            };
            if fixed {
                if let Some(&z) = self.fixed_elevations.get(&quantize_key(pos)) {
                    self.nodes.get_mut(i).elevation_m = z;
                }
            } else {
                let z = elevation.elevation_m(pos)?;
                self.nodes.get_mut(i).elevation_m = z;
            }
            if i % one_percent == 0 {
                diagnostics.debug(&format!("tile {}: interpolate_elevations {}% complete", self.id.bucket_path(), (i * 100) / n));
            }
        }
        Ok(())
    }

    fn build_faces_per_node(&mut self) {
        for (face_idx, face) in self.faces.iter().enumerate() {
            for &node_idx in &face.nodes {
                self.nodes.get_mut(node_idx).faces.push(face_idx);
            }
        }
    }

    /// Step 15: every boundary node on `side` plus the faces it touches,
    /// for the caller to persist and hand to that neighbor's stage 3.
    pub fn shared_edge_stage2(&self, side: Side) -> Option<SharedEdgeStage2> {
        if self.is_ocean {
            return None;
        }
        let eps_deg = meters_to_deg(self.options.edge_snap_eps_m);
        let mut nodes_out = Vec::new();
        for node in self.nodes.nodes() {
            if !node.boundary || !side.contains(&self.bounds, node.pos, eps_deg) {
                continue;
            }
            let faces = node
                .faces
                .iter()
                .map(|&fi| {
                    let f = &self.faces[fi];
                    let vertices = [self.nodes.get(f.nodes[0]).point3(), self.nodes.get(f.nodes[1]).point3(), self.nodes.get(f.nodes[2]).point3()];
                    NeighborFace { area_type: f.id.area_type, vertices }
                })
                .collect();
            nodes_out.push(SharedBoundaryNode { position: node.point3(), faces });
        }
        Some(SharedEdgeStage2 { tile: self.id, side, nodes: nodes_out })
    }

    // ---- stage 3 -------------------------------------------------------

    /// Steps 16-20: average boundary elevations against matching neighbor
    /// nodes, compute face geometry, compute smooth vertex normals
    /// (folding in neighbor-contributed faces), and compute texture
    /// coordinates. Emitting BTG/STG is out of scope (§1): the caller
    /// serializes [`Tile::into_mesh`]'s result itself.
    ///
    /// `neighbors[i]` must be that neighbor's own
    /// `shared_edge_stage2(side.opposite())` record, mirroring stage 2's
    /// convention.
    pub fn run_stage3(&mut self, neighbors: &[Option<SharedEdgeStage2>; 4], diagnostics: &dyn Diagnostics) -> Result<()> {
        assert_eq!(self.stage, Stage::Stage2Done, "run_stage3 called out of order");

        if self.is_ocean {
            self.stage = Stage::Stage3Done;
            return Ok(());
        }

        self.average_edge_elevations(neighbors, diagnostics);
        self.compute_face_geometry();
        self.compute_vertex_normals(neighbors, diagnostics);
        self.texcoords = self.compute_texture_coordinates();

        self.stage = Stage::Stage3Done;
        Ok(())
    }

    fn average_edge_elevations(&mut self, neighbors: &[Option<SharedEdgeStage2>; 4], diagnostics: &dyn Diagnostics) {
        let eps_m = self.options.t_junction_eps_m.max(0.5);
        let mut updated = 0usize;
        for i in 0..self.nodes.len() {
            let (pos, boundary, fixed) = {
                let node = self.nodes.get(i);
                (node.pos, node.boundary, node.fixed_elevation)
            };
            if !boundary || fixed {
                continue;
            }
            let mut sum = self.nodes.get(i).elevation_m;
            let mut count = 1u32;
            for neighbor in neighbors.iter().flatten() {
                if let Some(matched) = neighbor.nodes.iter().find(|n| geodesy::distance_m(n.position.pos, pos) <= eps_m) {
                    sum += matched.position.elevation_m;
                    count += 1;
                }
            }
            if count > 1 {
                self.nodes.get_mut(i).elevation_m = sum / count as f64;
                updated += 1;
            }
        }
        diagnostics.debug(&format!("tile {}: average_edge_elevations updated {updated} boundary node(s)", self.id.bucket_path()));
    }

    fn compute_face_geometry(&mut self) {
        for face in self.faces.iter_mut() {
            let p0 = self.nodes.get(face.nodes[0]).point3();
            let p1 = self.nodes.get(face.nodes[1]).point3();
            let p2 = self.nodes.get(face.nodes[2]).point3();
            face.area_m2 = crate::mesh::triangle_area_m2(p0, p1, p2);
            let v0 = geodesy::geod_to_ecef(p0);
            let v1 = geodesy::geod_to_ecef(p1);
            let v2 = geodesy::geod_to_ecef(p2);
            face.normal = crate::mesh::face_normal(v0, v1, v2);
        }
    }

    fn compute_vertex_normals(&mut self, neighbors: &[Option<SharedEdgeStage2>; 4], diagnostics: &dyn Diagnostics) {
        let mut acc = VertexNormalAccumulator::new(self.nodes.len());
        for face in &self.faces {
            acc.add_face(face.nodes, face.area_m2, face.normal);
        }

        let eps_m = self.options.t_junction_eps_m.max(0.5);
        for i in 0..self.nodes.len() {
            let (pos, boundary) = {
                let node = self.nodes.get(i);
                (node.pos, node.boundary)
            };
            if !boundary {
                continue;
            }
            for neighbor in neighbors.iter().flatten() {
                if let Some(matched) = neighbor.nodes.iter().find(|n| geodesy::distance_m(n.position.pos, pos) <= eps_m) {
                    for nf in &matched.faces {
                        let area = crate::mesh::triangle_area_m2(nf.vertices[0], nf.vertices[1], nf.vertices[2]);
                        let v0 = geodesy::geod_to_ecef(nf.vertices[0]);
                        let v1 = geodesy::geod_to_ecef(nf.vertices[1]);
                        let v2 = geodesy::geod_to_ecef(nf.vertices[2]);
                        let normal = crate::mesh::face_normal(v0, v1, v2);
                        acc.add_single(i, area, normal);
                    }
                }
            }
        }

        let fallback_positions: Vec<_> = self.nodes.nodes().iter().map(|n| geodesy::geod_to_ecef(n.point3())).collect();
        let normals = acc.finalize(&fallback_positions, diagnostics);
        for (i, normal) in normals.into_iter().enumerate() {
            self.nodes.get_mut(i).normal = Some(normal);
        }
    }

    fn compute_texture_coordinates(&self) -> Vec<ShapeTexCoords> {
        let mut out = Vec::new();
        for (area_type, shapes) in &self.landclass {
            for (shape_idx, shape) in shapes.iter().enumerate() {
                let contours = shape
                    .polygon
                    .contours
                    .iter()
                    .map(|c| c.points.iter().map(|&p| texcoord::vertex_uv(shape.polygon.tex_method, &shape.tex_params, p)).collect())
                    .collect();
                out.push(ShapeTexCoords { area_type: *area_type, shape_idx, contours });
            }
        }
        out
    }

    /// Consumes the tile after stage 3, handing the caller the finished
    /// mesh and custom-object placements to serialize however it likes.
    /// An ocean tile (no stage-3 geometry to speak of) may also be
    /// consumed once stage 1 has classified it as such.
    pub fn into_mesh(self) -> TileMesh {
        assert!(
            self.stage == Stage::Stage3Done || (self.is_ocean && self.stage != Stage::Fresh),
            "into_mesh called before stage 3 completed"
        );
        TileMesh {
            id: self.id,
            is_ocean: self.is_ocean,
            nodes: self.nodes.nodes().to_vec(),
            faces: self.faces,
            texcoords: self.texcoords,
            custom_objects: self.custom_objects,
        }
    }
}

fn quantize_key(p: Point2) -> (i64, i64) {
    const UNITS_PER_DEGREE: f64 = 1.0e9;
    ((p.lon * UNITS_PER_DEGREE).round() as i64, (p.lat * UNITS_PER_DEGREE).round() as i64)
}

/// Step 4: clips each polygon against the running union of all
/// higher-priority polygons already placed, in ascending-priority order,
/// then folds its surviving fragments into that union. Mirrors the
/// running-accumulator idiom `ClosedPoly::build_btg_airport_feature` uses
/// for the same "subtract what's already claimed, then claim mine"
/// pattern.
fn clip_by_priority(inputs: Vec<LandclassInput>) -> Vec<(AreaType, Vec<ShapeEntry>)> {
    let mut grouped: HashMap<AreaType, Vec<ShapeEntry>> = HashMap::new();
    for input in inputs {
        let tex_params = input.tex_params.unwrap_or_else(|| {
            let ref_point = input.polygon.outer().map(|o| o.centroid()).unwrap_or(Point2::new(0.0, 0.0));
            TexCoordParams::terrain(ref_point)
        });
        grouped.entry(input.area_type).or_default().push(ShapeEntry {
            polygon: input.polygon,
            tex_params,
            fixed_elevation_m: input.fixed_elevation_m,
        });
    }

    let mut area_types: Vec<AreaType> = grouped.keys().copied().collect();
    area_types.sort_by_key(|a| a.priority());

    let mut accum: Vec<Polygon> = Vec::new();
    let mut out = Vec::new();
    for area_type in area_types {
        let entries = grouped.remove(&area_type).unwrap_or_default();
        let mut kept = Vec::new();
        for entry in entries {
            let running = crate::clipper::union_all(&accum).into_iter().next().unwrap_or_else(|| Polygon::empty(entry.polygon.tex_method));
            let clipped_fragments = crate::clipper::difference(&entry.polygon, &running);
            for fragment in &clipped_fragments {
                accum.push(fragment.clone());
            }
            for fragment in clipped_fragments {
                kept.push(ShapeEntry { polygon: fragment, tex_params: entry.tex_params, fixed_elevation_m: entry.fixed_elevation_m });
            }
        }
        if !kept.is_empty() {
            out.push((area_type, kept));
        }
    }
    out
}

/// Inserts one candidate point into a contour's edge if it lies near
/// (but not at) one of that edge's endpoints, within `eps_m` of the
/// segment — the T-junction repair pass of §4.8 step 9. Returns the
/// number of vertices inserted.
fn snap_t_junctions_into_contour(contour: &mut crate::geometry::Contour, candidates: &[Point2], eps_m: f64) -> usize {
    let mut inserted = 0;
    let mut i = 0;
    while i < contour.points.len() {
        let n = contour.points.len();
        let a = contour.points[i];
        let b = contour.points[(i + 1) % n];
        let seg = Segment::new(a, b);

        let mut found = None;
        for &candidate in candidates {
            if candidate.planar_distance_sq(&a) < 1e-18 || candidate.planar_distance_sq(&b) < 1e-18 {
                continue;
            }
            let closest = seg.closest_point(&candidate);
            if geodesy::distance_m(candidate, closest) > eps_m {
                continue;
            }
            if geodesy::distance_m(closest, a) < 1e-6 || geodesy::distance_m(closest, b) < 1e-6 {
                continue;
            }
            found = Some(closest);
            break;
        }

        if let Some(p) = found {
            contour.points.insert(i + 1, p);
            inserted += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullDiagnostics;
    use crate::geometry::{Contour, TexMethod};

    struct FlatElevation(f64);
    impl ElevationSource for FlatElevation {
        fn elevation_m(&self, _p: Point2) -> Result<f64> {
            Ok(self.0)
        }
        fn grid_samples(&self, _bounds: Rectangle) -> Vec<Point2> {
            Vec::new()
        }
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(
            Contour::new(vec![Point2::new(x0, y0), Point2::new(x1, y0), Point2::new(x1, y1), Point2::new(x0, y1)], false),
            TexMethod::ByLandClass,
        )
    }

    #[test]
    fn test_empty_landclass_marks_tile_ocean() {
        let diag = NullDiagnostics;
        let elevation = FlatElevation(0.0);
        let mut tile = Tile::new(TileId::new(0, 0), TileOptions::default());
        tile.run_stage1(&elevation, vec![], None, &diag).unwrap();
        assert!(tile.is_ocean());
    }

    #[test]
    fn test_single_square_tesselates_to_one_mesh() {
        let diag = NullDiagnostics;
        let elevation = FlatElevation(100.0);
        let mut tile = Tile::new(TileId::new(0, 0), TileOptions::default());

        let input = LandclassInput::terrain(AreaType::Grass, square(0.1, 0.1, 0.5, 0.5));
        tile.run_stage1(&elevation, vec![input], None, &diag).unwrap();
        assert!(!tile.is_ocean());

        let neighbors_1: [Option<SharedEdgeStage1>; 4] = [None, None, None, None];
        tile.run_stage2(&elevation, &neighbors_1, &diag).unwrap();
        assert!(tile.nodes.len() >= 4);
        assert!(!tile.faces.is_empty());
        for node in tile.nodes.nodes() {
            assert!((node.elevation_m - 100.0).abs() < 1e-9);
        }

        let neighbors_2: [Option<SharedEdgeStage2>; 4] = [None, None, None, None];
        tile.run_stage3(&neighbors_2, &diag).unwrap();

        let mesh = tile.into_mesh();
        assert_eq!(mesh.faces.len(), 2);
        assert!(mesh.nodes.iter().all(|n| n.normal.is_some()));
    }

    #[test]
    fn test_higher_priority_clips_lower() {
        let diag = NullDiagnostics;
        let elevation = FlatElevation(0.0);
        let mut tile = Tile::new(TileId::new(0, 0), TileOptions::default());

        let grass = LandclassInput::terrain(AreaType::Grass, square(0.0, 0.0, 1.0, 1.0));
        let pavement = LandclassInput::terrain(AreaType::AirportPavement, square(0.25, 0.25, 0.75, 0.75));
        tile.run_stage1(&elevation, vec![grass, pavement], None, &diag).unwrap();

        let grass_area: f64 = tile
            .landclass
            .iter()
            .find(|(at, _)| *at == AreaType::Grass)
            .map(|(_, shapes)| shapes.iter().map(|s| s.polygon.area()).sum())
            .unwrap_or(0.0);
        // grass must have had the pavement's footprint subtracted out
        assert!(grass_area < 1.0 - 1e-6);
    }

    #[test]
    fn test_fixed_elevation_shape_is_not_interpolated() {
        let diag = NullDiagnostics;
        let elevation = FlatElevation(50.0);
        let mut tile = Tile::new(TileId::new(0, 0), TileOptions::default());

        let params = TexCoordParams::pavement(Point2::new(0.3, 0.3), 90.0);
        let input = LandclassInput::airport(AreaType::AirportPavement, square(0.1, 0.1, 0.5, 0.5), params, 12.0);
        tile.run_stage1(&elevation, vec![input], None, &diag).unwrap();

        let neighbors_1: [Option<SharedEdgeStage1>; 4] = [None, None, None, None];
        tile.run_stage2(&elevation, &neighbors_1, &diag).unwrap();

        for node in tile.nodes.nodes() {
            assert!((node.elevation_m - 12.0).abs() < 1e-9, "expected flattened elevation, got {}", node.elevation_m);
        }
    }

    #[test]
    #[should_panic(expected = "run_stage2 called out of order")]
    fn test_stage2_before_stage1_panics() {
        let diag = NullDiagnostics;
        let elevation = FlatElevation(0.0);
        let mut tile = Tile::new(TileId::new(0, 0), TileOptions::default());
        let neighbors: [Option<SharedEdgeStage1>; 4] = [None, None, None, None];
        tile.run_stage2(&elevation, &neighbors, &diag).unwrap();
    }
}
