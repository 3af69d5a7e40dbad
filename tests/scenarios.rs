//! Integration-level scenarios spanning more than one module: a composed
//! pavement feature, a polygon-with-hole tesselation, a cubic Bezier ring
//! folded into a polygon, tile-construct T-junction repair, and
//! shared-boundary elevation reconciliation between two neighboring tiles.

use tile_geom_core::bezier::{BezContour, BezNode};
use tile_geom_core::closedpoly::ClosedPoly;
use tile_geom_core::diagnostics::NullDiagnostics;
use tile_geom_core::geometry::{utils_2d, Contour, Point2, Polygon, TexMethod};
use tile_geom_core::intersection_graph::{EdgeKind, IntersectionGraph};
use tile_geom_core::tile::{AreaType, ElevationSource, LandclassInput, SharedEdgeStage1, SharedEdgeStage2, Side, Tile, TileId, TileOptions};
use tile_geom_core::error::Result;
use tile_geom_core::geometry::Rectangle;

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Contour {
    Contour::new(vec![Point2::new(x0, y0), Point2::new(x1, y0), Point2::new(x1, y1), Point2::new(x0, y1)], false)
}

/// Scenario 1: a single-contour taxiway pavement feature composed through
/// `ClosedPoly`, clipped against an initially empty accumulator.
#[test]
fn pavement_feature_builds_against_empty_accumulator() {
    let diag = NullDiagnostics;
    let mut poly = ClosedPoly::new_pavement(1, 0.0, 90.0, "taxiway A");

    for p in [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(1.0, 1.0), Point2::new(0.0, 1.0)] {
        poly.add_node(BezNode::linear(p));
    }
    poly.close_cur_contour(&diag);
    poly.finish(&diag);

    let mut accum = Vec::new();
    let mut apt_base = None;
    let mut apt_clearing = None;
    let (built, material) = poly
        .build_btg_airport_feature(&mut accum, &mut apt_base, &mut apt_clearing, &diag)
        .expect("building against an empty accumulator must succeed");

    assert_eq!(material, "pa_tiedown");
    assert!(!built.is_empty());
    assert!(built.area() > 0.9 && built.area() <= 1.0 + 1e-6);
    assert_eq!(accum.len(), 1, "the feature must fold itself into the accumulator");
    let base = apt_base.expect("base ring must be populated");
    let clearing = apt_clearing.expect("clearing ring must be populated");
    assert!(clearing.area() > base.area(), "the 50m clearing ring must be larger than the 20m base ring");
}

/// Scenario 2: a square with a square hole tesselates into triangles whose
/// total area matches the polygon's own hole-subtracted area.
#[test]
fn polygon_with_hole_tesselates_to_matching_area() {
    let mut poly = Polygon::new(square(0.0, 0.0, 10.0, 10.0), TexMethod::ByLandClass);
    poly.add_hole(square(2.0, 2.0, 4.0, 4.0));
    assert!((poly.area() - 96.0).abs() < 1e-9);

    let (vertices, tris) = tile_geom_core::mesh::tesselate(&poly).expect("polygon with one hole must tesselate");
    let mut total = 0.0;
    for tri in &tris {
        let a = vertices[tri[0]];
        let b = vertices[tri[1]];
        let c = vertices[tri[2]];
        total += utils_2d::polygon_area(&[a, b, c]);
    }
    assert!((total - poly.area()).abs() < 1e-6, "triangulated area {total} should match polygon area {}", poly.area());
}

/// Scenario 3: a cubic Bezier ring (two nodes, reused from the semicircle
/// construction) flattens into a closed [`Contour`] whose polygon area
/// approximates a circle of the same nominal radius, once folded into a
/// full [`Polygon`] and measured via the shoelace formula rather than just
/// inspecting raw vertices.
#[test]
fn cubic_bezier_ring_flattens_into_plausible_circle_area() {
    let k = 1.333_333_333_333;
    let right = Point2::new(1.0, 0.0);
    let left = Point2::new(-1.0, 0.0);

    let bc = BezContour::new(vec![
        BezNode { pt: right, next_cp: Some(Point2::new(1.0, k)), prev_cp: Some(Point2::new(1.0, -k)) },
        BezNode { pt: left, next_cp: Some(Point2::new(-1.0, -k)), prev_cp: Some(Point2::new(-1.0, k)) },
    ]);

    let outer = tile_geom_core::bezier::flatten(&bc, false);
    assert_eq!(outer.points.len(), tile_geom_core::bezier::BEZIER_DETAIL * 2);

    let poly = Polygon::new(outer, TexMethod::ByLandClass);
    // A unit-radius circle has area pi; the 2-segment cubic approximation
    // overshoots a little but should stay in a sane ballpark.
    assert!(poly.area() > 2.5 && poly.area() < 4.5, "area out of range: {}", poly.area());
}

struct ConstElevation(f64);
impl ElevationSource for ConstElevation {
    fn elevation_m(&self, _p: Point2) -> Result<f64> {
        Ok(self.0)
    }
    fn grid_samples(&self, _bounds: Rectangle) -> Vec<Point2> {
        Vec::new()
    }
}

/// Scenario 4: two adjacent land-class shapes meet at a shared edge where
/// one side has an extra mid-edge vertex the other doesn't. Tile
/// construct's T-junction repair must insert a matching vertex into the
/// plain side so the shared node ends up touched by faces from both
/// shapes rather than leaving a crack.
#[test]
fn t_junction_repair_unifies_shared_boundary_vertex() {
    let diag = NullDiagnostics;
    let elevation = ConstElevation(10.0);
    let mut tile = Tile::new(TileId::new(0, 0), TileOptions::default());

    // Left shape: a plain rectangle with no vertex at the midpoint of its
    // shared (right) edge.
    let left = Polygon::new(
        Contour::new(vec![Point2::new(0.0, 0.0), Point2::new(0.3, 0.0), Point2::new(0.3, 1.0), Point2::new(0.0, 1.0)], false),
        TexMethod::ByLandClass,
    );
    // Right shape: shares the same edge, but with an extra vertex at its
    // midpoint (0.3, 0.5) -- a T-junction against the left shape's edge.
    let right = Polygon::new(
        Contour::new(
            vec![
                Point2::new(0.3, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.3, 1.0),
                Point2::new(0.3, 0.5),
            ],
            false,
        ),
        TexMethod::ByLandClass,
    );

    let inputs = vec![LandclassInput::terrain(AreaType::Grass, left), LandclassInput::terrain(AreaType::Urban, right)];
    tile.run_stage1(&elevation, inputs, None, &diag).unwrap();
    assert!(!tile.is_ocean());

    let no_neighbors_1: [Option<SharedEdgeStage1>; 4] = [None, None, None, None];
    tile.run_stage2(&elevation, &no_neighbors_1, &diag).unwrap();

    let no_neighbors_2: [Option<SharedEdgeStage2>; 4] = [None, None, None, None];
    tile.run_stage3(&no_neighbors_2, &diag).unwrap();

    let mesh = tile.into_mesh();
    let midpoint_idx = mesh
        .nodes
        .iter()
        .position(|n| n.pos.planar_distance(&Point2::new(0.3, 0.5)) < 1e-6)
        .expect("the shared midpoint vertex must be present in the node set");

    let touching_area_types: std::collections::HashSet<AreaType> =
        mesh.faces.iter().filter(|f| f.nodes.contains(&midpoint_idx)).map(|f| f.id.area_type).collect();

    assert!(
        touching_area_types.contains(&AreaType::Grass) && touching_area_types.contains(&AreaType::Urban),
        "expected the repaired midpoint vertex to be touched by faces from both shapes, got {touching_area_types:?}"
    );
}

/// Scenario 5: two east/west neighboring tiles, each fed a deliberately
/// mismatched constant elevation (standing in for two grids sampled at
/// different resolutions), must agree exactly on their shared boundary's
/// elevation after stage 3's averaging pass.
#[test]
fn shared_boundary_elevation_matches_between_neighboring_tiles() {
    let diag = NullDiagnostics;

    let west_id = TileId::new(0, 0);
    let east_id = TileId::new(1, 0);

    let west_elev = ConstElevation(100.2);
    let east_elev = ConstElevation(99.8);

    let mut west = Tile::new(west_id, TileOptions::default());
    let west_square = Polygon::new(square(0.0, 0.0, 1.0, 1.0), TexMethod::ByLandClass);
    west.run_stage1(&west_elev, vec![LandclassInput::terrain(AreaType::Grass, west_square)], None, &diag).unwrap();

    let mut east = Tile::new(east_id, TileOptions::default());
    let east_square = Polygon::new(square(1.0, 0.0, 2.0, 1.0), TexMethod::ByLandClass);
    east.run_stage1(&east_elev, vec![LandclassInput::terrain(AreaType::Grass, east_square)], None, &diag).unwrap();

    // Exchange stage-1 shared-edge records: west's East side feeds east's
    // West-side neighbor slot, and vice versa.
    let west_east_record = west.shared_edge_stage1(Side::East);
    let east_west_record = east.shared_edge_stage1(Side::West);

    // Tile::run_stage2's neighbor array is indexed by Side::ALL = [North, South, East, West].
    let west_neighbors_1: [Option<SharedEdgeStage1>; 4] = [None, None, east_west_record.clone(), None];
    let east_neighbors_1: [Option<SharedEdgeStage1>; 4] = [None, None, None, west_east_record.clone()];

    west.run_stage2(&west_elev, &west_neighbors_1, &diag).unwrap();
    east.run_stage2(&east_elev, &east_neighbors_1, &diag).unwrap();

    let west_east_stage2 = west.shared_edge_stage2(Side::East);
    let east_west_stage2 = east.shared_edge_stage2(Side::West);

    let west_neighbors_2: [Option<SharedEdgeStage2>; 4] = [None, None, east_west_stage2.clone(), None];
    let east_neighbors_2: [Option<SharedEdgeStage2>; 4] = [None, None, None, west_east_stage2.clone()];

    west.run_stage3(&west_neighbors_2, &diag).unwrap();
    east.run_stage3(&east_neighbors_2, &diag).unwrap();

    let west_mesh = west.into_mesh();
    let east_mesh = east.into_mesh();

    let west_boundary: Vec<f64> = west_mesh
        .nodes
        .iter()
        .filter(|n| (n.pos.lon - 1.0).abs() < 1e-6)
        .map(|n| n.elevation_m)
        .collect();
    let east_boundary: Vec<f64> = east_mesh
        .nodes
        .iter()
        .filter(|n| (n.pos.lon - 1.0).abs() < 1e-6)
        .map(|n| n.elevation_m)
        .collect();

    assert!(!west_boundary.is_empty() && !east_boundary.is_empty(), "both tiles must have nodes on the shared edge");
    for z in west_boundary.iter().chain(east_boundary.iter()) {
        assert!((z - 100.0).abs() < 1e-6, "expected the averaged elevation 100.0, got {z}");
    }
}

/// Scenario 6: an intersection edge completed with no multi-segment corner
/// constraints falls back to its side-line intersections, producing the
/// expected four-corner rectangular contour on both sides, and the two
/// contours concatenate into a valid closed polygon.
#[test]
fn intersection_edge_completes_to_rectangular_polygon_without_corners() {
    let diag = NullDiagnostics;
    let mut graph = IntersectionGraph::new();
    let a = graph.add_node(Point2::new(-122.0, 47.0));
    let b = graph.add_node(Point2::new(-122.0, 47.01));
    let edge = graph.add_edge(a, b, 20.0, EdgeKind::Taxiway);

    graph.complete(edge, &diag);
    graph.perpendicular_split(edge);

    let poly = graph.edge_polygon(edge);
    let outer = poly.outer().expect("edge polygon must have an outer contour");
    assert!(outer.points.len() >= 4);
    assert!(poly.area() > 0.0);
}
