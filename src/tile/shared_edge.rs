//! Tile identity and the shared-edge records exchanged between stages 1/2
//! and 2/3 of neighboring tiles (§3 `SharedEdgeRecord`, §4.8, §6 Persisted
//! state layout).
//!
//! The original's variable-width FlightGear "bucket" grid (narrower cells
//! near the poles) is a cartography/indexing detail this crate's geometry
//! core doesn't need to reproduce exactly — it only needs *a* fixed grid
//! whose cells tile without gaps so four-sided shared-edge reconciliation
//! makes sense. A plain fixed-size degree grid stands in; see `DESIGN.md`.

use super::area_type::AreaType;
use crate::geometry::{Point2, Point3, Rectangle};
use serde::{Deserialize, Serialize};

/// Width/height of one tile cell in degrees.
pub const TILE_SIZE_DEG: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    pub lon_index: i32,
    pub lat_index: i32,
}

impl TileId {
    pub fn new(lon_index: i32, lat_index: i32) -> Self {
        Self { lon_index, lat_index }
    }

    pub fn containing(p: Point2) -> Self {
        Self {
            lon_index: (p.lon / TILE_SIZE_DEG).floor() as i32,
            lat_index: (p.lat / TILE_SIZE_DEG).floor() as i32,
        }
    }

    pub fn bounds(&self) -> Rectangle {
        let lon0 = self.lon_index as f64 * TILE_SIZE_DEG;
        let lat0 = self.lat_index as f64 * TILE_SIZE_DEG;
        Rectangle::from_points(&[
            Point2::new(lon0, lat0),
            Point2::new(lon0 + TILE_SIZE_DEG, lat0 + TILE_SIZE_DEG),
        ])
    }

    pub fn neighbor(&self, side: Side) -> TileId {
        match side {
            Side::North => TileId::new(self.lon_index, self.lat_index + 1),
            Side::South => TileId::new(self.lon_index, self.lat_index - 1),
            Side::East => TileId::new(self.lon_index + 1, self.lat_index),
            Side::West => TileId::new(self.lon_index - 1, self.lat_index),
        }
    }

    /// The tile-bucket path segment used for the persisted-state layout
    /// in §6 (`<share>/<tile-bucket-path>/...`).
    pub fn bucket_path(&self) -> String {
        format!("{}_{}", self.lon_index, self.lat_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    North,
    South,
    East,
    West,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::South, Side::East, Side::West];

    pub fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::South => Side::North,
            Side::East => Side::West,
            Side::West => Side::East,
        }
    }

    /// Whether `p` lies on this side of `bounds` within `eps_deg`.
    pub fn contains(self, bounds: &Rectangle, p: Point2, eps_deg: f64) -> bool {
        match self {
            Side::North => (p.lat - bounds.max.lat).abs() <= eps_deg,
            Side::South => (p.lat - bounds.min.lat).abs() <= eps_deg,
            Side::East => (p.lon - bounds.max.lon).abs() <= eps_deg,
            Side::West => (p.lon - bounds.min.lon).abs() <= eps_deg,
        }
    }
}

/// Stage-1 artifact (§4.8 step 6): every polygon vertex on one tile side,
/// in no particular order — stage 2 only needs the point set to detect
/// and repair T-junctions, not a connected chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedEdgeStage1 {
    pub tile: TileId,
    pub side: Side,
    pub points: Vec<Point2>,
}

/// Enough geometry about one neighbor-tile face incident to a shared
/// boundary node for *this* tile to independently compute that face's
/// area and normal (§4.7) without re-deriving the neighbor's internal
/// node/face indices — those only make sense inside the neighbor's own
/// arena. This is the concrete encoding chosen for §3's abstract
/// "adjacent-face descriptors"; see `DESIGN.md`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NeighborFace {
    pub area_type: AreaType,
    pub vertices: [Point3; 3],
}

/// One boundary node as seen by the neighbor tile that produced it: its
/// 3D position and the faces it touches on that side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedBoundaryNode {
    pub position: Point3,
    pub faces: Vec<NeighborFace>,
}

/// Stage-2 artifact (§4.8 step 15), read by stage 3 of the tile across
/// this side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedEdgeStage2 {
    pub tile: TileId,
    pub side: Side,
    pub nodes: Vec<SharedBoundaryNode>,
}
