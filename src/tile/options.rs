//! Tunables and the two external-service traits the tile construct
//! consumes (§1: "the core consumes an elevation sampling service
//! `Elev(lon,lat)->meters` and a land-cover classifier").

use super::area_type::AreaType;
use crate::error::Result;
use crate::geometry::{Point2, Rectangle};

/// Samples elevation at a point and seeds the stage-1 grid. The raw
/// elevation-grid file reader is out of scope (§1) — this is the
/// boundary the core actually depends on.
pub trait ElevationSource {
    fn elevation_m(&self, p: Point2) -> Result<f64>;

    /// Seed points for stage 1 step 1 ("Load elevation grid and seed Node
    /// set with grid samples"). A caller backed by a raster grid returns
    /// its sample-point lattice inside `bounds`.
    fn grid_samples(&self, bounds: Rectangle) -> Vec<Point2>;
}

/// Classifies a point's land cover when the optional `--cover` raster is
/// configured (§4.8 stage 1 step 3). The raster reader itself is out of
/// scope (§1); this is the classification boundary the core depends on.
pub trait LandCoverClassifier {
    fn classify(&self, p: Point2) -> Option<AreaType>;
}

/// Equivalent fields for the CLI tunables in §6 that this crate doesn't
/// parse itself (`--nudge`, `--cover`, max split length, base/clearing
/// offsets), plus the epsilons named throughout §4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileOptions {
    /// `--ignore-landmass`: treat the tile as land even with no land-class
    /// polygons loaded (skips the early ocean-tile exit).
    pub ignore_landmass: bool,
    /// `--nudge <eps>`: a small positional jitter budget some original
    /// T-junction-repair heuristics use to avoid exact-collinearity
    /// corner cases; exposed but unused by this crate's repair pass, which
    /// snaps exactly rather than nudging.
    pub nudge_m: f64,
    /// Airport superpoly edge-length cap before tesselation (§4.3).
    pub max_edge_length_m: f64,
    /// Tolerance for "this vertex lies on this tile side" (§4.8 step 6).
    pub edge_snap_eps_m: f64,
    /// T-junction snap tolerance (§4.8 step 9, `T_EPS`).
    pub t_junction_eps_m: f64,
    /// Airport base polygon expansion (§4.3, §GLOSSARY).
    pub base_expand_m: f64,
    /// Airport clearing polygon expansion (§4.3, §GLOSSARY).
    pub clearing_expand_m: f64,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            ignore_landmass: false,
            nudge_m: 0.0,
            max_edge_length_m: 400.0,
            edge_snap_eps_m: 0.3,
            t_junction_eps_m: 0.3,
            base_expand_m: 20.0,
            clearing_expand_m: 50.0,
        }
    }
}
