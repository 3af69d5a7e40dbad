//! Texture coordinate generation (§4.8 step 20): by geodetic reference
//! point and texture heading for pavement, by land-class table for
//! terrain. The catalogue of texture tables themselves is out of scope
//! (§1 Non-goals); this only produces the repeating UV lattice a texture
//! table would be indexed by.

use crate::geodesy::TangentPlane;
use crate::geometry::{Point2, TexMethod};

/// One texture repeat covers this many meters on a side. Matches the
/// original's `tile_width`/`tile_height` default for land-class terrain
/// texturing in the absence of a per-material override (out of scope
/// here per §1).
pub const DEFAULT_TEXTURE_TILE_M: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexCoordParams {
    pub ref_point: Point2,
    pub heading_deg: f64,
    pub tile_size_m: f64,
}

impl TexCoordParams {
    pub fn pavement(ref_point: Point2, heading_deg: f64) -> Self {
        Self { ref_point, heading_deg, tile_size_m: DEFAULT_TEXTURE_TILE_M }
    }

    pub fn terrain(ref_point: Point2) -> Self {
        Self { ref_point, heading_deg: 0.0, tile_size_m: DEFAULT_TEXTURE_TILE_M }
    }
}

/// Computes one vertex's (u, v) given its tex method and params.
///
/// Pavement (`ByRefAndHeading`): rotate the vertex into a frame aligned
/// with the runway/taxiway heading before dividing by the repeat size, so
/// the texture's stripe direction matches the pavement's heading
/// regardless of the tile's absolute orientation.
///
/// Terrain (`ByLandClass`): no rotation — textures tile in a fixed
/// world-aligned (east, north) lattice so adjacent land-class polygons of
/// the same material share seams without needing to agree on heading.
pub fn vertex_uv(method: TexMethod, params: &TexCoordParams, vertex: Point2) -> [f32; 2] {
    let plane = TangentPlane::new(params.ref_point);
    let (east_m, north_m) = plane.to_local_m(vertex);

    let (u_m, v_m) = match method {
        TexMethod::ByRefAndHeading => {
            let theta = (-params.heading_deg).to_radians();
            let (sin_t, cos_t) = theta.sin_cos();
            (east_m * cos_t - north_m * sin_t, east_m * sin_t + north_m * cos_t)
        }
        TexMethod::ByLandClass => (east_m, north_m),
    };

    [(u_m / params.tile_size_m) as f32, (v_m / params.tile_size_m) as f32]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_uv_scales_with_distance_from_ref() {
        let params = TexCoordParams::terrain(Point2::new(0.0, 0.0));
        let uv_at_ref = vertex_uv(TexMethod::ByLandClass, &params, Point2::new(0.0, 0.0));
        assert!((uv_at_ref[0]).abs() < 1e-6 && (uv_at_ref[1]).abs() < 1e-6);

        let far = Point2::new(0.01, 0.0); // ~1.1 km east
        let uv_far = vertex_uv(TexMethod::ByLandClass, &params, far);
        assert!(uv_far[0] > 0.5);
    }

    #[test]
    fn test_pavement_uv_rotates_with_heading() {
        let ref_point = Point2::new(0.0, 0.0);
        let vertex = Point2::new(0.01, 0.0); // due east of ref

        let unrotated = TexCoordParams::pavement(ref_point, 0.0);
        let rotated = TexCoordParams::pavement(ref_point, 90.0);

        let uv_unrotated = vertex_uv(TexMethod::ByRefAndHeading, &unrotated, vertex);
        let uv_rotated = vertex_uv(TexMethod::ByRefAndHeading, &rotated, vertex);

        // Rotating the heading by 90 degrees should swap which axis the
        // eastward point projects onto.
        assert!(uv_unrotated[0].abs() > uv_unrotated[1].abs());
        assert!(uv_rotated[1].abs() > uv_rotated[0].abs());
    }
}
