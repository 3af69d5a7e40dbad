//! WGS84 ellipsoidal geodesy: direct/inverse problems, ECEF conversion,
//! and a local tangent-plane helper for sub-meter-scale math.
//!
//! Everything here is pure and fails only on non-finite input, which is a
//! programmer error (the caller handed us a NaN), not a data error — so
//! these functions panic rather than returning `Result`, matching §7's
//! "internal invariants ... abort process" policy.

use crate::geometry::{EcefPoint, EcefVector, Point2, Point3};
use nalgebra as na;

/// WGS84 semi-major axis, meters.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

/// Mean radius used for the equirectangular local-tangent-plane
/// approximation; not used for `direct`/`inverse`, which are ellipsoidal.
const MEAN_RADIUS_M: f64 = 6_371_000.0;

fn check_finite(label: &str, v: f64) {
    assert!(v.is_finite(), "geodesy: non-finite input to {label}: {v}");
}

/// Vincenty inverse problem: course and distance from `a` to `b`.
/// Returns `(azimuth_ab_deg, azimuth_ba_deg, distance_m)`.
pub fn inverse(a: Point2, b: Point2) -> (f64, f64, f64) {
    check_finite("inverse.a.lon", a.lon);
    check_finite("inverse.a.lat", a.lat);
    check_finite("inverse.b.lon", b.lon);
    check_finite("inverse.b.lat", b.lat);

    if a.approx_eq_deg(&b) {
        return (0.0, 180.0, 0.0);
    }

    let f = WGS84_F;
    let l = (b.lon - a.lon).to_radians();
    let u1 = ((1.0 - f) * a.lat.to_radians().tan()).atan();
    let u2 = ((1.0 - f) * b.lat.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut iter_limit = 100;
    let (mut sin_sigma, mut cos_sigma, mut sigma, mut cos_sq_alpha, mut cos2_sigma_m);
    loop {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            return (0.0, 180.0, 0.0); // coincident points
        }
        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        cos2_sigma_m = if cos_sq_alpha.abs() < 1e-12 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
        let lambda_prev = lambda;
        lambda = l
            + (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos2_sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos2_sigma_m * cos2_sigma_m)));
        iter_limit -= 1;
        if (lambda - lambda_prev).abs() < 1e-12 || iter_limit == 0 {
            break;
        }
    }

    let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
    let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    let delta_sigma = big_b
        * sin_sigma
        * (cos2_sigma_m
            + big_b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos2_sigma_m * cos2_sigma_m)
                    - big_b / 6.0
                        * cos2_sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos2_sigma_m * cos2_sigma_m)));

    let distance = WGS84_B * big_a * (sigma - delta_sigma);

    let (sin_lambda, cos_lambda) = lambda.sin_cos();
    let alpha1 = (cos_u2 * sin_lambda).atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
    let alpha2 = (cos_u1 * sin_lambda).atan2(-sin_u1 * cos_u2 + cos_u1 * sin_u2 * cos_lambda);

    let az_ab = (alpha1.to_degrees() + 360.0) % 360.0;
    let az_ba = (alpha2.to_degrees() + 180.0 + 360.0) % 360.0;

    (az_ab, az_ba, distance)
}

/// Vincenty direct problem: destination point and back-azimuth given a
/// starting point, forward azimuth (degrees from north), and distance
/// (meters).
pub fn direct(a: Point2, azimuth_deg: f64, distance_m: f64) -> (Point2, f64) {
    check_finite("direct.a.lon", a.lon);
    check_finite("direct.a.lat", a.lat);
    check_finite("direct.azimuth_deg", azimuth_deg);
    check_finite("direct.distance_m", distance_m);

    let f = WGS84_F;
    let alpha1 = azimuth_deg.to_radians();
    let (sin_alpha1, cos_alpha1) = alpha1.sin_cos();

    let tan_u1 = (1.0 - f) * a.lat.to_radians().tan();
    let cos_u1 = 1.0 / (1.0 + tan_u1 * tan_u1).sqrt();
    let sin_u1 = tan_u1 * cos_u1;

    let sigma1 = tan_u1.atan2(cos_alpha1);

    let sin_alpha = cos_u1 * sin_alpha1;
    let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
    let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
    let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));

    let mut sigma = distance_m / (WGS84_B * big_a);
    let mut sigma_prev;
    let mut cos2_sigma_m;
    loop {
        cos2_sigma_m = (2.0 * sigma1 + sigma).cos();
        let sin_sigma = sigma.sin();
        let cos_sigma = sigma.cos();
        let delta_sigma = big_b
            * sin_sigma
            * (cos2_sigma_m
                + big_b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * cos2_sigma_m * cos2_sigma_m)
                        - big_b / 6.0
                            * cos2_sigma_m
                            * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                            * (-3.0 + 4.0 * cos2_sigma_m * cos2_sigma_m)));
        sigma_prev = sigma;
        sigma = distance_m / (WGS84_B * big_a) + delta_sigma;
        if (sigma - sigma_prev).abs() < 1e-12 {
            break;
        }
    }

    let (sin_sigma, cos_sigma) = sigma.sin_cos();
    let tmp = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_alpha1;
    let lat2 = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_alpha1)
        .atan2((1.0 - f) * (sin_alpha * sin_alpha + tmp * tmp).sqrt());
    let lambda = (sin_sigma * sin_alpha1).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_alpha1);
    let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
    let l = lambda
        - (1.0 - c)
            * f
            * sin_alpha
            * (sigma + c * sin_sigma * (cos2_sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos2_sigma_m * cos2_sigma_m)));

    let lon2 = a.lon + l.to_degrees();
    let back_azimuth = (sin_alpha.atan2(-tmp).to_degrees() + 360.0) % 360.0;

    (Point2::new(lon2, lat2.to_degrees()), back_azimuth)
}

/// Forward azimuth and distance, convenience wrapper over [`inverse`].
pub fn course_deg(a: Point2, b: Point2) -> f64 {
    inverse(a, b).0
}

pub fn distance_m(a: Point2, b: Point2) -> f64 {
    inverse(a, b).2
}

/// Converts a geodetic point to ECEF Cartesian coordinates on the WGS84
/// ellipsoid, used by the mesh stage's face/vertex normal computation.
pub fn geod_to_ecef(p: Point3) -> EcefPoint {
    let lon = p.pos.lon.to_radians();
    let lat = p.pos.lat.to_radians();
    let e_sq = 1.0 - (WGS84_B * WGS84_B) / (WGS84_A * WGS84_A);
    let sin_lat = lat.sin();
    let n = WGS84_A / (1.0 - e_sq * sin_lat * sin_lat).sqrt();

    let x = (n + p.elevation_m) * lat.cos() * lon.cos();
    let y = (n + p.elevation_m) * lat.cos() * lon.sin();
    let z = (n * (1.0 - e_sq) + p.elevation_m) * sin_lat;

    na::Point3::new(x, y, z)
}

/// The "up" direction at a point — the normalized ECEF radial, used as the
/// degenerate-triangle fallback normal in §4.7.
pub fn ecef_up(p: EcefPoint) -> EcefVector {
    p.coords.normalize()
}

/// A locally-planar (east, north) tangent-plane projector centered at
/// `origin`, used by the Bezier flattener and polygon cleanup, which
/// intentionally treat small neighborhoods as Cartesian.
pub struct TangentPlane {
    origin: Point2,
    meters_per_deg_lon: f64,
    meters_per_deg_lat: f64,
}

impl TangentPlane {
    pub fn new(origin: Point2) -> Self {
        let lat_rad = origin.lat.to_radians();
        Self {
            origin,
            meters_per_deg_lon: MEAN_RADIUS_M.to_radians() * lat_rad.cos(),
            meters_per_deg_lat: MEAN_RADIUS_M.to_radians(),
        }
    }

    /// East/north offset in meters of `p` relative to the tangent origin.
    pub fn to_local_m(&self, p: Point2) -> (f64, f64) {
        (
            (p.lon - self.origin.lon) * self.meters_per_deg_lon,
            (p.lat - self.origin.lat) * self.meters_per_deg_lat,
        )
    }

    pub fn from_local_m(&self, east_m: f64, north_m: f64) -> Point2 {
        Point2::new(
            self.origin.lon + east_m / self.meters_per_deg_lon,
            self.origin.lat + north_m / self.meters_per_deg_lat,
        )
    }
}

impl Point2 {
    fn approx_eq_deg(&self, other: &Point2) -> bool {
        (self.lon - other.lon).abs() < 1e-12 && (self.lat - other.lat).abs() < 1e-12
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_then_inverse_round_trips() {
        let start = Point2::new(-122.0, 47.0);
        let (dest, _back_az) = direct(start, 90.0, 1000.0);
        let (az, _, dist) = inverse(start, dest);
        assert!((dist - 1000.0).abs() < 1e-3, "dist={dist}");
        assert!((az - 90.0).abs() < 1e-6, "az={az}");
    }

    #[test]
    fn test_inverse_coincident_points_is_zero() {
        let p = Point2::new(10.0, 10.0);
        let (_, _, dist) = inverse(p, p);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn test_tangent_plane_round_trips() {
        let origin = Point2::new(-122.0, 47.0);
        let plane = TangentPlane::new(origin);
        let p = Point2::new(-121.999, 47.001);
        let (e, n) = plane.to_local_m(p);
        let back = plane.from_local_m(e, n);
        assert!((back.lon - p.lon).abs() < 1e-9);
        assert!((back.lat - p.lat).abs() < 1e-9);
    }

    #[test]
    fn test_ecef_up_is_unit_length() {
        let p = geod_to_ecef(Point3::new(10.0, 20.0, 0.0));
        let up = ecef_up(p);
        assert!((up.norm() - 1.0).abs() < 1e-9);
    }
}
