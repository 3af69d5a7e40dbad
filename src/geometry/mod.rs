//! Core geometric types shared across the crate.
//!
//! Almost everything upstream of the mesh stage operates in a locally
//! planar frame: longitude/latitude degrees are treated as Cartesian (x,
//! y) for Bezier evaluation, polygon clipping and cleanup. This is an
//! intentional approximation valid at the scale of a single tile; true
//! ellipsoidal math lives in [`crate::geodesy`] and is invoked only when
//! converting to ECEF for the mesh differential-geometry stage.

use nalgebra as na;

pub type EcefPoint = na::Point3<f64>;
pub type EcefVector = na::Vector3<f64>;

/// Tolerance used for coincident-point / coincident-value comparisons in
/// the locally-planar (degree) frame.
pub const EPSILON: f64 = 1e-9;

pub trait ApproxEq {
    fn approx_eq(&self, other: &Self) -> bool;
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).abs() < EPSILON
    }
}

impl ApproxEq for EcefPoint {
    fn approx_eq(&self, other: &Self) -> bool {
        na::distance_squared(self, other) < EPSILON * EPSILON
    }
}

impl ApproxEq for EcefVector {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).norm_squared() < EPSILON * EPSILON
    }
}

pub mod primitives;
pub use primitives::*;

pub mod utils_2d;

pub mod contour;
pub use contour::{Contour, Polygon, TexMethod};
