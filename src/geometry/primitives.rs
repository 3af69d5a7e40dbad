use super::{ApproxEq, EPSILON};
use serde::{Deserialize, Serialize};

/// A geodetic coordinate. `lon` is normalized into `[-180, 180)` and `lat`
/// clamped to `[-90, 90]` on construction, per the data model's invariant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub lon: f64,
    pub lat: f64,
}

impl Point2 {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon: normalize_lon(lon),
            lat: lat.clamp(-90.0, 90.0),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// Planar distance treating (lon, lat) as Cartesian. Used by cleanup
    /// and Bezier code, which intentionally work in this locally-planar
    /// approximation rather than on the ellipsoid.
    pub fn planar_distance(&self, other: &Point2) -> f64 {
        self.planar_distance_sq(other).sqrt()
    }

    pub fn planar_distance_sq(&self, other: &Point2) -> f64 {
        let dx = self.lon - other.lon;
        let dy = self.lat - other.lat;
        dx * dx + dy * dy
    }

    pub fn lerp(&self, other: &Point2, t: f64) -> Point2 {
        Point2::new(
            self.lon + (other.lon - self.lon) * t,
            self.lat + (other.lat - self.lat) * t,
        )
    }
}

impl ApproxEq for Point2 {
    fn approx_eq(&self, other: &Self) -> bool {
        self.planar_distance_sq(other) < EPSILON * EPSILON
    }
}

/// A [`Point2`] plus an elevation in meters above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub pos: Point2,
    pub elevation_m: f64,
}

impl Point3 {
    pub fn new(lon: f64, lat: f64, elevation_m: f64) -> Self {
        Self {
            pos: Point2::new(lon, lat),
            elevation_m,
        }
    }

    pub fn from_point2(pos: Point2, elevation_m: f64) -> Self {
        Self { pos, elevation_m }
    }
}

/// A directed line segment in the locally-planar (lon, lat-as-Cartesian) frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point2,
    pub end: Point2,
}

impl Segment {
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    pub fn direction(&self) -> (f64, f64) {
        (self.end.lon - self.start.lon, self.end.lat - self.start.lat)
    }

    pub fn length(&self) -> f64 {
        self.start.planar_distance(&self.end)
    }

    /// Point at parameter `t` in `[0, 1]`.
    pub fn at(&self, t: f64) -> Point2 {
        self.start.lerp(&self.end, t)
    }

    /// Closest point on the segment (clamped to `[0, 1]`) to `p`.
    pub fn closest_point(&self, p: &Point2) -> Point2 {
        let (dx, dy) = self.direction();
        let len_sq = dx * dx + dy * dy;
        if len_sq < EPSILON * EPSILON {
            return self.start;
        }
        let t = ((p.lon - self.start.lon) * dx + (p.lat - self.start.lat) * dy) / len_sq;
        self.at(t.clamp(0.0, 1.0))
    }

    pub fn distance_to_point(&self, p: &Point2) -> f64 {
        p.planar_distance(&self.closest_point(p))
    }
}

/// An infinite ray anchored at `origin` pointing along `direction`
/// (not normalized; callers may use the raw slope).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Point2,
    pub direction: (f64, f64),
}

impl Ray {
    pub fn new(origin: Point2, direction: (f64, f64)) -> Self {
        Self { origin, direction }
    }

    pub fn from_angle_deg(origin: Point2, course_deg: f64) -> Self {
        let rad = course_deg.to_radians();
        // course is measured clockwise from north (lat-positive axis)
        Self {
            origin,
            direction: (rad.sin(), rad.cos()),
        }
    }

    pub fn at(&self, t: f64) -> Point2 {
        Point2::new(
            self.origin.lon + self.direction.0 * t,
            self.origin.lat + self.direction.1 * t,
        )
    }
}

/// An infinite line through two points (kept distinct from [`Ray`] since
/// line-line intersection does not care about direction sign or origin).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Line {
    pub a: Point2,
    pub b: Point2,
}

impl Line {
    pub fn new(a: Point2, b: Point2) -> Self {
        Self { a, b }
    }

    /// Intersection with another infinite line, or `None` if parallel
    /// (within [`EPSILON`]).
    pub fn intersect(&self, other: &Line) -> Option<Point2> {
        super::utils_2d::line_line_intersect_unbounded(
            [self.a.lon, self.a.lat],
            [self.b.lon, self.b.lat],
            [other.a.lon, other.a.lat],
            [other.b.lon, other.b.lat],
        )
        .map(|[x, y]| Point2::new(x, y))
    }
}

/// Axis-aligned bounding rectangle in the locally-planar frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rectangle {
    pub min: Point2,
    pub max: Point2,
}

impl Rectangle {
    pub fn empty() -> Self {
        Self {
            min: Point2 { lon: f64::INFINITY, lat: f64::INFINITY },
            max: Point2 { lon: f64::NEG_INFINITY, lat: f64::NEG_INFINITY },
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Self {
        let mut r = Self::empty();
        for p in points {
            r.extend(p);
        }
        r
    }

    pub fn extend(&mut self, p: &Point2) {
        self.min.lon = self.min.lon.min(p.lon);
        self.min.lat = self.min.lat.min(p.lat);
        self.max.lon = self.max.lon.max(p.lon);
        self.max.lat = self.max.lat.max(p.lat);
    }

    pub fn merge(&self, other: &Rectangle) -> Rectangle {
        let mut r = *self;
        r.extend(&other.min);
        r.extend(&other.max);
        r
    }

    pub fn contains(&self, p: &Point2) -> bool {
        p.lon >= self.min.lon && p.lon <= self.max.lon && p.lat >= self.min.lat && p.lat <= self.max.lat
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.min.lon <= other.max.lon
            && self.max.lon >= other.min.lon
            && self.min.lat <= other.max.lat
            && self.max.lat >= other.min.lat
    }
}

fn normalize_lon(lon: f64) -> f64 {
    let mut l = lon % 360.0;
    if l >= 180.0 {
        l -= 360.0;
    } else if l < -180.0 {
        l += 360.0;
    }
    l
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point2_normalizes_longitude() {
        let p = Point2::new(190.0, 10.0);
        assert!((p.lon - (-170.0)).abs() < 1e-9);
    }

    #[test]
    fn test_segment_closest_point_clamped() {
        let seg = Segment::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        let closest = seg.closest_point(&Point2::new(2.0, 1.0));
        assert!(closest.approx_eq(&Point2::new(1.0, 0.0)));
    }

    #[test]
    fn test_line_intersect() {
        let l1 = Line::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        let l2 = Line::new(Point2::new(0.5, -1.0), Point2::new(0.5, 1.0));
        let hit = l1.intersect(&l2).expect("should intersect");
        assert!(hit.approx_eq(&Point2::new(0.5, 0.0)));
    }

    #[test]
    fn test_rectangle_merge_contains() {
        let mut r = Rectangle::empty();
        r.extend(&Point2::new(0.0, 0.0));
        r.extend(&Point2::new(1.0, 1.0));
        assert!(r.contains(&Point2::new(0.5, 0.5)));
        assert!(!r.contains(&Point2::new(2.0, 2.0)));
    }
}
