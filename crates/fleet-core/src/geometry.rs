//! Geometry kernel for airspace checks and telemetry.
//!
//! Intersection and containment tests treat (lat, lon) as planar
//! coordinates; distance and bearing use a spherical earth.

use crate::models::LatLon;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Orientation of an ordered point triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Collinear,
    Clockwise,
    CounterClockwise,
}

/// Orientation of `(p, q, r)` from the sign of the cross product of
/// `(q - p)` and `(r - q)`.
pub fn orientation(p: LatLon, q: LatLon, r: LatLon) -> Orientation {
    let val = (q.lat - p.lat) * (r.lon - q.lon) - (q.lon - p.lon) * (r.lat - q.lat);
    if val == 0.0 {
        Orientation::Collinear
    } else if val > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// Whether `q` lies inside the bounding box of segment `p`-`r`.
fn on_segment(p: LatLon, q: LatLon, r: LatLon) -> bool {
    q.lat <= p.lat.max(r.lat)
        && q.lat >= p.lat.min(r.lat)
        && q.lon <= p.lon.max(r.lon)
        && q.lon >= p.lon.min(r.lon)
}

/// Whether segment `a1`-`a2` intersects segment `b1`-`b2`, touching and
/// collinear overlap included.
pub fn segments_intersect(a1: LatLon, a2: LatLon, b1: LatLon, b2: LatLon) -> bool {
    let o1 = orientation(a1, a2, b1);
    let o2 = orientation(a1, a2, b2);
    let o3 = orientation(b1, b2, a1);
    let o4 = orientation(b1, b2, a2);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == Orientation::Collinear && on_segment(a1, b1, a2))
        || (o2 == Orientation::Collinear && on_segment(a1, b2, a2))
        || (o3 == Orientation::Collinear && on_segment(b1, a1, b2))
        || (o4 == Orientation::Collinear && on_segment(b1, a2, b2))
}

/// Intersection of the infinite lines through `p1`-`p2` and `q1`-`q2`.
///
/// Returns `None` for parallel or coincident lines.
pub fn line_intersection_point(p1: LatLon, p2: LatLon, q1: LatLon, q2: LatLon) -> Option<LatLon> {
    let denom = (p1.lat - p2.lat) * (q1.lon - q2.lon) - (p1.lon - p2.lon) * (q1.lat - q2.lat);
    if denom == 0.0 {
        return None;
    }

    let p_cross = p1.lat * p2.lon - p1.lon * p2.lat;
    let q_cross = q1.lat * q2.lon - q1.lon * q2.lat;

    let lat = (p_cross * (q1.lat - q2.lat) - (p1.lat - p2.lat) * q_cross) / denom;
    let lon = (p_cross * (q1.lon - q2.lon) - (p1.lon - p2.lon) * q_cross) / denom;
    Some(LatLon::new(lat, lon))
}

/// Even-odd ray casting. Polygons with fewer than 3 vertices contain nothing.
pub fn point_in_polygon(p: LatLon, polygon: &[LatLon]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (yi, xi) = (polygon[i].lat, polygon[i].lon);
        let (yj, xj) = (polygon[j].lat, polygon[j].lon);

        if ((yi > p.lat) != (yj > p.lat)) && (p.lon < (xj - xi) * (p.lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Great-circle distance in meters.
pub fn haversine_distance_m(p1: LatLon, p2: LatLon) -> f64 {
    let phi1 = p1.lat.to_radians();
    let phi2 = p2.lat.to_radians();
    let dphi = (p2.lat - p1.lat).to_radians();
    let dlambda = (p2.lon - p1.lon).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance in kilometers.
pub fn haversine_distance_km(p1: LatLon, p2: LatLon) -> f64 {
    haversine_distance_m(p1, p2) / 1000.0
}

/// Initial great-circle bearing from `p1` to `p2`, in whole degrees within
/// `[0, 360)`.
pub fn initial_bearing_deg(p1: LatLon, p2: LatLon) -> f64 {
    let phi1 = p1.lat.to_radians();
    let phi2 = p2.lat.to_radians();
    let delta_lambda = (p2.lon - p1.lon).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    let heading = y.atan2(x).to_degrees().rem_euclid(360.0).round();
    // 359.6 rounds up to 360
    if heading >= 360.0 {
        0.0
    } else {
        heading
    }
}

/// Equirectangular approximation in kilometers, good enough for the
/// short hops reported as "distance from home".
pub fn equirectangular_distance_km(p1: LatLon, p2: LatLon) -> f64 {
    let phi1 = p1.lat.to_radians();
    let phi2 = p2.lat.to_radians();
    let x = (p2.lon - p1.lon).to_radians() * ((phi1 + phi2) / 2.0).cos();
    let y = phi2 - phi1;
    (x * x + y * y).sqrt() * EARTH_RADIUS_M / 1000.0
}
