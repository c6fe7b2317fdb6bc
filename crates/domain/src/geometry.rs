//! Geometry helpers for telemetry and geofences.
//!
//! All functions are pure and never panic. Malformed input (NaN, infinite
//! coordinates, degenerate polygons) degrades to "not inside" rather than an
//! error.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Flat-earth conversion factor between degrees and metres.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Number of vertices used when a circle is approximated by a polygon.
pub const CIRCLE_POLYGON_VERTICES: usize = 12;

/// A latitude/longitude pair used for geofence boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Great-circle distance between two coordinates in kilometres (haversine).
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat_distance = (lat2 - lat1).to_radians();
    let lon_distance = (lon2 - lon1).to_radians();

    let a = (lat_distance / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (lon_distance / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Planar circle containment.
///
/// The euclidean distance in degrees is scaled by [`METERS_PER_DEGREE`]. This is
/// a flat-earth approximation that only holds for small regions; it is not a
/// haversine test.
pub fn point_in_circle(
    lat: f64,
    lon: f64,
    center_lat: f64,
    center_lon: f64,
    radius_meters: f64,
) -> bool {
    let distance_degrees = ((lat - center_lat).powi(2) + (lon - center_lon).powi(2)).sqrt();
    // NaN compares false
    distance_degrees * METERS_PER_DEGREE <= radius_meters
}

/// Ray-casting polygon containment.
///
/// Walks every edge `(i, j = i - 1)` with wrap-around and toggles the result
/// whenever the horizontal ray at `lon` crosses the edge. Polygons with fewer
/// than three vertices and non-finite input are never inside.
pub fn point_in_polygon(lat: f64, lon: f64, polygon: &[GeoPoint]) -> bool {
    if polygon.len() < 3 || !lat.is_finite() || !lon.is_finite() {
        return false;
    }
    if polygon.iter().any(|p| !p.is_finite()) {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;

    for i in 0..polygon.len() {
        let (lat_i, lon_i) = (polygon[i].latitude, polygon[i].longitude);
        let (lat_j, lon_j) = (polygon[j].latitude, polygon[j].longitude);

        // Horizontal edges never satisfy the straddle test, so the division is safe.
        if (lon_i > lon) != (lon_j > lon)
            && lat < (lat_j - lat_i) * (lon - lon_i) / (lon_j - lon_i) + lat_i
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Approximates a circle with [`CIRCLE_POLYGON_VERTICES`] evenly spaced vertices.
///
/// Latitude offsets are `radius / 111000`, longitude offsets are additionally
/// divided by `cos(latitude)`.
pub fn circle_to_polygon(center_lat: f64, center_lon: f64, radius_meters: f64) -> Vec<GeoPoint> {
    let lat_radius = radius_meters / METERS_PER_DEGREE;
    let lon_radius = radius_meters / (METERS_PER_DEGREE * center_lat.to_radians().cos());

    (0..CIRCLE_POLYGON_VERTICES)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / CIRCLE_POLYGON_VERTICES as f64;
            GeoPoint::new(
                center_lat + lat_radius * angle.sin(),
                center_lon + lon_radius * angle.cos(),
            )
        })
        .collect()
}
