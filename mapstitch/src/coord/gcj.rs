//! GCJ-02 datum shift.
//!
//! Imagery served for mainland China by some providers is aligned to the
//! obfuscated GCJ-02 datum rather than WGS-84. The shift is a closed-form
//! approximation on the Krasovsky 1940 ellipsoid and is the identity outside
//! the mainland bounding box.

use std::f64::consts::PI;

use super::types::GeoPoint;

/// Semi-major axis of the Krasovsky 1940 ellipsoid, metres.
const KRASOVSKY_A: f64 = 6_378_245.0;

/// First eccentricity squared of the Krasovsky 1940 ellipsoid.
const KRASOVSKY_EE: f64 = 0.006_693_421_622_965_943_23;

/// Returns true when no datum shift applies at this point.
pub fn is_outside_china(point: GeoPoint) -> bool {
    !(72.004..=137.8347).contains(&point.lon) || !(0.8293..=55.8271).contains(&point.lat)
}

/// Shifts a WGS-84 point into GCJ-02.
pub fn wgs84_to_gcj02(point: GeoPoint) -> GeoPoint {
    if is_outside_china(point) {
        return point;
    }
    let (d_lon, d_lat) = offset(point);
    GeoPoint::new(point.lon + d_lon, point.lat + d_lat)
}

/// Shifts a GCJ-02 point back to WGS-84.
///
/// Single-step inverse; accurate to a few metres.
pub fn gcj02_to_wgs84(point: GeoPoint) -> GeoPoint {
    if is_outside_china(point) {
        return point;
    }
    let (d_lon, d_lat) = offset(point);
    GeoPoint::new(point.lon - d_lon, point.lat - d_lat)
}

/// Offset in degrees (longitude, latitude) at the given point.
fn offset(point: GeoPoint) -> (f64, f64) {
    let x = point.lon - 105.0;
    let y = point.lat - 35.0;

    let rad_lat = point.lat.to_radians();
    let magic = 1.0 - KRASOVSKY_EE * rad_lat.sin().powi(2);
    let sqrt_magic = magic.sqrt();

    let d_lat = (shift_lat(x, y) * 180.0)
        / ((KRASOVSKY_A * (1.0 - KRASOVSKY_EE)) / (magic * sqrt_magic) * PI);
    let d_lon = (shift_lon(x, y) * 180.0) / (KRASOVSKY_A / sqrt_magic * rad_lat.cos() * PI);

    (d_lon, d_lat)
}

fn shift_lat(x: f64, y: f64) -> f64 {
    let mut ret = -100.0 + 2.0 * x + 3.0 * y + 0.2 * y * y + 0.1 * x * y + 0.2 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (y * PI).sin() + 40.0 * (y / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (160.0 * (y / 12.0 * PI).sin() + 320.0 * (y * PI / 30.0).sin()) * 2.0 / 3.0;
    ret
}

fn shift_lon(x: f64, y: f64) -> f64 {
    let mut ret = 300.0 + x + 2.0 * y + 0.1 * x * x + 0.1 * x * y + 0.1 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (x * PI).sin() + 40.0 * (x / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (150.0 * (x / 12.0 * PI).sin() + 300.0 * (x / 30.0 * PI).sin()) * 2.0 / 3.0;
    ret
}
