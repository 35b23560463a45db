//! Spherical Mercator plane (EPSG:3857) in metres.

use super::types::{GeoPoint, MAX_LAT};

/// Half the equatorial circumference of the sphere, in metres.
///
/// The Mercator plane spans `[-HALF_EQUATOR_METERS, HALF_EQUATOR_METERS]` on both axes.
pub const HALF_EQUATOR_METERS: f64 = 20_037_508.342_789_2;

/// A position on the spherical Mercator plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorPoint {
    /// Easting in metres
    pub x: f64,
    /// Northing in metres
    pub y: f64,
}

/// Projects a WGS-84 point onto the Mercator plane.
///
/// Latitude is clamped to the Mercator limit first.
pub fn wgs84_to_mercator(point: GeoPoint) -> MercatorPoint {
    let lat = point.lat.clamp(-MAX_LAT, MAX_LAT);
    let x = point.lon * HALF_EQUATOR_METERS / 180.0;
    let y = ((90.0 + lat).to_radians() / 2.0).tan().ln().to_degrees() * HALF_EQUATOR_METERS / 180.0;
    MercatorPoint { x, y }
}

/// Inverse of [`wgs84_to_mercator`].
pub fn mercator_to_wgs84(point: MercatorPoint) -> GeoPoint {
    let lon = point.x / HALF_EQUATOR_METERS * 180.0;
    let y = (point.y / HALF_EQUATOR_METERS * 180.0).to_radians();
    let lat = (2.0 * y.exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    GeoPoint::new(lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin() {
        let p = wgs84_to_mercator(GeoPoint::new(0.0, 0.0));
        assert!(p.x.abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
    }

    #[test]
    fn test_plane_edges() {
        let corner = wgs84_to_mercator(GeoPoint::new(180.0, MAX_LAT));
        assert!((corner.x - HALF_EQUATOR_METERS).abs() < 1e-3);
        assert!((corner.y - HALF_EQUATOR_METERS).abs() < 1.0);
    }

    #[test]
    fn test_pole_is_clamped() {
        let pole = wgs84_to_mercator(GeoPoint::new(0.0, 90.0));
        let limit = wgs84_to_mercator(GeoPoint::new(0.0, MAX_LAT));
        assert_eq!(pole, limit);
    }

    #[test]
    fn test_roundtrip() {
        let original = GeoPoint::new(108.05, 34.15);
        let back = mercator_to_wgs84(wgs84_to_mercator(original));
        assert!((back.lon - original.lon).abs() < 1e-9);
        assert!((back.lat - original.lat).abs() < 1e-9);
    }
}
