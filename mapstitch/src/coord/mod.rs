//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (longitude/latitude)
//! and Web Mercator tile coordinates used by slippy map tile providers, plus
//! the metre-based Mercator plane and the GCJ-02 datum shift used by some
//! Chinese providers.

mod gcj;
mod mercator;
mod types;

pub use gcj::{gcj02_to_wgs84, is_outside_china, wgs84_to_gcj02};
pub use mercator::{mercator_to_wgs84, wgs84_to_mercator, MercatorPoint, HALF_EQUATOR_METERS};
pub use types::{
    CoordError, GeoPoint, TileCoord, ZoomLevel, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;

/// Limits applied by the [`Projector`].
///
/// Injected at construction instead of living in process-wide tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionLimits {
    /// Highest zoom level accepted (never above [`MAX_ZOOM`])
    pub max_zoom: u8,
    /// Latitudes are clamped to `±max_latitude` before projecting
    pub max_latitude: f64,
}

impl Default for ProjectionLimits {
    fn default() -> Self {
        Self {
            max_zoom: MAX_ZOOM,
            max_latitude: MAX_LAT,
        }
    }
}

/// Converts geographic points into tile coordinates.
///
/// Pure and deterministic; safe to share between threads.
///
/// # Example
///
/// ```
/// use mapstitch::coord::{GeoPoint, Projector};
///
/// let projector = Projector::default();
/// let tile = projector.project(GeoPoint::new(-122.42, 37.77), 10).unwrap();
/// assert_eq!((tile.x, tile.y), (163, 395));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Projector {
    limits: ProjectionLimits,
}

impl Projector {
    /// Creates a projector with custom limits.
    pub fn new(limits: ProjectionLimits) -> Self {
        Self { limits }
    }

    /// Returns the limits this projector applies.
    pub fn limits(&self) -> ProjectionLimits {
        self.limits
    }

    /// Validates a raw zoom value against both the grid and this projector's limits.
    pub fn zoom(&self, zoom: u8) -> Result<ZoomLevel, CoordError> {
        let max = self.limits.max_zoom.min(MAX_ZOOM);
        if zoom > max {
            return Err(CoordError::InvalidZoom { zoom, max });
        }
        ZoomLevel::new(zoom)
    }

    /// Projects a geographic point to the tile containing it.
    ///
    /// Latitude saturates at the Mercator limit. Longitude outside
    /// `[-180, 180]` wraps around the globe. Points on the east or south edge
    /// map to the last column or row, so the result always lies inside the grid.
    ///
    /// # Errors
    ///
    /// Returns an error if the zoom is out of range or either coordinate is not finite.
    #[inline]
    pub fn project(&self, point: GeoPoint, zoom: u8) -> Result<TileCoord, CoordError> {
        let zoom = self.zoom(zoom)?;
        self.project_at(point, zoom)
    }

    /// Projects a point at an already validated zoom level.
    pub fn project_at(&self, point: GeoPoint, zoom: ZoomLevel) -> Result<TileCoord, CoordError> {
        if !point.lat.is_finite() {
            return Err(CoordError::InvalidLatitude(point.lat));
        }
        if !point.lon.is_finite() {
            return Err(CoordError::InvalidLongitude(point.lon));
        }

        let n = zoom.tiles_per_side();
        let scale = f64::from(n);

        let lon = wrap_longitude(point.lon);
        let lat = point
            .lat
            .clamp(-self.limits.max_latitude, self.limits.max_latitude);

        let fx = (lon + 180.0) / 360.0 * scale;
        let lat_rad = lat.to_radians();
        let fy = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * scale;

        // Float-to-int casts saturate, so a tiny negative fy lands on row 0.
        let x = (fx.floor() as u32).min(n - 1);
        let y = (fy.floor() as u32).min(n - 1);

        Ok(TileCoord { x, y, zoom })
    }
}

/// Brings a longitude into `[-180, 180]`.
///
/// Values already in range are returned unchanged so that +180 stays on the
/// east edge instead of jumping to the west one.
fn wrap_longitude(lon: f64) -> f64 {
    if (MIN_LON..=MAX_LON).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Converts a tile back to the geographic position of its north-west corner.
#[inline]
pub fn tile_to_geo(tile: &TileCoord) -> GeoPoint {
    let n = f64::from(tile.zoom.tiles_per_side());

    let lon = f64::from(tile.x) / n * 360.0 - 180.0;

    let y = f64::from(tile.y) / n;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();

    GeoPoint::new(lon, lat)
}

/// Geographic position of a corner of the tile grid at `zoom`.
///
/// Unlike [`tile_to_geo`] this accepts `x`/`y` equal to `2^zoom`, which is
/// the east/south edge of the last tile.
pub fn grid_corner_to_geo(x: u32, y: u32, zoom: ZoomLevel) -> GeoPoint {
    let n = f64::from(zoom.tiles_per_side());
    let lon = f64::from(x) / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * f64::from(y) / n))
        .sinh()
        .atan()
        .to_degrees();
    GeoPoint::new(lon, lat)
}
