//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Web Mercator valid latitude range.
///
/// Latitudes beyond these bounds are not representable in the square tile
/// grid and saturate to the limit when projected.
pub const MAX_LAT: f64 = 85.0511287798;
pub const MIN_LAT: f64 = -MAX_LAT;

/// Valid longitude range before wrapping.
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported zoom levels (20 discrete levels).
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 19;

/// A geographic position in degrees (WGS-84 unless stated otherwise).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude, east positive
    pub lon: f64,
    /// Latitude, north positive
    pub lat: f64,
}

impl GeoPoint {
    /// Creates a point from longitude and latitude, in that order.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lon, self.lat)
    }
}

/// A validated zoom level in `[MIN_ZOOM, MAX_ZOOM]`.
///
/// The grid at zoom `z` is `2^z` tiles on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoomLevel(u8);

impl ZoomLevel {
    /// Validates a raw zoom value.
    ///
    /// Out-of-range values are rejected, never clamped.
    pub fn new(zoom: u8) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom {
                zoom,
                max: MAX_ZOOM,
            });
        }
        Ok(Self(zoom))
    }

    /// Returns the raw zoom value.
    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Number of tiles along one side of the grid (`2^zoom`).
    #[inline]
    pub fn tiles_per_side(self) -> u32 {
        1u32 << self.0
    }

    /// The next finer zoom level, if there is one.
    pub fn finer(self) -> Option<Self> {
        Self::new(self.0 + 1).ok()
    }
}

impl TryFrom<u8> for ZoomLevel {
    type Error = CoordError;

    fn try_from(zoom: u8) -> Result<Self, Self::Error> {
        Self::new(zoom)
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tile coordinates in the Web Mercator / slippy map grid.
///
/// `x` grows eastward from the antimeridian, `y` grows southward from the
/// northern latitude limit. Both lie in `[0, 2^zoom - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Column (east-west), 0 at west
    pub x: u32,
    /// Row (north-south), 0 at north
    pub y: u32,
    /// Zoom level
    pub zoom: ZoomLevel,
}

impl TileCoord {
    /// Creates a tile coordinate, checking that it lies inside the grid.
    pub fn new(x: u32, y: u32, zoom: ZoomLevel) -> Result<Self, CoordError> {
        let n = zoom.tiles_per_side();
        if x >= n || y >= n {
            return Err(CoordError::TileOutOfRange { x, y, zoom });
        }
        Ok(Self { x, y, zoom })
    }

    /// Row index as counted from the south edge (TMS convention).
    #[inline]
    pub fn inverted_y(&self) -> u32 {
        self.zoom.tiles_per_side() - 1 - self.y
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Zoom level outside the supported range
    #[error("zoom level {zoom} outside supported range [0, {max}]")]
    InvalidZoom { zoom: u8, max: u8 },

    /// Latitude is NaN or infinite
    #[error("latitude {0} is not a finite number")]
    InvalidLatitude(f64),

    /// Longitude is NaN or infinite
    #[error("longitude {0} is not a finite number")]
    InvalidLongitude(f64),

    /// Tile indices outside the grid for their zoom level
    #[error("tile ({x}, {y}) outside the grid at zoom {zoom}")]
    TileOutOfRange { x: u32, y: u32, zoom: ZoomLevel },
}
