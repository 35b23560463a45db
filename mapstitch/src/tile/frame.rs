//! Georeferencing of a stitched image.
//!
//! A [`GeoFrame`] pairs the four pixel corners of the output image with the
//! geographic coordinates of the same corners, which is what GIS tools need
//! to place the raster (a "link file").

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use crate::canvas::TILE_SIZE;
use crate::coord::{gcj02_to_wgs84, grid_corner_to_geo, wgs84_to_gcj02, GeoPoint};

use super::grid::TileGrid;

/// Datum conversion applied to the frame's geographic corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Datum {
    /// Use the tile grid's coordinates as they are
    #[default]
    Keep,
    /// Shift WGS-84 corners onto GCJ-02
    ToGcj02,
    /// Shift GCJ-02 corners back onto WGS-84
    ToWgs84,
}

impl Datum {
    fn apply(self, point: GeoPoint) -> GeoPoint {
        match self {
            Datum::Keep => point,
            Datum::ToGcj02 => wgs84_to_gcj02(point),
            Datum::ToWgs84 => gcj02_to_wgs84(point),
        }
    }
}

impl FromStr for Datum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Datum::Keep),
            "gcj" | "gcj02" => Ok(Datum::ToGcj02),
            "wgs" | "wgs84" => Ok(Datum::ToWgs84),
            other => Err(format!("unknown datum '{}' (expected keep, gcj or wgs)", other)),
        }
    }
}

/// One corner of the image frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    LeftTop,
    RightTop,
    LeftBottom,
    RightBottom,
}

impl Corner {
    /// Order in which corners are written to a link file.
    pub const LINK_ORDER: [Corner; 4] = [
        Corner::LeftTop,
        Corner::LeftBottom,
        Corner::RightTop,
        Corner::RightBottom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Corner::LeftTop => "LT",
            Corner::RightTop => "RT",
            Corner::LeftBottom => "LB",
            Corner::RightBottom => "RB",
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pixel and geographic corners of a stitched grid.
///
/// Pixel corners follow the GIS convention of a downward-negative y axis:
/// left-top is `(0, 0)` and right-bottom is `(width, -height)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFrame {
    width_px: u64,
    height_px: u64,
    left_top: GeoPoint,
    right_bottom: GeoPoint,
    datum: Datum,
}

impl GeoFrame {
    /// Computes the frame covering every tile of `grid`.
    pub fn from_grid(grid: &TileGrid, datum: Datum) -> Self {
        let origin = grid.origin();
        let zoom = grid.zoom();
        let left_top = grid_corner_to_geo(origin.x, origin.y, zoom);
        let right_bottom =
            grid_corner_to_geo(origin.x + grid.width(), origin.y + grid.height(), zoom);

        Self {
            width_px: u64::from(grid.width()) * u64::from(TILE_SIZE),
            height_px: u64::from(grid.height()) * u64::from(TILE_SIZE),
            left_top,
            right_bottom,
            datum,
        }
    }

    pub fn datum(&self) -> Datum {
        self.datum
    }

    /// Pixel position of a corner.
    pub fn pixel(&self, corner: Corner) -> (f64, f64) {
        let w = self.width_px as f64;
        let h = self.height_px as f64;
        match corner {
            Corner::LeftTop => (0.0, 0.0),
            Corner::RightTop => (w, 0.0),
            Corner::LeftBottom => (0.0, -h),
            Corner::RightBottom => (w, -h),
        }
    }

    /// Geographic position of a corner, after datum conversion.
    pub fn geo(&self, corner: Corner) -> GeoPoint {
        let (lt, rb) = (self.left_top, self.right_bottom);
        let point = match corner {
            Corner::LeftTop => lt,
            Corner::RightTop => GeoPoint::new(rb.lon, lt.lat),
            Corner::LeftBottom => GeoPoint::new(lt.lon, rb.lat),
            Corner::RightBottom => rb,
        };
        self.datum.apply(point)
    }

    /// Writes one `px, py, lon, lat` line per corner (LT, LB, RT, RB).
    pub fn write_link_file<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for corner in Corner::LINK_ORDER {
            let (px, py) = self.pixel(corner);
            let geo = self.geo(corner);
            writeln!(
                writer,
                "{:.5}, {:.5}, {:.5}, {:.5}",
                px, py, geo.lon, geo.lat
            )?;
        }
        writer.flush()
    }
}
