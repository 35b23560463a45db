//! Rectangular tile grids.

use thiserror::Error;

use crate::coord::{TileCoord, ZoomLevel};
use crate::provider::{LayerStyle, Provider, UrlFormatter};

use super::request::TileRequest;

/// Errors raised while building a tile grid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// The first corner is not the top-left one
    #[error(
        "corner {first} is not north-west of corner {second}; \
         pass the top-left corner first"
    )]
    MisorderedCorners { first: TileCoord, second: TileCoord },

    /// Corners at different zoom levels
    #[error("corners are at different zoom levels ({first} and {second})")]
    ZoomMismatch { first: ZoomLevel, second: ZoomLevel },

    /// Stitched image would not fit a raster buffer
    #[error("a {width}x{height} tile grid is too large to stitch into one image")]
    TooLarge { width: u32, height: u32 },
}

/// Largest stitched image accepted, in pixels (16 GiB as RGBA).
pub const MAX_PIXELS: u64 = 1 << 32;

/// A rectangle of tiles at one zoom level.
///
/// Tiles are enumerated in row-major order (y outer, x inner), so the tile
/// at sequence position `i` belongs at canvas offset `(i % width, i / width)`.
///
/// # Example
///
/// ```
/// use mapstitch::coord::{TileCoord, ZoomLevel};
/// use mapstitch::tile::TileGrid;
///
/// let z = ZoomLevel::new(4).unwrap();
/// let grid = TileGrid::enumerate(
///     TileCoord::new(2, 5, z).unwrap(),
///     TileCoord::new(4, 6, z).unwrap(),
/// )
/// .unwrap();
/// assert_eq!((grid.width(), grid.height()), (3, 2));
/// assert_eq!(grid.len(), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    origin: TileCoord,
    width: u32,
    height: u32,
}

impl TileGrid {
    /// Builds the grid spanned by a top-left and a bottom-right corner tile.
    ///
    /// Corners are not reordered: `top_left` must not lie east or south of
    /// `bottom_right`. Use [`TileGrid::spanning`] for unordered corners.
    ///
    /// # Errors
    ///
    /// [`GridError::MisorderedCorners`] if the corners are swapped on either
    /// axis, [`GridError::ZoomMismatch`] if they come from different zooms.
    pub fn enumerate(top_left: TileCoord, bottom_right: TileCoord) -> Result<Self, GridError> {
        if top_left.zoom != bottom_right.zoom {
            return Err(GridError::ZoomMismatch {
                first: top_left.zoom,
                second: bottom_right.zoom,
            });
        }
        if top_left.x > bottom_right.x || top_left.y > bottom_right.y {
            return Err(GridError::MisorderedCorners {
                first: top_left,
                second: bottom_right,
            });
        }

        Ok(Self {
            origin: top_left,
            width: bottom_right.x - top_left.x + 1,
            height: bottom_right.y - top_left.y + 1,
        })
    }

    /// Builds the grid spanned by two opposite corners given in any order.
    pub fn spanning(a: TileCoord, b: TileCoord) -> Result<Self, GridError> {
        if a.zoom != b.zoom {
            return Err(GridError::ZoomMismatch {
                first: a.zoom,
                second: b.zoom,
            });
        }
        let top_left = TileCoord {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            zoom: a.zoom,
        };
        let bottom_right = TileCoord {
            x: a.x.max(b.x),
            y: a.y.max(b.y),
            zoom: a.zoom,
        };
        Self::enumerate(top_left, bottom_right)
    }

    /// North-west tile of the grid.
    pub fn origin(&self) -> TileCoord {
        self.origin
    }

    /// Zoom level shared by every tile.
    pub fn zoom(&self) -> ZoomLevel {
        self.origin.zoom
    }

    /// Number of tile columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of tile rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of tiles (`width * height`).
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Always false; a grid holds at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Size of the stitched image in pixels for `tile_size` pixel tiles.
    ///
    /// # Errors
    ///
    /// [`GridError::TooLarge`] if either side overflows `u32` or the image
    /// would hold more than [`MAX_PIXELS`] pixels.
    pub fn pixel_size(&self, tile_size: u32) -> Result<(u32, u32), GridError> {
        let too_large = || GridError::TooLarge {
            width: self.width,
            height: self.height,
        };
        let width = self.width.checked_mul(tile_size).ok_or_else(too_large)?;
        let height = self.height.checked_mul(tile_size).ok_or_else(too_large)?;
        if u64::from(width) * u64::from(height) > MAX_PIXELS {
            return Err(too_large());
        }
        Ok((width, height))
    }

    /// Canvas offset of the tile at sequence position `index`.
    #[inline]
    pub fn offset_of(&self, index: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    /// Iterates over the grid's tiles in row-major order.
    pub fn tiles(&self) -> impl ExactSizeIterator<Item = TileCoord> + '_ {
        (0..self.len()).map(move |i| {
            let (dx, dy) = self.offset_of(i);
            TileCoord {
                x: self.origin.x + dx,
                y: self.origin.y + dy,
                zoom: self.origin.zoom,
            }
        })
    }

    /// Builds one fetch request per tile, in enumeration order.
    pub fn requests(
        &self,
        formatter: &UrlFormatter,
        provider: Provider,
        style: LayerStyle,
    ) -> Vec<TileRequest> {
        self.tiles()
            .enumerate()
            .map(|(i, tile)| {
                let (grid_x, grid_y) = self.offset_of(i);
                TileRequest::new(formatter.format(provider, &tile, style), grid_x, grid_y)
            })
            .collect()
    }
}
