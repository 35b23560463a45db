//! The output raster that tiles are blitted into.
//!
//! A [`Canvas`] is sized once from a [`TileGrid`] and then filled one tile
//! at a time. It tracks which cells have been written so a caller can tell a
//! finished image from a partial one.

use image::RgbaImage;
use thiserror::Error;
use tracing::trace;

use crate::tile::{GridError, TileGrid};

/// Side length of one tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Errors raised when placing a tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanvasError {
    /// Offset lies outside the canvas
    #[error("tile offset ({grid_x}, {grid_y}) outside a {width}x{height} canvas")]
    OutOfBounds {
        grid_x: u32,
        grid_y: u32,
        width: u32,
        height: u32,
    },

    /// The cell was already written
    #[error("tile at offset ({grid_x}, {grid_y}) merged twice")]
    DuplicateTile { grid_x: u32, grid_y: u32 },

    /// The decoded tile is not `TILE_SIZE` square
    #[error("tile at offset ({grid_x}, {grid_y}) is {width}x{height}, expected 256x256")]
    WrongTileSize {
        grid_x: u32,
        grid_y: u32,
        width: u32,
        height: u32,
    },
}

/// RGBA raster of `tiles_wide x tiles_high` tiles of [`TILE_SIZE`] pixels.
#[derive(Debug)]
pub struct Canvas {
    image: RgbaImage,
    tiles_wide: u32,
    tiles_high: u32,
    filled: Vec<bool>,
    merged: usize,
}

impl Canvas {
    /// Allocates a transparent canvas for every tile of `grid`.
    ///
    /// # Errors
    ///
    /// [`GridError::TooLarge`] when the pixel dimensions are out of range.
    pub fn for_grid(grid: &TileGrid) -> Result<Self, GridError> {
        let (width, height) = grid.pixel_size(TILE_SIZE)?;
        trace!(
            tiles_wide = grid.width(),
            tiles_high = grid.height(),
            width,
            height,
            "Allocating canvas"
        );

        Ok(Self {
            image: RgbaImage::new(width, height),
            tiles_wide: grid.width(),
            tiles_high: grid.height(),
            filled: vec![false; grid.len()],
            merged: 0,
        })
    }

    pub fn tiles_wide(&self) -> u32 {
        self.tiles_wide
    }

    pub fn tiles_high(&self) -> u32 {
        self.tiles_high
    }

    /// Number of cells on the canvas.
    pub fn tile_count(&self) -> usize {
        self.filled.len()
    }

    /// Number of cells written so far.
    pub fn merged(&self) -> usize {
        self.merged
    }

    /// True once every cell has been written exactly once.
    pub fn is_complete(&self) -> bool {
        self.merged == self.filled.len()
    }

    /// Copies `tile` into the cell at `(grid_x, grid_y)`.
    ///
    /// Pixels overwrite whatever is below them; nothing is blended. A tile
    /// must be exactly [`TILE_SIZE`] on each side, so a written cell is
    /// always fully covered.
    pub fn blit(&mut self, grid_x: u32, grid_y: u32, tile: &RgbaImage) -> Result<(), CanvasError> {
        if grid_x >= self.tiles_wide || grid_y >= self.tiles_high {
            return Err(CanvasError::OutOfBounds {
                grid_x,
                grid_y,
                width: self.tiles_wide,
                height: self.tiles_high,
            });
        }

        if tile.dimensions() != (TILE_SIZE, TILE_SIZE) {
            return Err(CanvasError::WrongTileSize {
                grid_x,
                grid_y,
                width: tile.width(),
                height: tile.height(),
            });
        }

        let cell = grid_y as usize * self.tiles_wide as usize + grid_x as usize;
        if self.filled[cell] {
            return Err(CanvasError::DuplicateTile { grid_x, grid_y });
        }

        let x_offset = grid_x * TILE_SIZE;
        let y_offset = grid_y * TILE_SIZE;
        for (x, y, pixel) in tile.enumerate_pixels() {
            self.image.put_pixel(x_offset + x, y_offset + y, *pixel);
        }

        self.filled[cell] = true;
        self.merged += 1;
        Ok(())
    }

    /// Borrows the raster.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consumes the canvas and returns the raster.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{TileCoord, ZoomLevel};
    use image::Rgba;

    fn canvas(width: u32, height: u32) -> Canvas {
        let zoom = ZoomLevel::new(8).unwrap();
        let grid = TileGrid::enumerate(
            TileCoord::new(10, 10, zoom).unwrap(),
            TileCoord::new(10 + width - 1, 10 + height - 1, zoom).unwrap(),
        )
        .unwrap();
        Canvas::for_grid(&grid).unwrap()
    }

    fn solid(r: u8, g: u8, b: u8) -> RgbaImage {
        RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([r, g, b, 255]))
    }

    #[test]
    fn test_canvas_dimensions() {
        let canvas = canvas(3, 2);
        assert_eq!(canvas.image().dimensions(), (768, 512));
        assert_eq!(canvas.tile_count(), 6);
        assert!(!canvas.is_complete());
        assert_eq!(*canvas.image().get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_blit_places_at_offset() {
        let mut canvas = canvas(3, 2);
        canvas.blit(2, 1, &solid(0, 255, 0)).unwrap();

        assert_eq!(*canvas.image().get_pixel(512, 256), Rgba([0, 255, 0, 255]));
        assert_eq!(*canvas.image().get_pixel(767, 511), Rgba([0, 255, 0, 255]));
        // Neighbouring cell untouched
        assert_eq!(*canvas.image().get_pixel(511, 256), Rgba([0, 0, 0, 0]));
        assert_eq!(canvas.merged(), 1);
    }

    #[test]
    fn test_blit_overwrites_without_blending() {
        let mut canvas = canvas(1, 1);
        let translucent = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([10, 20, 30, 40]));
        canvas.blit(0, 0, &translucent).unwrap();
        assert_eq!(*canvas.image().get_pixel(100, 100), Rgba([10, 20, 30, 40]));
    }

    #[test]
    fn test_blit_rejects_wrong_tile_size() {
        let mut canvas = canvas(2, 1);
        let big = RgbaImage::from_pixel(300, 300, Rgba([1, 2, 3, 255]));
        assert_eq!(
            canvas.blit(0, 0, &big),
            Err(CanvasError::WrongTileSize {
                grid_x: 0,
                grid_y: 0,
                width: 300,
                height: 300
            })
        );

        let speck = RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 255]));
        assert!(matches!(
            canvas.blit(1, 0, &speck),
            Err(CanvasError::WrongTileSize { width: 1, height: 1, .. })
        ));

        // Nothing written, nothing counted
        assert_eq!(canvas.merged(), 0);
        assert_eq!(*canvas.image().get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert!(!canvas.is_complete());
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut canvas = canvas(2, 2);
        assert!(matches!(
            canvas.blit(2, 0, &solid(0, 0, 0)),
            Err(CanvasError::OutOfBounds { grid_x: 2, .. })
        ));
        assert_eq!(canvas.merged(), 0);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut canvas = canvas(2, 1);
        canvas.blit(1, 0, &solid(255, 0, 0)).unwrap();
        assert_eq!(
            canvas.blit(1, 0, &solid(0, 0, 255)),
            Err(CanvasError::DuplicateTile { grid_x: 1, grid_y: 0 })
        );
        // First write survives
        assert_eq!(*canvas.image().get_pixel(300, 10), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_complete_after_every_cell() {
        let mut canvas = canvas(2, 2);
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert!(!canvas.is_complete());
            canvas.blit(x, y, &solid(9, 9, 9)).unwrap();
        }
        assert!(canvas.is_complete());
        assert_eq!(canvas.into_image().dimensions(), (512, 512));
    }
}
