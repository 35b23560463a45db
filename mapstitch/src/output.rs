//! Encoding a finished canvas.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::info;

use crate::canvas::Canvas;

/// Errors raised while writing output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("unsupported output format '{0}' (expected .jpg, .jpeg or .png)")]
    UnsupportedFormat(String),
}

/// Output formats chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Picks the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, OutputError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            _ => Err(OutputError::UnsupportedFormat(ext)),
        }
    }
}

/// Encodes the canvas as JPEG. Transparency is dropped.
pub fn encode_jpeg<W: Write>(canvas: &Canvas, writer: W, quality: u8) -> Result<(), OutputError> {
    let rgb: RgbImage = canvas.image().convert();
    let encoder = JpegEncoder::new_with_quality(writer, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(())
}

/// Writes the canvas to `path`, choosing the format by extension.
///
/// `quality` applies to JPEG output only.
pub fn save(canvas: &Canvas, path: &Path, quality: u8) -> Result<(), OutputError> {
    let format = OutputFormat::from_path(path)?;

    match format {
        OutputFormat::Jpeg => {
            let mut writer = BufWriter::new(File::create(path)?);
            encode_jpeg(canvas, &mut writer, quality)?;
            writer.flush()?;
        }
        OutputFormat::Png => {
            canvas.image().save_with_format(path, ImageFormat::Png)?;
        }
    }

    let (width, height) = canvas.image().dimensions();
    info!(
        path = %path.display(),
        format = ?format,
        width,
        height,
        "Image written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TILE_SIZE;
    use crate::coord::{TileCoord, ZoomLevel};
    use crate::tile::TileGrid;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn filled_canvas() -> Canvas {
        let zoom = ZoomLevel::new(3).unwrap();
        let grid = TileGrid::enumerate(
            TileCoord::new(0, 0, zoom).unwrap(),
            TileCoord::new(1, 0, zoom).unwrap(),
        )
        .unwrap();
        let mut canvas = Canvas::for_grid(&grid).unwrap();
        let red = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([255, 0, 0, 255]));
        let blue = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([0, 0, 255, 255]));
        canvas.blit(0, 0, &red).unwrap();
        canvas.blit(1, 0, &blue).unwrap();
        canvas
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a.jpg")).unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_path(Path::new("a.JPEG")).unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_path(Path::new("a.png")).unwrap(), OutputFormat::Png);
        assert!(matches!(
            OutputFormat::from_path(Path::new("a.tiff")),
            Err(OutputError::UnsupportedFormat(ext)) if ext == "tiff"
        ));
        assert!(OutputFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_encode_jpeg() {
        let mut buffer = Vec::new();
        encode_jpeg(&filled_canvas(), &mut buffer, 90).unwrap();

        assert_eq!(&buffer[..3], &[0xFF, 0xD8, 0xFF]);
        let decoded = image::load_from_memory(&buffer).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (512, 256));

        // Lossy, so compare loosely
        let left = decoded.get_pixel(100, 100);
        let right = decoded.get_pixel(400, 100);
        assert!(left[0] > 200 && left[2] < 60);
        assert!(right[2] > 200 && right[0] < 60);
    }

    #[test]
    fn test_save_png_is_exact() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("map.png");

        save(&filled_canvas(), &path, 75).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(*decoded.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*decoded.get_pixel(511, 255), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_save_jpeg() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("map.jpg");

        save(&filled_canvas(), &path, 75).unwrap();
        assert_eq!(image::open(&path).unwrap().width(), 512);
    }

    #[test]
    fn test_save_rejects_unknown_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("map.bmp");

        assert!(matches!(
            save(&filled_canvas(), &path, 75),
            Err(OutputError::UnsupportedFormat(_))
        ));
        assert!(!path.exists());
    }
}
