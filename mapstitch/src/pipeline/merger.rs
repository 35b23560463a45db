//! The merger: single consumer that owns the canvas.
//!
//! Decoding and blitting are CPU bound, so the merger runs on a blocking
//! thread and pulls from the data queue with `blocking_recv`. Tiles arrive
//! in completion order; each is placed by its own offset.

use image::RgbaImage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::canvas::Canvas;
use crate::tile::TileData;

use super::error::{FirstFailure, PipelineError};

/// Runs `merge` on a blocking thread under supervision.
///
/// A panic in `merge` is reported to `failure` as
/// [`PipelineError::TaskFailed`] as soon as it happens, which cancels the
/// run; the handle then yields [`PipelineError::Cancelled`].
pub(crate) fn spawn_merger<F>(
    failure: FirstFailure,
    merge: F,
) -> JoinHandle<Result<Canvas, PipelineError>>
where
    F: FnOnce() -> Result<Canvas, PipelineError> + Send + 'static,
{
    let blocking = tokio::task::spawn_blocking(merge);
    tokio::spawn(async move {
        blocking.await.unwrap_or_else(|e| {
            warn!(error = %e, "Merger task died");
            failure.fail(PipelineError::TaskFailed(format!("merger: {}", e)));
            Err(PipelineError::Cancelled)
        })
    })
}

/// Merges tiles until the data queue closes.
///
/// Returns the canvas only if every cell was filled. A failure goes to
/// `failure`, which cancels the run; the canvas is dropped and
/// [`PipelineError::Cancelled`] returned.
pub(crate) fn run_merger(
    canvas: Canvas,
    data_rx: mpsc::Receiver<TileData>,
    cancel: CancellationToken,
    failure: FirstFailure,
) -> Result<Canvas, PipelineError> {
    merge_all(canvas, data_rx, &cancel).map_err(|error| {
        if !error.is_cancelled() {
            warn!(error = %error, "Merger failed");
        }
        failure.fail(error);
        PipelineError::Cancelled
    })
}

fn merge_all(
    mut canvas: Canvas,
    mut data_rx: mpsc::Receiver<TileData>,
    cancel: &CancellationToken,
) -> Result<Canvas, PipelineError> {
    while let Some(tile) = data_rx.blocking_recv() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let image = decode_tile(&tile)?;
        canvas.blit(tile.grid_x, tile.grid_y, &image)?;
        trace!(
            grid_x = tile.grid_x,
            grid_y = tile.grid_y,
            merged = canvas.merged(),
            "Tile merged"
        );
    }

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    if !canvas.is_complete() {
        return Err(PipelineError::Incomplete {
            merged: canvas.merged(),
            expected: canvas.tile_count(),
        });
    }

    debug!(tiles = canvas.merged(), "Canvas complete");
    Ok(canvas)
}

/// Decodes a fetched tile into RGBA pixels.
fn decode_tile(tile: &TileData) -> Result<RgbaImage, PipelineError> {
    let image = image::load_from_memory(&tile.bytes).map_err(|e| PipelineError::Decode {
        grid_x: tile.grid_x,
        grid_y: tile.grid_y,
        message: e.to_string(),
    })?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasError, TILE_SIZE};
    use crate::coord::{TileCoord, ZoomLevel};
    use crate::tile::TileGrid;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn canvas(width: u32, height: u32) -> Canvas {
        let zoom = ZoomLevel::new(5).unwrap();
        let grid = TileGrid::enumerate(
            TileCoord::new(0, 0, zoom).unwrap(),
            TileCoord::new(width - 1, height - 1, zoom).unwrap(),
        )
        .unwrap();
        Canvas::for_grid(&grid).unwrap()
    }

    fn png(r: u8, g: u8, b: u8) -> Vec<u8> {
        let img = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([r, g, b, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn run(
        canvas: Canvas,
        tiles: Vec<TileData>,
    ) -> (Result<Canvas, PipelineError>, CancellationToken, FirstFailure) {
        let (tx, rx) = mpsc::channel(tiles.len().max(1));
        for tile in tiles {
            tx.try_send(tile).unwrap();
        }
        drop(tx);

        let cancel = CancellationToken::new();
        let failure = FirstFailure::new(cancel.clone());
        let result = run_merger(canvas, rx, cancel.clone(), failure.clone());
        (result, cancel, failure)
    }

    #[test]
    fn test_merges_in_any_order() {
        let tiles = vec![
            TileData::new(png(0, 0, 255), 1, 0),
            TileData::new(png(255, 0, 0), 0, 0),
        ];
        let (result, cancel, _) = run(canvas(2, 1), tiles);

        let canvas = result.unwrap();
        assert!(!cancel.is_cancelled());
        assert_eq!(*canvas.image().get_pixel(10, 10), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.image().get_pixel(300, 10), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_decode_error_cancels_run() {
        let tiles = vec![
            TileData::new(png(1, 1, 1), 0, 0),
            TileData::new(vec![0xFF, 0xD8, 0xFF, 0x00, 0x01], 1, 0),
        ];
        let (result, cancel, failure) = run(canvas(2, 1), tiles);

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(cancel.is_cancelled());
        assert!(matches!(
            failure.take(),
            Some(PipelineError::Decode { grid_x: 1, grid_y: 0, .. })
        ));
    }

    #[test]
    fn test_missing_tile_is_incomplete() {
        let tiles = vec![TileData::new(png(1, 1, 1), 0, 0)];
        let (result, _, failure) = run(canvas(2, 1), tiles);

        assert!(result.is_err());
        assert!(matches!(
            failure.take(),
            Some(PipelineError::Incomplete {
                merged: 1,
                expected: 2
            })
        ));
    }

    #[test]
    fn test_duplicate_tile_rejected() {
        let tiles = vec![
            TileData::new(png(1, 1, 1), 0, 0),
            TileData::new(png(2, 2, 2), 0, 0),
        ];
        let (result, _, failure) = run(canvas(2, 1), tiles);

        assert!(result.is_err());
        assert!(matches!(
            failure.take(),
            Some(PipelineError::Canvas(CanvasError::DuplicateTile { .. }))
        ));
    }

    #[test]
    fn test_undersized_tile_is_rejected() {
        let speck = RgbaImage::from_pixel(1, 1, Rgba([9, 9, 9, 255]));
        let mut buffer = Vec::new();
        speck
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        let tiles = vec![
            TileData::new(png(1, 1, 1), 0, 0),
            TileData::new(buffer, 1, 0),
        ];
        let (result, cancel, failure) = run(canvas(2, 1), tiles);

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(cancel.is_cancelled());
        assert!(matches!(
            failure.take(),
            Some(PipelineError::Canvas(CanvasError::WrongTileSize {
                grid_x: 1,
                width: 1,
                height: 1,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_merger_panic_is_reported_and_cancels() {
        let (tx, mut rx) = mpsc::channel::<TileData>(1);
        let cancel = CancellationToken::new();
        let failure = FirstFailure::new(cancel.clone());

        let merger = spawn_merger(failure.clone(), move || {
            let _first = rx.blocking_recv();
            panic!("decoder crashed");
        });

        tx.send(TileData::new(png(1, 1, 1), 0, 0)).await.unwrap();
        let result = merger.await.unwrap();

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(cancel.is_cancelled());
        // Upstream finds the queue closed
        assert!(tx.send(TileData::new(png(2, 2, 2), 1, 0)).await.is_err());
        match failure.take() {
            Some(PipelineError::TaskFailed(message)) => assert!(message.starts_with("merger")),
            other => panic!("expected TaskFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_supervised_merger_keeps_merge_errors() {
        let cancel = CancellationToken::new();
        let failure = FirstFailure::new(cancel.clone());
        let (tx, rx) = mpsc::channel(1);
        drop(tx);

        let merger = spawn_merger(failure.clone(), {
            let failure = failure.clone();
            let cancel = cancel.clone();
            move || run_merger(canvas(1, 1), rx, cancel, failure)
        });

        // Nothing arrived, so the merger reports an incomplete canvas
        assert!(matches!(merger.await.unwrap(), Err(PipelineError::Cancelled)));
        assert!(matches!(
            failure.take(),
            Some(PipelineError::Incomplete { merged: 0, expected: 1 })
        ));
    }

    #[test]
    fn test_cancelled_run_never_publishes() {
        let (tx, rx) = mpsc::channel(1);
        tx.try_send(TileData::new(png(1, 1, 1), 0, 0)).unwrap();
        drop(tx);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let failure = FirstFailure::new(cancel.clone());

        let result = run_merger(canvas(1, 1), rx, cancel, failure.clone());
        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(failure.take().is_none());
    }
}
