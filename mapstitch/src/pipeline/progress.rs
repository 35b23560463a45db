//! Progress reporting.
//!
//! Workers emit one [`ProgressEvent`] per fetched tile on an unbounded
//! channel, so reporting never holds up a fetch. The monitor counts events
//! and forwards the running total to a [`ProgressSink`].

use tokio::sync::mpsc;
use tracing::{debug, info};

/// Emitted by a worker after a tile has been fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    TileFetched { grid_x: u32, grid_y: u32 },
}

/// Receives progress updates from the monitor.
pub trait ProgressSink: Send {
    /// Called once before any tile is fetched.
    fn on_start(&mut self, _total: usize) {}

    /// Called after each fetched tile with the cumulative count.
    fn on_tile(&mut self, completed: usize, total: usize);

    /// Called once when the monitor stops, successful or not.
    fn on_finish(&mut self, _completed: usize, _total: usize) {}
}

/// Sink that reports through `tracing`, roughly every tenth of the run.
#[derive(Debug, Default)]
pub struct LogProgress {
    last_decile: usize,
}

impl ProgressSink for LogProgress {
    fn on_tile(&mut self, completed: usize, total: usize) {
        let decile = completed * 10 / total.max(1);
        if decile > self.last_decile {
            self.last_decile = decile;
            info!(completed, total, "Fetch progress: {}%", decile * 10);
        }
    }

    fn on_finish(&mut self, completed: usize, total: usize) {
        debug!(completed, total, "Progress monitor finished");
    }
}

/// Counts progress events until `total` have arrived or every sender is gone.
///
/// Returns the number of events seen.
pub(crate) async fn run_monitor(
    mut events: mpsc::UnboundedReceiver<ProgressEvent>,
    total: usize,
    mut sink: Box<dyn ProgressSink>,
) -> usize {
    sink.on_start(total);

    let mut completed = 0;
    while completed < total {
        match events.recv().await {
            Some(ProgressEvent::TileFetched { grid_x, grid_y }) => {
                completed += 1;
                debug!(grid_x, grid_y, completed, total, "Tile fetched");
                sink.on_tile(completed, total);
            }
            None => break,
        }
    }

    sink.on_finish(completed, total);
    completed
}
