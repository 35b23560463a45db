//! Worker completion tracking.
//!
//! The merger stops when the data queue closes, and the queue closes when
//! the last sender is dropped. Workers hold clones of the sender; the
//! tracker holds the original and drops it only after every worker has
//! finished, which makes the merger's shutdown deterministic.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::tile::TileData;

use super::error::{FirstFailure, PipelineError};

/// Wait-group over the fetch workers of one run.
pub(crate) struct CompletionTracker {
    workers: JoinSet<Result<usize, PipelineError>>,
    downstream: mpsc::Sender<TileData>,
    failure: FirstFailure,
}

impl CompletionTracker {
    pub(crate) fn new(downstream: mpsc::Sender<TileData>, failure: FirstFailure) -> Self {
        Self {
            workers: JoinSet::new(),
            downstream,
            failure,
        }
    }

    /// A sender onto the merger's queue for a new worker.
    pub(crate) fn downstream(&self) -> mpsc::Sender<TileData> {
        self.downstream.clone()
    }

    /// Starts a worker and tracks its result.
    pub(crate) fn spawn<F>(&mut self, worker: F)
    where
        F: Future<Output = Result<usize, PipelineError>> + Send + 'static,
    {
        self.workers.spawn(worker);
    }

    /// Number of workers still tracked.
    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker, then closes the merger's queue.
    ///
    /// Worker errors go to the run's [`FirstFailure`], so the first one
    /// cancels the remaining workers. Returns the total number of tiles
    /// fetched, or [`PipelineError::Cancelled`] if any worker did not finish
    /// cleanly.
    pub(crate) async fn wait(mut self) -> Result<usize, PipelineError> {
        let expected = self.workers.len();
        let mut total = 0;
        let mut failed = 0;

        while let Some(joined) = self.workers.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                warn!(error = %e, "Fetch worker panicked");
                Err(PipelineError::TaskFailed(format!("fetch worker: {}", e)))
            });

            match result {
                Ok(fetched) => total += fetched,
                Err(error) => {
                    failed += 1;
                    if !error.is_cancelled() {
                        warn!(error = %error, "Fetch worker failed");
                    }
                    self.failure.fail(error);
                }
            }
        }

        debug!(expected, failed, total, "All fetch workers done, closing data queue");
        drop(self.downstream);

        if failed > 0 {
            Err(PipelineError::Cancelled)
        } else {
            Ok(total)
        }
    }
}
