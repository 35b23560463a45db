//! Fetch workers.
//!
//! A fixed number of workers share one inbound request queue. Each worker
//! loops: take a request, fetch it, reject provider placeholders, report
//! progress, then push the payload to the merger. Any failure ends the
//! worker with an error; nothing is retried or skipped.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::provider::{AsyncHttpClient, LayerStyle, PayloadKind};
use crate::tile::{TileData, TileRequest};

use super::error::PipelineError;
use super::progress::ProgressEvent;

/// Inbound queue shared by every worker of a pool.
pub(crate) type SharedRequests = Arc<Mutex<mpsc::Receiver<TileRequest>>>;

/// Everything one worker needs.
pub(crate) struct Worker<C> {
    pub id: usize,
    pub client: Arc<C>,
    pub style: LayerStyle,
    pub requests: SharedRequests,
    pub data_tx: mpsc::Sender<TileData>,
    pub progress_tx: mpsc::UnboundedSender<ProgressEvent>,
    pub cancel: CancellationToken,
}

impl<C: AsyncHttpClient> Worker<C> {
    /// Runs until the request queue is closed and drained.
    ///
    /// Returns the number of tiles handed to the merger.
    pub(crate) async fn run(self) -> Result<usize, PipelineError> {
        trace!(worker = self.id, "Fetch worker starting");
        let mut fetched = 0;

        while let Some(request) = self.next_request().await? {
            let data = self.fetch(&request).await?;

            // Progress is cosmetic; a closed monitor is not an error
            let _ = self.progress_tx.send(ProgressEvent::TileFetched {
                grid_x: request.grid_x,
                grid_y: request.grid_y,
            });

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
                sent = self.data_tx.send(data) => {
                    // Merger gone: it has already reported why
                    sent.map_err(|_| PipelineError::Cancelled)?;
                }
            }
            fetched += 1;
        }

        debug!(worker = self.id, fetched, "Fetch worker finished");
        Ok(fetched)
    }

    /// Takes the next request, or `None` once the queue is closed and empty.
    async fn next_request(&self) -> Result<Option<TileRequest>, PipelineError> {
        let mut requests = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
            guard = self.requests.lock() => guard,
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            request = requests.recv() => Ok(request),
        }
    }

    async fn fetch(&self, request: &TileRequest) -> Result<TileData, PipelineError> {
        trace!(
            worker = self.id,
            grid_x = request.grid_x,
            grid_y = request.grid_y,
            url = %request.url,
            "Fetching tile"
        );

        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = self.client.get(&request.url) => result,
        };

        let body = body.map_err(|source| {
            warn!(
                worker = self.id,
                url = %request.url,
                error = %source,
                "Tile fetch failed"
            );
            PipelineError::Fetch {
                url: request.url.clone(),
                grid_x: request.grid_x,
                grid_y: request.grid_y,
                source,
            }
        })?;

        let kind = PayloadKind::sniff(&body);
        if !kind.is_tile_for(self.style) {
            warn!(
                worker = self.id,
                url = %request.url,
                kind = ?kind,
                bytes = body.len(),
                "Provider returned no imagery"
            );
            return Err(PipelineError::NoImagery {
                url: request.url.clone(),
                grid_x: request.grid_x,
                grid_y: request.grid_y,
                kind,
            });
        }

        Ok(TileData::for_request(request, body))
    }
}
