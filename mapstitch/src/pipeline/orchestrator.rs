//! Run orchestration.
//!
//! A run moves through four phases:
//!
//! ```text
//! Sizing ──► Dispatching ──► AwaitingCompletion ──► Done
//! ```
//!
//! - **Sizing**: project both corners, enumerate the grid, allocate the canvas
//! - **Dispatching**: start workers, merger and monitor, then push every
//!   request onto the inbound queue and close it
//! - **AwaitingCompletion**: wait for the workers, the merger and the monitor
//! - **Done**: hand the finished canvas to the caller
//!
//! The first fatal error anywhere cancels the run and is returned as the
//! result; a partially filled canvas is never returned.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::canvas::Canvas;
use crate::config::StitchConfig;
use crate::coord::{GeoPoint, Projector};
use crate::provider::{AsyncHttpClient, AsyncReqwestClient, LayerStyle, Provider, UrlFormatter};
use crate::tile::{TileGrid, TileRequest};

use super::completion::CompletionTracker;
use super::error::{FirstFailure, PipelineError};
use super::fetcher::Worker;
use super::merger::{run_merger, spawn_merger};
use super::progress::{run_monitor, LogProgress, ProgressSink};

/// Phase of a stitching run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Sizing,
    Dispatching,
    AwaitingCompletion,
    Done,
}

impl Phase {
    /// The phase that must follow this one.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Sizing => Some(Phase::Dispatching),
            Phase::Dispatching => Some(Phase::AwaitingCompletion),
            Phase::AwaitingCompletion => Some(Phase::Done),
            Phase::Done => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Sizing => "sizing",
            Phase::Dispatching => "dispatching",
            Phase::AwaitingCompletion => "awaiting completion",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Tracks and logs phase transitions of one run.
#[derive(Debug)]
struct PhaseTracker {
    phase: Phase,
}

impl PhaseTracker {
    fn new() -> Self {
        debug!(phase = %Phase::Sizing, "Pipeline phase");
        Self {
            phase: Phase::Sizing,
        }
    }

    fn advance(&mut self, to: Phase) {
        debug_assert_eq!(
            self.phase.next(),
            Some(to),
            "skipped pipeline phase transition"
        );
        debug!(from = %self.phase, to = %to, "Pipeline phase transition");
        self.phase = to;
    }
}

/// What to stitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRequest {
    pub provider: Provider,
    pub style: LayerStyle,
    /// North-west corner of the region
    pub corner0: GeoPoint,
    /// South-east corner of the region
    pub corner1: GeoPoint,
    pub zoom: u8,
}

impl MapRequest {
    pub fn new(
        provider: Provider,
        style: LayerStyle,
        corner0: GeoPoint,
        corner1: GeoPoint,
        zoom: u8,
    ) -> Self {
        Self {
            provider,
            style,
            corner0,
            corner1,
            zoom,
        }
    }
}

/// The tile grid and fetch requests for a [`MapRequest`].
#[derive(Debug, Clone)]
pub struct StitchPlan {
    pub grid: TileGrid,
    pub requests: Vec<TileRequest>,
}

/// Fetches and stitches map regions.
///
/// # Example
///
/// ```ignore
/// use mapstitch::pipeline::{MapRequest, Stitcher};
///
/// let stitcher = Stitcher::from_config(StitchConfig::default())?;
/// let request = MapRequest::new(
///     Provider::Google,
///     LayerStyle::Satellite,
///     GeoPoint::new(116.30, 40.00),
///     GeoPoint::new(116.45, 39.90),
///     14,
/// );
/// let canvas = stitcher.build_map(&request).await?;
/// ```
pub struct Stitcher<C> {
    client: Arc<C>,
    config: StitchConfig,
    projector: Projector,
    formatter: UrlFormatter,
}

impl Stitcher<AsyncReqwestClient> {
    /// Creates a stitcher with an HTTP client built from `config`.
    pub fn from_config(config: StitchConfig) -> Result<Self, PipelineError> {
        let client = AsyncReqwestClient::with_settings(&config.user_agent, config.request_timeout)?;
        Ok(Self::new(client, config))
    }
}

impl<C: AsyncHttpClient + 'static> Stitcher<C> {
    /// Creates a stitcher over the given HTTP client.
    pub fn new(client: C, config: StitchConfig) -> Self {
        let formatter = UrlFormatter::new(config.templates.clone());
        Self {
            client: Arc::new(client),
            config,
            projector: Projector::default(),
            formatter,
        }
    }

    /// Replace the projector, for example to lower the zoom limit.
    pub fn with_projector(mut self, projector: Projector) -> Self {
        self.projector = projector;
        self
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    /// Projects the request's corners and builds its fetch requests.
    ///
    /// Performs no I/O. Fails on invalid zoom, misordered corners or an
    /// unusable configuration.
    pub fn plan(&self, request: &MapRequest) -> Result<StitchPlan, PipelineError> {
        self.config.validate()?;

        let zoom = self.projector.zoom(request.zoom)?;
        let top_left = self.projector.project_at(request.corner0, zoom)?;
        let bottom_right = self.projector.project_at(request.corner1, zoom)?;
        let grid = TileGrid::enumerate(top_left, bottom_right)?;

        let requests = grid.requests(&self.formatter, request.provider, request.style);
        Ok(StitchPlan { grid, requests })
    }

    /// Stitches a region, logging progress.
    pub async fn build_map(&self, request: &MapRequest) -> Result<Canvas, PipelineError> {
        self.run(request, Box::new(LogProgress::default()), CancellationToken::new())
            .await
    }

    /// Stitches a region.
    ///
    /// Cancelling `cancel` aborts the run with [`PipelineError::Cancelled`].
    /// Otherwise returns the finished canvas or the first error that stopped
    /// the run.
    pub async fn run(
        &self,
        request: &MapRequest,
        progress: Box<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<Canvas, PipelineError> {
        let mut phase = PhaseTracker::new();

        let plan = self.plan(request)?;
        let canvas = Canvas::for_grid(&plan.grid)?;
        let total = plan.requests.len();

        info!(
            provider = %request.provider,
            style = %request.style,
            zoom = request.zoom,
            tiles_wide = plan.grid.width(),
            tiles_high = plan.grid.height(),
            total,
            workers = self.config.workers,
            "Stitching map"
        );

        let run_cancel = cancel.child_token();
        if run_cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let failure = FirstFailure::new(run_cancel.clone());

        phase.advance(Phase::Dispatching);

        let capacity = self.config.queue_capacity;
        let (request_tx, request_rx) = mpsc::channel(capacity);
        let (data_tx, data_rx) = mpsc::channel(capacity);
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();

        let merger = spawn_merger(failure.clone(), {
            let cancel = run_cancel.clone();
            let failure = failure.clone();
            move || run_merger(canvas, data_rx, cancel, failure)
        });
        let monitor = tokio::spawn(run_monitor(progress_rx, total, progress));

        let requests = Arc::new(Mutex::new(request_rx));
        let mut tracker = CompletionTracker::new(data_tx, failure.clone());
        for id in 0..self.config.workers {
            let worker = Worker {
                id,
                client: Arc::clone(&self.client),
                style: request.style,
                requests: Arc::clone(&requests),
                data_tx: tracker.downstream(),
                progress_tx: progress_tx.clone(),
                cancel: run_cancel.clone(),
            };
            tracker.spawn(worker.run());
        }
        drop(requests);
        drop(progress_tx);
        debug!(workers = tracker.len(), "Fetch workers started");

        let watchdog = self.config.run_timeout.map(|limit| {
            let cancel = run_cancel.clone();
            let failure = failure.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        warn!(timeout_secs = limit.as_secs_f64(), "Run deadline passed");
                        failure.fail(PipelineError::Timeout(limit));
                    }
                }
            })
        });

        let dispatched = dispatch(plan.requests, request_tx, &run_cancel).await;
        if dispatched.is_ok() {
            phase.advance(Phase::AwaitingCompletion);
        }

        let (fetched, merged, reported) = futures::join!(tracker.wait(), merger, monitor);

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        let merged = merged
            .unwrap_or_else(|e| Err(PipelineError::TaskFailed(format!("merger: {}", e))));
        let canvas = settle(merged, &failure)?;

        // A complete canvas means every request went out and was fetched
        let dispatched = dispatched?;
        let fetched = fetched.unwrap_or(canvas.merged());
        let reported = reported.unwrap_or_else(|e| {
            debug!(error = %e, "Progress monitor did not finish");
            0
        });

        phase.advance(Phase::Done);
        info!(dispatched, fetched, reported, "Map stitched");
        Ok(canvas)
    }
}

/// Picks the outcome of a run once every task has stopped.
///
/// A complete canvas wins: anything recorded after the merger finished (a
/// deadline firing in the gap, say) no longer matters. Otherwise the first
/// recorded failure is the root cause, falling back to the merger's own
/// error.
fn settle(
    merged: Result<Canvas, PipelineError>,
    failure: &FirstFailure,
) -> Result<Canvas, PipelineError> {
    match merged {
        Ok(canvas) => {
            if let Some(late) = failure.take() {
                debug!(error = %late, "Ignoring failure raised after the canvas was complete");
            }
            Ok(canvas)
        }
        Err(error) => {
            let root = failure.take().unwrap_or(error);
            warn!(error = %root, "Stitching failed");
            Err(root)
        }
    }
}

/// Pushes every request onto the inbound queue in order, then closes it.
async fn dispatch(
    requests: Vec<TileRequest>,
    queue: mpsc::Sender<TileRequest>,
    cancel: &CancellationToken,
) -> Result<usize, PipelineError> {
    let mut sent = 0;
    for request in requests {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = queue.send(request) => {
                // Every worker gone: they have already reported why
                result.map_err(|_| PipelineError::Cancelled)?;
            }
        }
        sent += 1;
    }
    debug!(sent, "All requests dispatched, closing request queue");
    Ok(sent)
}

/// Fetches and stitches a region with the default HTTP client.
///
/// `corner0` is the north-west corner, `corner1` the south-east one.
pub async fn build_map(
    provider: Provider,
    style: LayerStyle,
    corner0: GeoPoint,
    corner1: GeoPoint,
    zoom: u8,
    workers: usize,
) -> Result<Canvas, PipelineError> {
    let config = StitchConfig::default().with_workers(workers);
    let stitcher = Stitcher::from_config(config)?;
    let request = MapRequest::new(provider, style, corner0, corner1, zoom);
    stitcher.build_map(&request).await
}
