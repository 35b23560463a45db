//! Pipeline error types.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::canvas::CanvasError;
use crate::config::ConfigError;
use crate::coord::CoordError;
use crate::provider::{PayloadKind, ProviderError};
use crate::tile::GridError;

/// Errors that end a stitching run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A corner or zoom level was rejected
    #[error("invalid coordinates: {0}")]
    Coord(#[from] CoordError),

    /// The corners do not span a valid tile grid
    #[error("invalid tile range: {0}")]
    Grid(#[from] GridError),

    /// Run configuration is unusable
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Provider setup failed (for example building the HTTP client)
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A tile request failed
    #[error("failed to fetch tile ({grid_x}, {grid_y}) from {url}: {source}")]
    Fetch {
        url: String,
        grid_x: u32,
        grid_y: u32,
        source: ProviderError,
    },

    /// The provider answered with its "no imagery" placeholder
    #[error(
        "no imagery available for tile ({grid_x}, {grid_y}) at {url} \
         (provider returned {kind:?}); try another zoom level or provider"
    )]
    NoImagery {
        url: String,
        grid_x: u32,
        grid_y: u32,
        kind: PayloadKind,
    },

    /// A fetched tile could not be decoded
    #[error("failed to decode tile ({grid_x}, {grid_y}): {message}")]
    Decode {
        grid_x: u32,
        grid_y: u32,
        message: String,
    },

    /// A decoded tile could not be placed
    #[error("failed to place tile: {0}")]
    Canvas(#[from] CanvasError),

    /// The data queue closed before every tile was merged
    #[error("only {merged} of {expected} tiles were merged")]
    Incomplete { merged: usize, expected: usize },

    /// The run was cancelled by the caller
    #[error("stitching cancelled")]
    Cancelled,

    /// The overall run deadline passed
    #[error("stitching timed out after {0:?}")]
    Timeout(Duration),

    /// A pipeline task panicked or was aborted
    #[error("pipeline task failed: {0}")]
    TaskFailed(String),
}

impl PipelineError {
    /// True for the error every task reports once the run is cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    /// True if the caller may succeed by retrying with another zoom level or
    /// provider.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::NoImagery { .. })
    }

    /// True for errors detected before any network activity.
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            PipelineError::Coord(_)
                | PipelineError::Grid(_)
                | PipelineError::Config(_)
                | PipelineError::Provider(_)
        )
    }
}

/// Records the first fatal error of a run and cancels the run with it.
///
/// Every task that fails reports here; only the first non-cancellation error
/// is kept, so the caller sees the root cause rather than the cancellations
/// it triggered.
#[derive(Debug, Clone)]
pub(crate) struct FirstFailure {
    slot: Arc<Mutex<Option<PipelineError>>>,
    cancel: CancellationToken,
}

impl FirstFailure {
    pub(crate) fn new(cancel: CancellationToken) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            cancel,
        }
    }

    /// Reports a failure. Cancellations are ignored; the first other error
    /// is stored and cancels the run.
    pub(crate) fn fail(&self, error: PipelineError) {
        if error.is_cancelled() {
            return;
        }

        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            debug!(error = %error, "Cancelling run after first failure");
            *slot = Some(error);
            self.cancel.cancel();
        } else {
            debug!(error = %error, "Ignoring failure after run was cancelled");
        }
    }

    /// Takes the recorded root cause, if any.
    pub(crate) fn take(&self) -> Option<PipelineError> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_failure_wins() {
        let cancel = CancellationToken::new();
        let failure = FirstFailure::new(cancel.clone());

        failure.fail(PipelineError::Decode {
            grid_x: 1,
            grid_y: 2,
            message: "bad".to_string(),
        });
        failure.fail(PipelineError::Timeout(Duration::from_secs(1)));

        assert!(cancel.is_cancelled());
        assert!(matches!(
            failure.take(),
            Some(PipelineError::Decode { grid_x: 1, grid_y: 2, .. })
        ));
        assert!(failure.take().is_none());
    }

    #[test]
    fn test_cancellation_is_not_a_root_cause() {
        let cancel = CancellationToken::new();
        let failure = FirstFailure::new(cancel.clone());

        failure.fail(PipelineError::Cancelled);
        assert!(!cancel.is_cancelled());
        assert!(failure.take().is_none());

        failure.fail(PipelineError::Incomplete {
            merged: 1,
            expected: 2,
        });
        assert!(matches!(failure.take(), Some(PipelineError::Incomplete { .. })));
    }

    #[test]
    fn test_classification() {
        let no_imagery = PipelineError::NoImagery {
            url: "http://example.com".to_string(),
            grid_x: 0,
            grid_y: 0,
            kind: PayloadKind::Png,
        };
        assert!(no_imagery.is_recoverable());
        assert!(!no_imagery.is_rejected_request());

        let config: PipelineError = ConfigError::NoWorkers.into();
        assert!(config.is_rejected_request());
        assert!(!config.is_recoverable());

        assert!(PipelineError::Cancelled.is_cancelled());
        assert!(!PipelineError::Timeout(Duration::from_secs(1)).is_cancelled());
    }

    #[test]
    fn test_fetch_error_keeps_source() {
        use std::error::Error as _;

        let err = PipelineError::Fetch {
            url: "http://example.com/1".to_string(),
            grid_x: 0,
            grid_y: 1,
            source: ProviderError::HttpStatus {
                status: 404,
                url: "http://example.com/1".to_string(),
            },
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("(0, 1)"));
    }
}
