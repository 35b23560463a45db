//! Concurrent fetch and merge pipeline
//!
//! # Architecture
//!
//! ```text
//!                   ┌──────────┐
//!  TileRequest ───► │ worker 0 │──┐
//!  (bounded,        ├──────────┤  │  TileData         ┌────────┐
//!   shared)    ───► │ worker 1 │──┼─ (bounded) ─────► │ merger │──► Canvas
//!              ───► │   ...    │──┘                   └────────┘
//!                   └────┬─────┘
//!                        │ ProgressEvent (unbounded)
//!                        ▼
//!                   ┌─────────┐
//!                   │ monitor │──► ProgressSink
//!                   └─────────┘
//! ```
//!
//! Workers are tracked by a completion tracker that closes the merger's
//! queue once all of them have finished. A shared cancellation token stops
//! every stage on the first failure, on caller cancellation, or when the run
//! deadline passes.

mod completion;
mod error;
mod fetcher;
mod merger;
mod orchestrator;
mod progress;

pub use error::PipelineError;
pub use orchestrator::{build_map, MapRequest, Phase, StitchPlan, Stitcher};
pub use progress::{LogProgress, ProgressEvent, ProgressSink};
