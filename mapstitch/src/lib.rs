//! MapStitch - slippy-map tile fetching and stitching
//!
//! Downloads every tile covering a geographic rectangle from a web map
//! provider and stitches them into one raster image.
//!
//! # Overview
//!
//! ```text
//! GeoPoint corners ─► Projector ─► TileGrid ─► TileRequests
//!                                                   │
//!                                      fetch workers (parallel)
//!                                                   │
//!                                          merger (serial) ─► Canvas
//! ```
//!
//! - [`coord`]: Web Mercator projection, zoom levels, datum shifts
//! - [`provider`]: providers, URL templates, HTTP client, payload sniffing
//! - [`tile`]: tile grid enumeration and georeferencing
//! - [`canvas`]: the output raster
//! - [`pipeline`]: the concurrent fetch/merge pipeline
//! - [`config`]: run configuration and INI loading
//! - [`output`]: JPEG/PNG encoding of a finished canvas
//!
//! # Example
//!
//! ```ignore
//! use mapstitch::coord::GeoPoint;
//! use mapstitch::provider::{LayerStyle, Provider};
//!
//! let canvas = mapstitch::build_map(
//!     Provider::Amap,
//!     LayerStyle::Satellite,
//!     GeoPoint::new(116.30, 40.00),
//!     GeoPoint::new(116.45, 39.90),
//!     14,
//!     10,
//! )
//! .await?;
//! mapstitch::output::save(&canvas, "beijing.jpg".as_ref(), 75)?;
//! ```

pub mod canvas;
pub mod config;
pub mod coord;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod provider;
pub mod tile;

pub use canvas::{Canvas, TILE_SIZE};
pub use config::StitchConfig;
pub use pipeline::{build_map, MapRequest, PipelineError, Stitcher};
