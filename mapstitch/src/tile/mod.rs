//! Tile enumeration and request types
//!
//! Turns a pair of projected corners into the ordered set of tiles to fetch,
//! the fetch requests for them, and the georeferencing of the stitched result.

mod frame;
mod grid;
mod request;

pub use frame::{Corner, Datum, GeoFrame};
pub use grid::{GridError, TileGrid, MAX_PIXELS};
pub use request::{TileData, TileRequest};
