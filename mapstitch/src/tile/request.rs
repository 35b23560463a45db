//! Fetch request and fetched payload types.
//!
//! Both carry the tile's offset within the output canvas rather than its raw
//! grid coordinate, so the merger can place a payload without knowing which
//! region was requested.

use bytes::Bytes;

/// Request to fetch one tile.
///
/// # Example
///
/// ```
/// use mapstitch::tile::TileRequest;
///
/// let request = TileRequest::new("http://tiles.example/4/2/5.png", 0, 1);
/// assert_eq!(request.grid_x, 0);
/// assert_eq!(request.grid_y, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileRequest {
    /// Fully formatted fetch URL
    pub url: String,
    /// Column offset within the canvas, in tiles
    pub grid_x: u32,
    /// Row offset within the canvas, in tiles
    pub grid_y: u32,
}

impl TileRequest {
    /// Create a new tile request.
    pub fn new(url: impl Into<String>, grid_x: u32, grid_y: u32) -> Self {
        Self {
            url: url.into(),
            grid_x,
            grid_y,
        }
    }
}

/// A fetched, not yet decoded tile and its placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileData {
    pub bytes: Bytes,
    pub grid_x: u32,
    pub grid_y: u32,
}

impl TileData {
    pub fn new(bytes: impl Into<Bytes>, grid_x: u32, grid_y: u32) -> Self {
        Self {
            bytes: bytes.into(),
            grid_x,
            grid_y,
        }
    }

    /// Attaches a fetched body to the request it answers.
    pub fn for_request(request: &TileRequest, bytes: impl Into<Bytes>) -> Self {
        Self::new(bytes, request.grid_x, request.grid_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_keeps_request_offsets() {
        let request = TileRequest::new("http://example.com/t", 3, 7);
        let data = TileData::for_request(&request, vec![1u8, 2, 3]);

        assert_eq!((data.grid_x, data.grid_y), (3, 7));
        assert_eq!(&data.bytes[..], &[1, 2, 3]);
    }

    #[test]
    fn test_request_equality_includes_offsets() {
        let a = TileRequest::new("u", 0, 0);
        assert_eq!(a, TileRequest::new("u".to_string(), 0, 0));
        assert_ne!(a, TileRequest::new("u", 1, 0));
    }
}
