//! Response payload sniffing.
//!
//! Providers answer requests for areas they have no imagery for with a
//! success status and a placeholder body, so the only way to tell the two
//! apart is by looking at the bytes.

use super::types::LayerStyle;

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const PNG_MAGIC: [u8; 4] = [0x89, b'P', b'N', b'G'];

/// How many leading bytes are inspected for an HTML marker.
const HTML_SNIFF_LEN: usize = 64;

/// Coarse classification of a tile response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Empty,
    Jpeg,
    Png,
    Html,
    Unknown,
}

impl PayloadKind {
    /// Classifies a response body by its leading bytes.
    pub fn sniff(body: &[u8]) -> Self {
        if body.is_empty() {
            return PayloadKind::Empty;
        }
        if body.starts_with(&JPEG_MAGIC) {
            return PayloadKind::Jpeg;
        }
        if body.starts_with(&PNG_MAGIC) {
            return PayloadKind::Png;
        }

        let head = &body[..body.len().min(HTML_SNIFF_LEN)];
        let head = String::from_utf8_lossy(head).to_ascii_lowercase();
        if head.trim_start().starts_with('<') && head.contains("html") {
            return PayloadKind::Html;
        }

        PayloadKind::Unknown
    }

    /// Whether a body of this kind is real imagery for the requested style.
    ///
    /// Satellite layers are served as JPEG; a PNG in their place is the
    /// provider's "no imagery here" placeholder. Unknown formats are left to
    /// the decoder.
    pub fn is_tile_for(self, style: LayerStyle) -> bool {
        match self {
            PayloadKind::Empty | PayloadKind::Html => false,
            PayloadKind::Png => style == LayerStyle::Map,
            PayloadKind::Jpeg | PayloadKind::Unknown => true,
        }
    }
}
