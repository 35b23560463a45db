//! Provider types and errors

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors that can occur during provider operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Provider name not in the known set
    #[error("unknown map provider '{0}' (expected one of: google, amap, tencent)")]
    UnknownProvider(String),

    /// Layer style name not in the known set
    #[error("unknown layer style '{0}' (expected satellite or map)")]
    UnknownStyle(String),

    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Response body could not be read
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A tile-serving source.
///
/// Each provider has its own URL scheme and row-numbering convention;
/// see [`UrlFormatter`](super::UrlFormatter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Google map tiles, XYZ rows
    Google,
    /// AutoNavi (Amap) tiles, XYZ rows
    Amap,
    /// Tencent tiles, rows counted from the south
    Tencent,
}

impl Provider {
    /// Every supported provider.
    pub const ALL: [Provider; 3] = [Provider::Google, Provider::Amap, Provider::Tencent];

    /// Short lowercase identifier, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Amap => "amap",
            Provider::Tencent => "tencent",
        }
    }

    /// Whether the provider numbers rows from the south edge of the grid.
    pub fn inverts_rows(&self) -> bool {
        matches!(self, Provider::Tencent)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "amap" => Ok(Provider::Amap),
            "tencent" => Ok(Provider::Tencent),
            _ => Err(ProviderError::UnknownProvider(s.to_string())),
        }
    }
}

/// Imagery layer requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerStyle {
    /// Aerial/satellite photography, served as JPEG
    Satellite,
    /// Rendered street map
    Map,
}

impl LayerStyle {
    /// Lowercase identifier.
    pub fn name(&self) -> &'static str {
        match self {
            LayerStyle::Satellite => "satellite",
            LayerStyle::Map => "map",
        }
    }
}

impl fmt::Display for LayerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayerStyle {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "satellite" | "s" => Ok(LayerStyle::Satellite),
            "map" | "m" => Ok(LayerStyle::Map),
            _ => Err(ProviderError::UnknownStyle(s.to_string())),
        }
    }
}
