//! Map tile provider abstraction
//!
//! This module knows how to address tiles on the supported providers
//! (Google, Amap, Tencent), how to fetch them over HTTP, and how to tell
//! real imagery from a provider's "nothing here" placeholder.
//!
//! ```ignore
//! use mapstitch::provider::{AsyncReqwestClient, LayerStyle, Provider, UrlFormatter};
//!
//! let client = AsyncReqwestClient::new()?;
//! let url = UrlFormatter::default().format(Provider::Google, &tile, LayerStyle::Satellite);
//! let body = client.get(&url).await?;
//! ```

mod http;
mod payload;
mod template;
mod types;

pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT};
pub use payload::PayloadKind;
pub use template::{UrlFormatter, UrlTemplates};
pub use types::{LayerStyle, Provider, ProviderError};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
