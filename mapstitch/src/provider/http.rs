//! HTTP access to tile servers.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::types::ProviderError;

/// Browser identification sent with every tile request.
///
/// Several tile servers reject requests without a browser-like User-Agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_7_5) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/29.0.1547.76 Safari/537.36";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches raw tile bodies.
///
/// The pipeline is generic over this trait so tests can serve tiles from
/// memory.
pub trait AsyncHttpClient: Send + Sync {
    /// GETs `url` and returns the body.
    ///
    /// Transport failures and non-2xx statuses are errors; the body is not
    /// inspected.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;
}

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a client with the default User-Agent and timeout.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_settings(DEFAULT_USER_AGENT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client with a custom User-Agent and per-request timeout.
    ///
    /// The connection pool keeps enough idle connections for a full worker
    /// pool hitting the same host.
    pub fn with_settings(user_agent: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .pool_max_idle_per_host(64)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                ProviderError::HttpError(format!("Failed to create async HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        trace!(url, "Fetching tile");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url, error = %e, timeout = e.is_timeout(), "Tile request failed");
            ProviderError::HttpError(format!("request to {} failed: {}", url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "Tile server refused request");
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("truncated body from {}: {}", url, e))
        })?;
        debug!(url, status = status.as_u16(), len = body.len(), "Tile received");
        Ok(body.to_vec())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Mock HTTP client returning the same response for every URL.
    pub struct MockAsyncHttpClient {
        pub response: Result<Vec<u8>, ProviderError>,
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn test_mock_returns_configured_response() {
        let tiles = MockAsyncHttpClient {
            response: Ok(vec![0xFF, 0xD8, 0xFF]),
        };
        assert_eq!(tiles.get("http://tiles/1").await.unwrap(), vec![0xFF, 0xD8, 0xFF]);

        let refused = MockAsyncHttpClient {
            response: Err(ProviderError::HttpStatus {
                status: 404,
                url: "http://tiles/1".to_string(),
            }),
        };
        assert!(matches!(
            refused.get("http://tiles/2").await,
            Err(ProviderError::HttpStatus { status: 404, .. })
        ));
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(AsyncReqwestClient::new().is_ok());
        assert!(AsyncReqwestClient::with_settings("test-agent", Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_user_agent_is_browser_like() {
        assert!(DEFAULT_USER_AGENT.starts_with("Mozilla/5.0"));
    }
}
