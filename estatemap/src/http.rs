//! HTTP client abstraction for testability.
//!
//! All remote fetches (hazard GeoJSON, listing photos, geocode lookups) go
//! through [`AsyncHttpClient`] so tests can substitute instrumented stubs
//! for the network.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// HTTP-level errors.
///
/// `Clone` so a single failure can be shared with every coalesced waiter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HttpError {
    /// Request could not be sent or the connection failed
    #[error("request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Request exceeded the client timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body could not be read
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Trait for asynchronous HTTP GET operations.
///
/// Implementations must be `Send + Sync` so one client can be shared across
/// concurrent pipeline workers.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body as bytes or an error.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;
}

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
    timeout: Duration,
}

/// Default User-Agent string for HTTP requests.
///
/// Some image origin servers reject requests without a User-Agent; the
/// Nominatim usage policy requires an identifying one.
const DEFAULT_USER_AGENT: &str = concat!("estatemap/", env!("CARGO_PKG_VERSION"));

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

impl AsyncReqwestClient {
    /// Creates a client with the default 30 s timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom timeout.
    ///
    /// The timeout bounds the whole request, so a stalled remote endpoint
    /// cannot hold a pipeline worker indefinitely.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| HttpError::Request(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) if e.is_timeout() => {
                warn!(url = url, "HTTP request timed out");
                return Err(HttpError::Timeout(self.timeout));
            }
            Err(e) => {
                warn!(url = url, error = %e, "HTTP request failed");
                return Err(HttpError::Request(e.to_string()));
            }
        };

        if !response.status().is_success() {
            warn!(
                url = url,
                status = response.status().as_u16(),
                "HTTP error status"
            );
            return Err(HttpError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                warn!(url = url, error = %e, "failed to read response body");
                Err(HttpError::Body(e.to_string()))
            }
        }
    }
}
