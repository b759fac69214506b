//! HTTP transport
//!
//! This module performs the single network request behind each load attempt:
//! - The [`Transport`] trait that the loader drives
//! - The default reqwest-backed [`HttpTransport`]
//! - Classification of client errors into [`TransportError`]
//!
//! The transport reports the raw status code and body; deciding whether a
//! status is a failure, and retrying, is the loader's job.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Time allowed to establish a TCP/TLS connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// Response from a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body decoded as text
    pub body: String,
}

/// Network-level failure of a request
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, TLS error
    #[error("connection failed: {0}")]
    Connect(String),

    /// The client's own timeout fired
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The response body could not be read
    #[error("failed to read body: {0}")]
    Body(String),

    /// Any other request failure
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Performs one HTTP request
///
/// Implementations must not retry; the loader owns retry policy and the
/// per-attempt deadline.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `url` with the given request headers
    async fn fetch(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<TransportResponse, TransportError>;
}

/// Default transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport with the default client configuration
    ///
    /// Redirects are followed (up to 10 hops) and compressed bodies are
    /// decoded. No overall request timeout is set on the client because
    /// the loader enforces its own per-item deadline.
    ///
    /// # Returns
    ///
    /// * `Ok(HttpTransport)` - Successfully built transport
    /// * `Err(reqwest::Error)` - Failed to build the HTTP client
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<TransportResponse, TransportError> {
        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}
