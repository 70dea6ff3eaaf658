//! Network fetch layer.
//!
//! The controller reaches the network only through the [`Fetcher`] trait.
//! A fetcher answers with either a response (any status, including 4xx/5xx)
//! or a [`TransportError`] when no response arrived at all. That split is the
//! whole contract: only transport errors trigger the offline fallbacks.
//!
//! - [`FetchClient`]: reqwest-backed fetcher with rustls, timeout, redirect cap
//! - [`MockFetcher`]: scripted fetcher for tests

pub mod mock;
pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

pub use mock::MockFetcher;
pub use self::url::{UrlError, parse_origin, resolve};
pub use reqwest::{Method, StatusCode, Url};

use waystation_core::{AppConfig, CacheRequest, Error, StoredResponse};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "waystation/<version>")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("waystation/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), max_redirects: config.max_redirects }
    }
}

/// No response was received.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Transport(err.to_string())
    }
}

/// An outbound request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Key under which this request is looked up in a cache generation.
    pub fn cache_request(&self) -> CacheRequest {
        CacheRequest::new(self.method.as_str(), self.url.as_str())
    }
}

/// Response from a fetch operation or a cache snapshot.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds (0 for snapshots)
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Content-Type header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Snapshot this response for storage under `request`.
    pub fn to_stored(&self, request: &CacheRequest) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();
        StoredResponse::new(request, self.status.as_u16(), headers, self.bytes.to_vec())
    }

    /// Rebuild a response from a cache snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::CorruptEntry` if the stored URL, status, or a header
    /// cannot be parsed back.
    pub fn from_stored(stored: StoredResponse) -> Result<Self, Error> {
        let url = Url::parse(&stored.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", stored.url)))?;
        let status = StatusCode::from_u16(stored.status)
            .map_err(|e| Error::CorruptEntry(format!("status {}: {e}", stored.status)))?;

        let mut headers = HeaderMap::with_capacity(stored.headers.len());
        for (name, value) in &stored.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::CorruptEntry(format!("header {name}: {e}")))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| Error::CorruptEntry(format!("header {name}: {e}")))?;
            headers.append(name, value);
        }

        Ok(Self { final_url: url.clone(), url, status, headers, bytes: Bytes::from(stored.body), fetch_ms: 0 })
    }
}

/// Anything that can put a request on the wire.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Send `request`. Any HTTP status is a successful fetch.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Wrap an already configured reqwest client.
    pub fn with_http(http: Client, config: FetchConfig) -> Self {
        Self { http, config }
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "{} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url: request.url.clone(), final_url, status, headers, bytes, fetch_ms })
    }
}
