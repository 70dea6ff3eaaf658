//! Cache storage abstraction.
//!
//! Mirrors the shape of a browser `CacheStorage`: open a named generation,
//! store a batch of responses, match a request, delete a generation, and list
//! generation names. The controller only talks to this trait, so tests can
//! inject [`MemoryStorage`](super::MemoryStorage) in place of SQLite.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::key::{normalize_method, strip_search};
use crate::Error;

/// Request key: method plus canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheRequest {
    pub method: String,
    pub url: String,
}

impl CacheRequest {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self { method: normalize_method(method), url: url.into() }
    }

    /// Shorthand for a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// URL with the query string and fragment removed.
    pub fn search_free_url(&self) -> String {
        strip_search(&self.url)
    }
}

/// Lookup options for [`CacheStorage::match_request`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Compare URLs without their query string.
    pub ignore_search: bool,
}

impl MatchOptions {
    pub fn ignore_search() -> Self {
        Self { ignore_search: true }
    }
}

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Snapshot a response for `request`, stamped with the current time.
    pub fn new(request: &CacheRequest, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            status,
            headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// The request this snapshot answers.
    pub fn request(&self) -> CacheRequest {
        CacheRequest::new(&self.method, self.url.clone())
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Durable named store of response snapshots.
///
/// Implementations must be safe for concurrent readers and writers, and
/// [`add_all`](CacheStorage::add_all) must be atomic: either every response
/// is stored or none is.
#[async_trait]
pub trait CacheStorage: Send + Sync + 'static {
    /// Open the named generation, creating it if absent.
    ///
    /// Returns `true` when this call created it.
    async fn open(&self, name: &str) -> Result<bool, Error>;

    /// Store every response in the named generation, replacing entries for
    /// the same request. Creates the generation if needed.
    async fn add_all(&self, name: &str, responses: Vec<StoredResponse>) -> Result<(), Error>;

    /// Find the stored response for `request` in the named generation.
    ///
    /// With `ignore_search`, an exact URL match wins over other entries that
    /// only agree once query strings are dropped.
    async fn match_request(
        &self, name: &str, request: &CacheRequest, options: MatchOptions,
    ) -> Result<Option<StoredResponse>, Error>;

    /// Delete the named generation and its entries. Returns `true` if it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Names of all existing generations, sorted.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Requests stored in the named generation, sorted by URL.
    async fn requests(&self, name: &str) -> Result<Vec<CacheRequest>, Error>;
}
