//! cache_match tool implementation.
//!
//! Looks a URL up in the active generation without touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::fetch::{Url, resolve};
use waystation_client::{Fetcher, Registration};
use waystation_core::{CacheRequest, CacheStorage, Error, MatchOptions};

use crate::tools::json_result;

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    /// The query string is ignored when matching.
    pub url: String,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchOutput {
    /// Generation the entry was found in.
    pub generation: String,
    /// URL of the stored entry.
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_bytes: usize,
    /// RFC 3339 timestamp of when the entry was stored.
    pub stored_at: String,
}

pub async fn cache_match<S: CacheStorage, F: Fetcher>(
    registration: &Registration<S, F>, origin: &Url, params: CacheMatchParams,
) -> Result<CacheMatchOutput, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }
    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let controller = registration
        .active()
        .await
        .ok_or_else(|| Error::CacheMiss(format!("{url}: no active cache generation")))?;
    let generation = controller.version().to_string();

    let stored = controller
        .storage()
        .match_request(&generation, &CacheRequest::get(url.as_str()), MatchOptions::ignore_search())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{url} not in {generation}")))?;

    Ok(CacheMatchOutput {
        content_type: stored.header("content-type").map(str::to_string),
        body_bytes: stored.body.len(),
        generation,
        url: stored.url,
        status: stored.status,
        stored_at: stored.stored_at,
    })
}

/// Implementation of the cache_match tool.
pub async fn match_impl<S: CacheStorage, F: Fetcher>(
    registration: &Registration<S, F>, origin: &Url, params: CacheMatchParams,
) -> Result<CallToolResult, McpError> {
    let output = cache_match(registration, origin, params).await?;
    json_result(&output)
}
