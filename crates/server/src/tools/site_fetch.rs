//! site_fetch tool implementation.
//!
//! Sends one request through the offline cache controller, exactly as a page
//! of the site would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::fetch::{FetchRequest, Method, Url, resolve};
use waystation_client::{Fetcher, Registration};
use waystation_core::{CacheStorage, Error};

use super::json_result;

/// Input parameters for the site_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SiteFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET is served from the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional request body for non-GET methods.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// Output structure for the site_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SiteFetchOutput {
    /// The URL requested.
    pub url: String,
    /// The URL the response belongs to (after redirects, or the cached entry).
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// "network", "passthrough", "cache", or "offline_fallback".
    pub source: String,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response headers in received order.
    pub headers: Vec<HeaderEntry>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// Body size in bytes.
    pub body_bytes: usize,
    /// Network time in milliseconds; 0 when served from the cache.
    pub fetch_ms: u64,
}

/// Route a request through the registration and describe the result.
pub async fn site_fetch<S: CacheStorage, F: Fetcher>(
    registration: &Registration<S, F>, origin: &Url, params: SiteFetchParams,
) -> Result<SiteFetchOutput, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", params.method)))?;
    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = FetchRequest::new(method, url);
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let routed = registration.handle(&request).await?;
    let response = routed.response;

    tracing::debug!(url = %request.url, source = routed.source.as_str(), status = response.status.as_u16(), "site_fetch");

    Ok(SiteFetchOutput {
        url: request.url.to_string(),
        final_url: response.final_url.to_string(),
        status: response.status.as_u16(),
        source: routed.source.as_str().to_string(),
        content_type: response.content_type().map(str::to_string),
        headers: response
            .headers
            .iter()
            .map(|(name, value)| HeaderEntry {
                name: name.as_str().to_string(),
                value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            })
            .collect(),
        body: String::from_utf8_lossy(&response.bytes).into_owned(),
        body_bytes: response.bytes.len(),
        fetch_ms: response.fetch_ms,
    })
}

/// Implementation of the site_fetch tool.
pub async fn fetch_impl<S: CacheStorage, F: Fetcher>(
    registration: &Registration<S, F>, origin: &Url, params: SiteFetchParams,
) -> Result<CallToolResult, McpError> {
    let output = site_fetch(registration, origin, params).await?;
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use waystation_client::{Controller, MockFetcher};
    use waystation_core::{AssetManifest, MemoryStorage};

    const ORIGIN: &str = "https://club.example.org";

    async fn serving() -> (Registration<MemoryStorage, MockFetcher>, Arc<MockFetcher>, Url) {
        let origin = Url::parse(ORIGIN).unwrap();
        let fetcher = Arc::new(
            ["/", "/offline.html", "/about/", "/events/", "/team/"]
                .into_iter()
                .fold(MockFetcher::new(), |f, path| f.route(&format!("{ORIGIN}{path}"), 200, &format!("page {path}"))),
        );
        let storage = Arc::new(MemoryStorage::new());
        let registration = Registration::new(fetcher.clone());
        let controller =
            Controller::new(AssetManifest::new("site-v1"), origin.clone(), storage, fetcher.clone()).unwrap();
        registration.register(controller).await.unwrap();
        (registration, fetcher, origin)
    }

    fn params(url: &str) -> SiteFetchParams {
        SiteFetchParams { url: url.into(), method: default_method(), body: None }
    }

    #[tokio::test]
    async fn test_site_fetch_online() {
        let (registration, _, origin) = serving().await;

        let output = site_fetch(&registration, &origin, params("/about/")).await.unwrap();
        assert_eq!(output.source, "network");
        assert_eq!(output.status, 200);
        assert_eq!(output.body, "page /about/");
        assert_eq!(output.url, "https://club.example.org/about/");
    }

    #[tokio::test]
    async fn test_site_fetch_offline_uses_cache_then_offline_page() {
        let (registration, fetcher, origin) = serving().await;
        fetcher.set_online(false);

        let cached = site_fetch(&registration, &origin, params("/about/?x=1")).await.unwrap();
        assert_eq!(cached.source, "cache");
        assert_eq!(cached.body, "page /about/");
        assert_eq!(cached.fetch_ms, 0);

        let fallback = site_fetch(&registration, &origin, params("/nonexistent-page")).await.unwrap();
        assert_eq!(fallback.source, "offline_fallback");
        assert_eq!(fallback.body, "page /offline.html");
    }

    #[tokio::test]
    async fn test_site_fetch_404_is_returned() {
        let (registration, _, origin) = serving().await;

        let output = site_fetch(&registration, &origin, params("/nonexistent-page")).await.unwrap();
        assert_eq!(output.source, "network");
        assert_eq!(output.status, 404);
    }

    #[tokio::test]
    async fn test_site_fetch_post_passthrough() {
        let (registration, fetcher, origin) = serving().await;
        let post = SiteFetchParams { url: "/events/".into(), method: "post".into(), body: Some("rsvp=yes".into()) };

        let output = site_fetch(&registration, &origin, post).await.unwrap();
        assert_eq!(output.source, "passthrough");
        assert_eq!(fetcher.calls().last().map(|(m, _)| m.clone()), Some(Method::POST));
    }

    #[tokio::test]
    async fn test_site_fetch_rejects_bad_input() {
        let (registration, _, origin) = serving().await;

        let empty = site_fetch(&registration, &origin, params("  ")).await;
        assert!(matches!(empty, Err(Error::InvalidInput(_))));

        let method = SiteFetchParams { method: "BAD METHOD".into(), ..params("/") };
        assert!(matches!(site_fetch(&registration, &origin, method).await, Err(Error::InvalidInput(_))));

        let scheme = site_fetch(&registration, &origin, params("ftp://club.example.org/")).await;
        assert!(matches!(scheme, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_impl_wraps_json() {
        let (registration, _, origin) = serving().await;
        let result = fetch_impl(&registration, &origin, params("/")).await;
        assert!(result.is_ok());
    }
}
