//! Request interception.

use waystation_core::{CacheRequest, CacheStorage, Error, MatchOptions};

use super::{Controller, Phase, ResponseSource, Routed};
use crate::fetch::{FetchRequest, FetchResponse, Fetcher, TransportError};

impl<S: CacheStorage, F: Fetcher> Controller<S, F> {
    /// Route one request.
    ///
    /// Non-GET requests go to the network untouched and never read or write
    /// the cache; their transport errors surface as `Error::Transport`.
    ///
    /// A GET is answered by the first of:
    /// 1. the live network, whatever the status (never written to the cache)
    /// 2. on a transport error only, the snapshot for this URL, query ignored
    /// 3. the offline document
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` unless the controller is `Activated`
    /// - `Error::OfflineFallbackMissing` if the network, the cache and the
    ///   offline document all miss
    /// - storage errors from the backend
    pub async fn handle(&self, request: &FetchRequest) -> Result<Routed, Error> {
        if self.phase() != Phase::Activated {
            return Err(Error::InvalidState(format!("controller {} is {}", self.manifest.version, self.phase())));
        }

        if !request.is_get() {
            let response = self.fetcher.fetch(request).await?;
            return Ok(Routed { response, source: ResponseSource::Passthrough });
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => Ok(Routed { response, source: ResponseSource::Network }),
            Err(transport) => {
                tracing::warn!(url = %request.url, error = %transport, "network unavailable; falling back to cache");
                self.fallback(request, transport).await
            }
        }
    }

    async fn fallback(&self, request: &FetchRequest, transport: TransportError) -> Result<Routed, Error> {
        let version = self.manifest.version.as_str();

        if let Some(stored) = self
            .storage
            .match_request(version, &request.cache_request(), MatchOptions::ignore_search())
            .await?
        {
            tracing::debug!(url = %request.url, stored = %stored.url, "served from cache");
            return Ok(Routed { response: FetchResponse::from_stored(stored)?, source: ResponseSource::Cache });
        }

        let offline_url = self.asset_url(&self.manifest.offline_page)?;
        let offline = CacheRequest::get(offline_url.as_str());
        match self
            .storage
            .match_request(version, &offline, MatchOptions::ignore_search())
            .await?
        {
            Some(stored) => {
                tracing::debug!(url = %request.url, "served offline document");
                Ok(Routed { response: FetchResponse::from_stored(stored)?, source: ResponseSource::OfflineFallback })
            }
            None => Err(Error::OfflineFallbackMissing(format!("{offline_url} not in {version} ({transport})"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use reqwest::{Method, StatusCode, Url};

    use super::super::testing::*;
    use super::*;
    use crate::fetch::MockFetcher;
    use waystation_core::MemoryStorage;

    async fn activated(
        fetcher: MockFetcher,
    ) -> (Controller<MemoryStorage, MockFetcher>, Arc<MemoryStorage>, Arc<MockFetcher>) {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(fetcher);
        let controller = controller("site-v1", &storage, &fetcher);
        controller.install().await.unwrap();
        controller.activate().await.unwrap();
        (controller, storage, fetcher)
    }

    fn get(path: &str) -> FetchRequest {
        FetchRequest::get(Url::parse(&format!("{ORIGIN}{path}")).unwrap())
    }

    #[tokio::test]
    async fn test_online_returns_network_response_without_caching() {
        let (controller, storage, _) =
            activated(site().route("https://club.example.org/about/?x=1", 200, "fresh about")).await;
        let writes = storage.writes();
        let reads = storage.reads();

        let routed = controller.handle(&get("/about/?x=1")).await.unwrap();
        assert_eq!(routed.source, ResponseSource::Network);
        assert_eq!(routed.response.bytes, Bytes::from_static(b"fresh about"));
        assert_eq!(storage.writes(), writes);
        assert_eq!(storage.reads(), reads);
    }

    #[tokio::test]
    async fn test_offline_serves_cached_page_ignoring_query() {
        let (controller, _, fetcher) = activated(site()).await;
        fetcher.set_online(false);

        let routed = controller.handle(&get("/about/?x=1")).await.unwrap();
        assert_eq!(routed.source, ResponseSource::Cache);
        assert_eq!(routed.response.status, StatusCode::OK);
        assert_eq!(routed.response.bytes, Bytes::from_static(b"about"));
        assert_eq!(routed.response.url.as_str(), "https://club.example.org/about/");
    }

    #[tokio::test]
    async fn test_offline_unknown_page_serves_offline_document() {
        let (controller, _, fetcher) = activated(site()).await;
        fetcher.set_online(false);

        let routed = controller.handle(&get("/nonexistent-page")).await.unwrap();
        assert_eq!(routed.source, ResponseSource::OfflineFallback);
        assert_eq!(routed.response.bytes, Bytes::from_static(b"offline"));
    }

    #[tokio::test]
    async fn test_http_404_passes_through() {
        let (controller, _, _) = activated(site()).await;

        let routed = controller.handle(&get("/nonexistent-page")).await.unwrap();
        assert_eq!(routed.source, ResponseSource::Network);
        assert_eq!(routed.response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_http_500_on_cached_page_is_not_replaced() {
        let (controller, storage, _) = activated(site()).await;
        let fetcher = Arc::new(site().route("https://club.example.org/team/", 503, "maintenance"));
        let serving = Controller::resume(controller.manifest().clone(), origin(), storage, fetcher.clone()).unwrap();

        let routed = serving.handle(&get("/team/")).await.unwrap();
        assert_eq!(routed.source, ResponseSource::Network);
        assert_eq!(routed.response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_non_get_never_touches_cache() {
        let (controller, storage, fetcher) = activated(site()).await;
        let writes = storage.writes();
        let reads = storage.reads();

        let post = FetchRequest::new(Method::POST, Url::parse(&format!("{ORIGIN}/about/")).unwrap()).with_body("x=1");
        let routed = controller.handle(&post).await.unwrap();
        assert_eq!(routed.source, ResponseSource::Passthrough);

        fetcher.set_online(false);
        let result = controller.handle(&post).await;
        assert!(matches!(result, Err(Error::Transport(_))));

        assert_eq!(storage.writes(), writes);
        assert_eq!(storage.reads(), reads);
    }

    #[tokio::test]
    async fn test_missing_offline_document_is_an_error() {
        let (controller, storage, fetcher) = activated(site()).await;
        storage.delete("site-v1").await.unwrap();
        fetcher.set_online(false);

        let result = controller.handle(&get("/about/")).await;
        assert!(matches!(result, Err(Error::OfflineFallbackMissing(_))));
    }

    #[tokio::test]
    async fn test_handle_requires_activation() {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(site());
        let controller = controller("site-v1", &storage, &fetcher);
        controller.install().await.unwrap();

        let result = controller.handle(&get("/")).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }
}
