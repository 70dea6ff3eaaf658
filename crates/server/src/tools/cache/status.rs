//! cache_status tool implementation.
//!
//! Reports the active controller and what its generation holds.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::fetch::Url;
use waystation_client::{Fetcher, Registration};
use waystation_core::{CacheRequest, CacheStorage, Error};

use crate::tools::json_result;

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    /// Origin that paths resolve against.
    pub origin: String,
    /// Version of the active controller, if one is serving.
    pub active_version: Option<String>,
    /// Lifecycle phase of the active controller.
    pub phase: Option<String>,
    /// Every generation present in storage.
    pub generations: Vec<String>,
    /// Requests stored in the active generation.
    pub entries: Vec<CacheRequest>,
}

pub async fn cache_status<S: CacheStorage, F: Fetcher>(
    registration: &Registration<S, F>, storage: &S, origin: &Url,
) -> Result<CacheStatusOutput, Error> {
    let active = registration.active().await;
    let generations = storage.keys().await?;
    let entries = match &active {
        Some(controller) => storage.requests(controller.version()).await?,
        None => Vec::new(),
    };

    Ok(CacheStatusOutput {
        origin: origin.to_string(),
        active_version: active.as_ref().map(|c| c.version().to_string()),
        phase: active.as_ref().map(|c| c.phase().to_string()),
        generations,
        entries,
    })
}

/// Implementation of the cache_status tool.
pub async fn status_impl<S: CacheStorage, F: Fetcher>(
    registration: &Registration<S, F>, storage: &S, origin: &Url,
) -> Result<CallToolResult, McpError> {
    let output = cache_status(registration, storage, origin).await?;
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use waystation_client::{Controller, MockFetcher};
    use waystation_core::{AssetManifest, MemoryStorage};

    const ORIGIN: &str = "https://club.example.org";

    #[tokio::test]
    async fn test_status_without_controller() {
        let storage = Arc::new(MemoryStorage::new());
        let registration: Registration<MemoryStorage, MockFetcher> = Registration::new(Arc::new(MockFetcher::new()));
        let origin = Url::parse(ORIGIN).unwrap();

        let output = cache_status(&registration, storage.as_ref(), &origin).await.unwrap();
        assert!(output.active_version.is_none());
        assert!(output.generations.is_empty());
        assert!(output.entries.is_empty());
    }

    #[tokio::test]
    async fn test_status_lists_active_generation() {
        let origin = Url::parse(ORIGIN).unwrap();
        let fetcher = Arc::new(
            ["/", "/offline.html", "/about/", "/events/", "/team/"]
                .into_iter()
                .fold(MockFetcher::new(), |f, path| f.route(&format!("{ORIGIN}{path}"), 200, path)),
        );
        let storage = Arc::new(MemoryStorage::new());
        storage.open("site-v0").await.unwrap();

        let registration = Registration::new(fetcher.clone());
        let controller =
            Controller::new(AssetManifest::new("site-v1"), origin.clone(), storage.clone(), fetcher).unwrap();
        registration.register(controller).await.unwrap();

        let output = cache_status(&registration, storage.as_ref(), &origin).await.unwrap();
        assert_eq!(output.active_version.as_deref(), Some("site-v1"));
        assert_eq!(output.phase.as_deref(), Some("activated"));
        assert_eq!(output.generations, vec!["site-v1".to_string()]);
        assert_eq!(output.entries.len(), 5);
        assert!(output.entries.iter().all(|e| e.method == "GET"));
    }
}
