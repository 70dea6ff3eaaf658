//! Startup: bring a controller into service before the first request.

use std::sync::Arc;

use waystation_client::fetch::Url;
use waystation_client::{Controller, Fetcher, Registration};
use waystation_core::{AssetManifest, CacheStorage, Error};

/// Install and activate the configured version.
///
/// If the install fails, the single generation left by an earlier run (there
/// is never more than one after activation) keeps serving under the same
/// asset paths. With no such generation, requests go straight to the network
/// until a later deploy installs.
///
/// Returns the version now serving, if any.
pub async fn start<S: CacheStorage, F: Fetcher>(
    registration: &Registration<S, F>, manifest: AssetManifest, origin: Url, storage: Arc<S>, fetcher: Arc<F>,
) -> Result<Option<String>, Error> {
    let controller = Controller::new(manifest.clone(), origin.clone(), storage.clone(), fetcher.clone())?;

    let install_error = match registration.register(controller).await {
        Ok(active) => {
            tracing::info!(version = active.version(), "offline cache active");
            return Ok(Some(active.version().to_string()));
        }
        Err(e) => e,
    };

    tracing::warn!(version = %manifest.version, error = %install_error, "install failed; keeping previous generation");

    let names = storage.keys().await?;
    match names.as_slice() {
        [previous] => {
            let manifest = AssetManifest { version: previous.clone(), ..manifest };
            let resumed = Controller::resume(manifest, origin, storage, fetcher)?;
            let active = registration.adopt(resumed).await?;
            tracing::info!(version = active.version(), "resumed previous cache generation");
            Ok(Some(active.version().to_string()))
        }
        names => {
            tracing::warn!(generations = names.len(), "no single previous generation; serving from network only");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waystation_client::MockFetcher;
    use waystation_core::MemoryStorage;

    const ORIGIN: &str = "https://club.example.org";

    fn site() -> MockFetcher {
        ["/", "/offline.html", "/about/", "/events/", "/team/"]
            .into_iter()
            .fold(MockFetcher::new(), |fetcher, path| fetcher.route(&format!("{ORIGIN}{path}"), 200, path))
    }

    fn origin() -> Url {
        Url::parse(ORIGIN).unwrap()
    }

    #[tokio::test]
    async fn test_start_installs_configured_version() {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(site());
        let registration = Registration::new(fetcher.clone());

        let serving = start(&registration, AssetManifest::new("site-v1"), origin(), storage.clone(), fetcher)
            .await
            .unwrap();

        assert_eq!(serving.as_deref(), Some("site-v1"));
        assert_eq!(storage.keys().await.unwrap(), vec!["site-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_start_resumes_previous_generation_after_failed_install() {
        let storage = Arc::new(MemoryStorage::new());
        let good = Arc::new(site());
        let first_run = Registration::new(good.clone());
        start(&first_run, AssetManifest::new("site-v1"), origin(), storage.clone(), good)
            .await
            .unwrap();

        let offline = Arc::new(site());
        offline.set_online(false);
        let second_run = Registration::new(offline.clone());
        let serving = start(&second_run, AssetManifest::new("site-v2"), origin(), storage.clone(), offline)
            .await
            .unwrap();

        assert_eq!(serving.as_deref(), Some("site-v1"));
        assert_eq!(storage.keys().await.unwrap(), vec!["site-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_start_without_any_generation_serves_network_only() {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(site());
        fetcher.set_online(false);
        let registration = Registration::new(fetcher.clone());

        let serving = start(&registration, AssetManifest::new("site-v1"), origin(), storage, fetcher)
            .await
            .unwrap();

        assert!(serving.is_none());
        assert!(registration.active().await.is_none());
    }
}
