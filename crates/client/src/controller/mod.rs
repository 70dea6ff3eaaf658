//! Offline cache controller.
//!
//! A controller owns one cache generation, named by its manifest version,
//! and moves through these phases:
//!
//! ```text
//! Pending --install--> Installing --ok--> Installed --activate--> Activated
//!                          |
//!                          +--fail--> Redundant
//! ```
//!
//! Once activated it intercepts requests: non-GET goes straight to the
//! network; GET tries the network, then the generation (query string
//! ignored), then the offline document. A [`Registration`] holds the active
//! controller and swaps in a new one after it installs and activates.

mod lifecycle;
mod registration;
mod routing;

use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use tokio::sync::watch;
use waystation_core::{AssetManifest, CacheStorage, Error};

use crate::fetch::{FetchResponse, Fetcher, UrlError, resolve};

pub use registration::Registration;

/// Lifecycle phase of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Installing,
    Installed,
    Activated,
    Redundant,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Installing => "installing",
            Phase::Installed => "installed",
            Phase::Activated => "activated",
            Phase::Redundant => "redundant",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which routing step produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Live network answer to a GET.
    Network,
    /// Non-GET request sent straight through.
    Passthrough,
    /// Snapshot from the current generation.
    Cache,
    /// The offline document.
    OfflineFallback,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Passthrough => "passthrough",
            ResponseSource::Cache => "cache",
            ResponseSource::OfflineFallback => "offline_fallback",
        }
    }
}

/// A response plus where it came from.
#[derive(Debug, Clone)]
pub struct Routed {
    pub response: FetchResponse,
    pub source: ResponseSource,
}

/// One deployed version of the offline cache.
pub struct Controller<S, F> {
    manifest: AssetManifest,
    origin: Url,
    storage: Arc<S>,
    fetcher: Arc<F>,
    phase: watch::Sender<Phase>,
}

impl<S: CacheStorage, F: Fetcher> Controller<S, F> {
    /// Create a controller that still has to install.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the manifest is inconsistent, or
    /// `Error::InvalidUrl` if a core asset does not resolve against `origin`.
    pub fn new(manifest: AssetManifest, origin: Url, storage: Arc<S>, fetcher: Arc<F>) -> Result<Self, Error> {
        Self::with_phase(manifest, origin, storage, fetcher, Phase::Pending)
    }

    /// Take over a generation left activated by an earlier run, skipping install.
    pub fn resume(manifest: AssetManifest, origin: Url, storage: Arc<S>, fetcher: Arc<F>) -> Result<Self, Error> {
        Self::with_phase(manifest, origin, storage, fetcher, Phase::Activated)
    }

    fn with_phase(
        manifest: AssetManifest, origin: Url, storage: Arc<S>, fetcher: Arc<F>, phase: Phase,
    ) -> Result<Self, Error> {
        manifest.validate()?;
        for path in &manifest.core_assets {
            resolve(&origin, path).map_err(|e: UrlError| Error::InvalidUrl(format!("{path}: {e}")))?;
        }
        let (phase, _) = watch::channel(phase);
        Ok(Self { manifest, origin, storage, fetcher, phase })
    }

    /// Name of the generation this controller owns.
    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Watch phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: Phase) {
        let previous = self.phase.send_replace(phase);
        tracing::debug!(version = %self.manifest.version, from = %previous, to = %phase, "controller phase change");
    }

    /// Resolve a manifest path against the origin.
    fn asset_url(&self, path: &str) -> Result<Url, Error> {
        resolve(&self.origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::fetch::MockFetcher;
    use waystation_core::MemoryStorage;

    #[test]
    fn test_new_controller_is_pending() {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(MockFetcher::new());
        let controller = controller("site-v1", &storage, &fetcher);
        assert_eq!(controller.phase(), Phase::Pending);
        assert_eq!(controller.version(), "site-v1");
    }

    #[test]
    fn test_resume_starts_activated() {
        let controller = Controller::resume(
            AssetManifest::new("site-v1"),
            origin(),
            Arc::new(MemoryStorage::new()),
            Arc::new(MockFetcher::new()),
        )
        .unwrap();
        assert_eq!(controller.phase(), Phase::Activated);
    }

    #[test]
    fn test_new_rejects_invalid_manifest() {
        let manifest = AssetManifest { offline_page: "/elsewhere.html".into(), ..AssetManifest::new("site-v1") };
        let result = Controller::new(manifest, origin(), Arc::new(MemoryStorage::new()), Arc::new(MockFetcher::new()));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Activated.to_string(), "activated");
        assert_eq!(ResponseSource::OfflineFallback.as_str(), "offline_fallback");
    }
}
