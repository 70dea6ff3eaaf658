//! Install and activate.

use futures_util::future::try_join_all;
use waystation_core::{CacheStorage, Error, StoredResponse};

use super::{Controller, Phase};
use crate::fetch::{FetchRequest, Fetcher};

impl<S: CacheStorage, F: Fetcher> Controller<S, F> {
    /// Precache every core asset into this controller's generation.
    ///
    /// Asset fetches run concurrently. A transport error or non-2xx status on
    /// any of them fails the install: nothing is stored, a generation created
    /// by this call is deleted again, and the controller turns `Redundant`.
    /// Installing onto an existing generation of the same name replaces its
    /// entries.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` unless the controller is `Pending`
    /// - `Error::InstallFailed` naming the first asset that failed
    /// - storage errors from the backend
    pub async fn install(&self) -> Result<(), Error> {
        if self.phase() != Phase::Pending {
            return Err(Error::InvalidState(format!("cannot install from phase {}", self.phase())));
        }
        self.set_phase(Phase::Installing);

        match self.precache().await {
            Ok(count) => {
                self.set_phase(Phase::Installed);
                tracing::info!(version = %self.manifest.version, assets = count, "cache generation installed");
                Ok(())
            }
            Err(e) => {
                self.set_phase(Phase::Redundant);
                tracing::warn!(version = %self.manifest.version, error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let version = self.manifest.version.as_str();
        let created = self.storage.open(version).await?;

        let stored = match try_join_all(self.manifest.core_assets.iter().map(|path| self.fetch_asset(path))).await {
            Ok(responses) => {
                let count = responses.len();
                self.storage.add_all(version, responses).await.map(|()| count)
            }
            Err(e) => Err(e),
        };

        if stored.is_err() && created {
            if let Err(cleanup) = self.storage.delete(version).await {
                tracing::warn!(version, error = %cleanup, "failed to drop partial generation");
            }
        }

        stored
    }

    async fn fetch_asset(&self, path: &str) -> Result<StoredResponse, Error> {
        let request = FetchRequest::get(self.asset_url(path)?);

        let response = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed { url: request.url.to_string(), reason: e.to_string() })?;

        if !response.status.is_success() {
            return Err(Error::InstallFailed {
                url: request.url.to_string(),
                reason: format!("status {}", response.status.as_u16()),
            });
        }

        tracing::debug!(url = %request.url, bytes = response.bytes.len(), "precached asset");
        Ok(response.to_stored(&request.cache_request()))
    }

    /// Delete every generation except this controller's and start
    /// intercepting.
    ///
    /// Returns the names of the generations deleted.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` unless the controller is `Installed`
    /// - storage errors from the backend; the controller stays `Installed`
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        if self.phase() != Phase::Installed {
            return Err(Error::InvalidState(format!("cannot activate from phase {}", self.phase())));
        }

        let mut deleted = Vec::new();
        for name in self.storage.keys().await? {
            if name != self.manifest.version && self.storage.delete(&name).await? {
                deleted.push(name);
            }
        }

        self.set_phase(Phase::Activated);
        tracing::info!(version = %self.manifest.version, deleted = ?deleted, "activated; claiming all clients");
        Ok(deleted)
    }

    /// Stop serving. Requests already inside `handle` finish normally.
    pub(crate) fn retire(&self) {
        self.set_phase(Phase::Redundant);
    }
}
