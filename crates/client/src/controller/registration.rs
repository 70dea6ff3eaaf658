//! Scope registration: which controller is currently serving.

use std::sync::Arc;

use tokio::sync::RwLock;
use waystation_core::{CacheStorage, Error};

use super::{Controller, Phase, ResponseSource, Routed};
use crate::fetch::{FetchRequest, Fetcher};

/// Holds the active controller for a scope.
///
/// Requests always go through whichever controller is active at the moment
/// they arrive. A new controller installs while the current one keeps
/// serving, then activates and is swapped in without waiting for the old
/// one's in-flight requests.
pub struct Registration<S, F> {
    active: RwLock<Option<Arc<Controller<S, F>>>>,
    fetcher: Arc<F>,
}

impl<S: CacheStorage, F: Fetcher> Registration<S, F> {
    /// Empty registration. Until a controller activates, requests go straight
    /// to `fetcher`.
    pub fn new(fetcher: Arc<F>) -> Self {
        Self { active: RwLock::new(None), fetcher }
    }

    /// The controller currently serving, if any.
    pub async fn active(&self) -> Option<Arc<Controller<S, F>>> {
        self.active.read().await.clone()
    }

    /// Install, activate, and claim the scope for `controller`.
    ///
    /// # Errors
    ///
    /// Any install or activate error. The previously active controller, if
    /// any, stays in place.
    pub async fn register(&self, controller: Controller<S, F>) -> Result<Arc<Controller<S, F>>, Error> {
        controller.install().await?;
        controller.activate().await?;
        Ok(self.claim(Arc::new(controller)).await)
    }

    /// Serve with a controller that is already activated, e.g. one resumed
    /// from a previous run.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the controller is not `Activated`.
    pub async fn adopt(&self, controller: Controller<S, F>) -> Result<Arc<Controller<S, F>>, Error> {
        if controller.phase() != Phase::Activated {
            return Err(Error::InvalidState(format!(
                "cannot adopt controller {} in phase {}",
                controller.version(),
                controller.phase()
            )));
        }
        Ok(self.claim(Arc::new(controller)).await)
    }

    async fn claim(&self, controller: Arc<Controller<S, F>>) -> Arc<Controller<S, F>> {
        let previous = self.active.write().await.replace(controller.clone());
        if let Some(previous) = previous
            && !Arc::ptr_eq(&previous, &controller)
        {
            tracing::info!(from = previous.version(), to = controller.version(), "controller superseded");
            previous.retire();
        }
        controller
    }

    /// Route a request through the active controller.
    ///
    /// # Errors
    ///
    /// Whatever the active controller's `handle` returns; with no active
    /// controller, `Error::Transport` when the network does not answer.
    pub async fn handle(&self, request: &FetchRequest) -> Result<Routed, Error> {
        let active = self.active().await;
        match active {
            Some(controller) => controller.handle(request).await,
            None => {
                let response = self.fetcher.fetch(request).await?;
                let source = if request.is_get() { ResponseSource::Network } else { ResponseSource::Passthrough };
                Ok(Routed { response, source })
            }
        }
    }
}
