//! Deploy-time asset manifest.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Paths precached by every new generation.
pub const DEFAULT_CORE_ASSETS: &[&str] = &["/", "/offline.html", "/about/", "/events/", "/team/"];

/// Served when neither the network nor the cache can answer a GET.
pub const DEFAULT_OFFLINE_PAGE: &str = "/offline.html";

/// Version string plus the assets a generation must hold from creation.
///
/// Bumping `version` is how a deploy forces a fresh generation and the
/// deletion of every older one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub version: String,
    pub core_assets: Vec<String>,
    pub offline_page: String,
}

impl AssetManifest {
    /// Manifest with the default asset set under the given version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            core_assets: DEFAULT_CORE_ASSETS.iter().map(|p| p.to_string()).collect(),
            offline_page: DEFAULT_OFFLINE_PAGE.to_string(),
        }
    }

    /// Check the manifest invariants.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if:
    /// - `version` is blank
    /// - `core_assets` is empty, has duplicates, or holds a path not starting with `/`
    /// - `offline_page` is not one of the core assets
    pub fn validate(&self) -> Result<(), Error> {
        if self.version.trim().is_empty() {
            return Err(Error::InvalidInput("cache version must not be empty".into()));
        }
        if self.core_assets.is_empty() {
            return Err(Error::InvalidInput("core asset set must not be empty".into()));
        }
        for (i, path) in self.core_assets.iter().enumerate() {
            if !path.starts_with('/') {
                return Err(Error::InvalidInput(format!("core asset must be an absolute path: {path}")));
            }
            if self.core_assets[..i].contains(path) {
                return Err(Error::InvalidInput(format!("duplicate core asset: {path}")));
            }
        }
        if !self.core_assets.contains(&self.offline_page) {
            return Err(Error::InvalidInput(format!(
                "offline page {} is not in the core asset set",
                self.offline_page
            )));
        }
        Ok(())
    }
}
