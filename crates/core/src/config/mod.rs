//! Application configuration with layered loading.
//!
//! Uses figment to merge, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if WAYSTATION_CONFIG_FILE set)
//! 3. Environment variables (WAYSTATION_*)

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::AssetManifest;
use crate::cache::manifest::{DEFAULT_CORE_ASSETS, DEFAULT_OFFLINE_PAGE};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding cache generations.
    ///
    /// Set via WAYSTATION_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin that relative request paths and core assets resolve against.
    ///
    /// Set via WAYSTATION_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Name of the cache generation for this deploy.
    ///
    /// Set via WAYSTATION_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths precached on install.
    ///
    /// Set via WAYSTATION_CORE_ASSETS environment variable.
    #[serde(default = "default_core_assets")]
    pub core_assets: Vec<String>,

    /// Path served when a GET misses both network and cache.
    ///
    /// Set via WAYSTATION_OFFLINE_PAGE environment variable.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via WAYSTATION_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP client timeout in milliseconds.
    ///
    /// Set via WAYSTATION_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum redirects the HTTP client follows.
    ///
    /// Set via WAYSTATION_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./waystation-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_version() -> String {
    "site-cache-v1".into()
}

fn default_core_assets() -> Vec<String> {
    DEFAULT_CORE_ASSETS.iter().map(|p| p.to_string()).collect()
}

fn default_offline_page() -> String {
    DEFAULT_OFFLINE_PAGE.into()
}

fn default_user_agent() -> String {
    concat!("waystation/", env!("CARGO_PKG_VERSION")).into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_version: default_cache_version(),
            core_assets: default_core_assets(),
            offline_page: default_offline_page(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The asset manifest for this deploy.
    pub fn manifest(&self) -> AssetManifest {
        AssetManifest {
            version: self.cache_version.clone(),
            core_assets: self.core_assets.clone(),
            offline_page: self.offline_page.clone(),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WAYSTATION_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("WAYSTATION_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
