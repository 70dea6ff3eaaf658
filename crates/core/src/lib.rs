//! Core types and shared functionality for waystation.
//!
//! This crate provides:
//! - Versioned cache generations with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures
//! - Header scroll-direction tracking

pub mod cache;
pub mod config;
pub mod error;
pub mod nav;

pub use cache::{AssetManifest, CacheDb, CacheRequest, CacheStorage, MatchOptions, MemoryStorage, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
