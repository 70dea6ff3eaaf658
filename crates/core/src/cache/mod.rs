//! Versioned cache generations.
//!
//! A generation is a named store of response snapshots keyed by request.
//! Exactly one generation is current once a controller has activated; the
//! rest are deleted during activation.
//!
//! Two backends implement [`CacheStorage`]:
//!
//! - [`CacheDb`]: SQLite through tokio-rusqlite, WAL mode, schema migrations
//! - [`MemoryStorage`]: in-process map for tests and ephemeral runs

pub mod connection;
pub mod generations;
pub mod key;
pub mod manifest;
pub mod memory;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use manifest::AssetManifest;
pub use memory::MemoryStorage;
pub use storage::{CacheRequest, CacheStorage, MatchOptions, StoredResponse};
