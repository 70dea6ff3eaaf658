//! Cache inspection tools.
//!
//! Read-only views of the cache generations; nothing here writes.

pub mod lookup;
pub mod status;

pub use lookup::{CacheMatchParams, match_impl};
pub use status::status_impl;
