//! Client code for waystation.
//!
//! This crate provides the network fetch layer and the offline cache
//! controller that sits in front of it.

pub mod controller;
pub mod fetch;

pub use controller::{Controller, Phase, Registration, ResponseSource, Routed};
pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Fetcher, MockFetcher, TransportError};
