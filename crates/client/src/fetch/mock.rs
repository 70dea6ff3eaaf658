//! Scripted fetcher.
//!
//! Answers from a URL table, can be switched offline as a whole, and records
//! every request it sees. URLs without a route answer 404 while online.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};

use super::{FetchRequest, FetchResponse, Fetcher, TransportError};

#[derive(Debug, Clone)]
struct Route {
    status: StatusCode,
    body: Bytes,
}

#[derive(Debug)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, Route>>,
    unreachable: Mutex<HashSet<String>>,
    online: AtomicBool,
    calls: Mutex<Vec<(Method, String)>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            unreachable: Mutex::new(HashSet::new()),
            online: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` and `body`.
    pub fn route(self, url: &str, status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.to_string(), Route { status, body: Bytes::copy_from_slice(body.as_bytes()) });
        }
        self
    }

    /// Fail `url` with a connection error even while online.
    pub fn unreachable(self, url: &str) -> Self {
        if let Ok(mut unreachable) = self.unreachable.lock() {
            unreachable.insert(url.to_string());
        }
        self
    }

    /// Toggle the whole network.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Every request seen so far, as (method, url).
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let url = request.url.to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((request.method.clone(), url.clone()));
        }

        let refused = !self.online.load(Ordering::SeqCst)
            || self.unreachable.lock().map(|u| u.contains(&url)).unwrap_or(false);
        if refused {
            return Err(TransportError::Connect(format!("{url}: network unreachable")));
        }

        let route = self
            .routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(&url).cloned())
            .unwrap_or(Route { status: StatusCode::NOT_FOUND, body: Bytes::from_static(b"not found") });

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status: route.status,
            headers,
            bytes: route.body,
            fetch_ms: 0,
        })
    }
}
