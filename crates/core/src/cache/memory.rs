//! In-memory cache storage.
//!
//! Same contract as [`CacheDb`](super::CacheDb) without persistence. It also
//! counts reads and writes so callers can assert a code path never touched
//! the cache.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::storage::{CacheRequest, CacheStorage, MatchOptions, StoredResponse};
use crate::Error;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    generations: RwLock<BTreeMap<String, BTreeMap<CacheRequest, StoredResponse>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of match/keys/requests calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of open/add_all/delete calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<bool, Error> {
        self.write();
        let mut generations = self.generations.write().await;
        if generations.contains_key(name) {
            return Ok(false);
        }
        generations.insert(name.to_string(), BTreeMap::new());
        Ok(true)
    }

    async fn add_all(&self, name: &str, responses: Vec<StoredResponse>) -> Result<(), Error> {
        self.write();
        let mut generations = self.generations.write().await;
        let entries = generations.entry(name.to_string()).or_default();
        for response in responses {
            entries.insert(response.request(), response);
        }
        Ok(())
    }

    async fn match_request(
        &self, name: &str, request: &CacheRequest, options: MatchOptions,
    ) -> Result<Option<StoredResponse>, Error> {
        self.read();
        let generations = self.generations.read().await;
        let Some(entries) = generations.get(name) else {
            return Ok(None);
        };

        if let Some(exact) = entries.get(request) {
            return Ok(Some(exact.clone()));
        }
        if !options.ignore_search {
            return Ok(None);
        }

        let wanted = request.search_free_url();
        Ok(entries
            .iter()
            .find(|(key, _)| key.method == request.method && key.search_free_url() == wanted)
            .map(|(_, response)| response.clone()))
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.write();
        Ok(self.generations.write().await.remove(name).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.read();
        Ok(self.generations.read().await.keys().cloned().collect())
    }

    async fn requests(&self, name: &str) -> Result<Vec<CacheRequest>, Error> {
        self.read();
        let generations = self.generations.read().await;
        let mut requests: Vec<CacheRequest> = generations
            .get(name)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        requests.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(requests)
    }
}
