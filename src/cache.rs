//! Bounded LRU read-through cache in front of a backing store

use crate::error::Result;
use crate::io::{IOManager, StorageBackend};
use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Counters describing cache effectiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub current_size: usize,
    pub max_size: usize,
}

struct CacheState {
    entries: LruCache<String, Bytes>,
    current_size: usize,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn remove(&mut self, key: &str) {
        if let Some(old) = self.entries.pop(key) {
            self.current_size -= old.len();
        }
    }

    fn insert(&mut self, key: String, value: Bytes, max_size: usize) {
        self.remove(&key);
        while self.current_size + value.len() > max_size {
            match self.entries.pop_lru() {
                Some((_, evicted)) => self.current_size -= evicted.len(),
                None => break,
            }
        }
        self.current_size += value.len();
        self.entries.put(key, value);
    }
}

/// Read-through cache keyed by store path, bounded by total value bytes
///
/// The lock only serializes bookkeeping between concurrent chunk reads of a
/// single client; it gives no coherence between separate instances.
pub struct CachedStore {
    inner: Arc<dyn IOManager>,
    max_size: usize,
    state: Mutex<CacheState>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn IOManager>, max_size: usize) -> Self {
        Self {
            inner,
            max_size,
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                current_size: 0,
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.entries.len(),
            current_size: state.current_size,
            max_size: self.max_size,
        }
    }
}

#[async_trait]
impl IOManager for CachedStore {
    async fn read(&self, path: &str) -> Result<Bytes> {
        {
            let mut state = self.state.lock();
            if let Some(value) = state.entries.get(path).cloned() {
                state.hits += 1;
                return Ok(value);
            }
            state.misses += 1;
        }

        debug!(path, "cache miss");
        let value = self.inner.read(path).await?;
        if value.len() <= self.max_size {
            self.state
                .lock()
                .insert(path.to_string(), value.clone(), self.max_size);
        }
        Ok(value)
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        self.state.lock().remove(path);
        self.inner.write(path, data).await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let cached = self.state.lock().entries.contains(path);
        if cached {
            return Ok(true);
        }
        self.inner.exists(path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.state.lock().remove(path);
        self.inner.delete(path).await
    }

    fn backend(&self) -> StorageBackend {
        self.inner.backend()
    }
}
