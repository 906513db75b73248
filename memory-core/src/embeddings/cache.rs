//! Bounded embedding cache with single-flight computation and lazy
//! text-scoped invalidation.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use lru::LruCache;
use tokio::sync::Mutex as AsyncMutex;

use crate::embeddings::EmbeddingProvider;
use crate::error::Result;

/// Hit/miss/eviction/invalidation counters for one [`EmbeddingCache`]
/// instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Cache lookups that found a live, non-invalidated entry.
    pub hits: u64,
    /// Cache lookups that required computing a fresh embedding.
    pub misses: u64,
    /// Entries evicted to stay within capacity.
    pub evictions: u64,
    /// Entries marked invalidated via [`EmbeddingCache::invalidate_text`]
    /// or [`EmbeddingCache::invalidate_all`].
    pub invalidations: u64,
}

/// An embedding cache keyed strictly by text, backed by an LRU of bounded
/// size. Two lookups for the same text share one entry regardless of what
/// category or query context they were made from. Invalidation is lazy:
/// [`EmbeddingCache::invalidate_text`] only marks the affected key, and
/// [`EmbeddingCache::get_or_compute`] checks the mark before trusting a
/// cache hit — avoiding an eager O(n) sweep on every invalidation.
pub struct EmbeddingCache {
    cache: Arc<RwLock<LruCache<u64, Vec<f32>>>>,
    invalidated: Arc<RwLock<HashSet<u64>>>,
    metrics: Arc<RwLock<CacheMetrics>>,
    in_flight: Arc<AsyncMutex<HashSet<u64>>>,
}

fn cache_key(text: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

impl EmbeddingCache {
    /// Build a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (an `LruCache` requires a non-zero
    /// bound).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1))
            .expect("EmbeddingCache: capacity must be non-zero");
        Self {
            cache: Arc::new(RwLock::new(LruCache::new(capacity))),
            invalidated: Arc::new(RwLock::new(HashSet::new())),
            metrics: Arc::new(RwLock::new(CacheMetrics::default())),
            in_flight: Arc::new(AsyncMutex::new(HashSet::new())),
        }
    }

    /// Fetch the cached embedding for `text`, computing and storing it via
    /// `provider` on a miss. Concurrent callers requesting the same text
    /// serialize on that key's computation rather than issuing duplicate
    /// provider calls (single-flight).
    ///
    /// # Errors
    ///
    /// Propagates [`crate::error::Error::EmbeddingFailed`] from the
    /// provider.
    pub async fn get_or_compute(&self, text: &str, provider: &dyn EmbeddingProvider) -> Result<Vec<f32>> {
        let key = cache_key(text);

        if let Some(vector) = self.try_get(key) {
            return Ok(vector);
        }

        // Single-flight: hold this key's slot in `in_flight` while we
        // compute, so a concurrent caller for the same key waits on the
        // lock below instead of racing a second provider call.
        loop {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.insert(key) {
                break;
            }
            drop(in_flight);
            tokio::task::yield_now().await;
            if let Some(vector) = self.try_get(key) {
                return Ok(vector);
            }
        }

        let result = provider.embed_text(text).await;
        self.in_flight.lock().await.remove(&key);

        let vector = result?;
        self.put(key, vector.clone());
        Ok(vector)
    }

    fn try_get(&self, key: u64) -> Option<Vec<f32>> {
        let invalidated = self
            .invalidated
            .read()
            .expect("EmbeddingCache: invalidated lock poisoned");
        if invalidated.contains(&key) {
            return None;
        }
        drop(invalidated);

        let mut cache = self.cache.write().expect("EmbeddingCache: cache lock poisoned");
        let hit = cache.get(&key).cloned();
        let mut metrics = self.metrics.write().expect("EmbeddingCache: metrics lock poisoned");
        if hit.is_some() {
            metrics.hits += 1;
        } else {
            metrics.misses += 1;
        }
        hit
    }

    fn put(&self, key: u64, vector: Vec<f32>) {
        let mut cache = self.cache.write().expect("EmbeddingCache: cache lock poisoned");
        let evicted = cache.push(key, vector);
        if evicted.is_some() {
            self.metrics
                .write()
                .expect("EmbeddingCache: metrics lock poisoned")
                .evictions += 1;
        }
        drop(cache);

        self.invalidated
            .write()
            .expect("EmbeddingCache: invalidated lock poisoned")
            .remove(&key);
    }

    /// Mark the entry for `text` as invalidated. It stays physically
    /// present until evicted but is no longer returned by
    /// [`EmbeddingCache::get_or_compute`].
    pub fn invalidate_text(&self, text: &str) {
        let key = cache_key(text);
        let mut invalidated = self
            .invalidated
            .write()
            .expect("EmbeddingCache: invalidated lock poisoned");
        if invalidated.insert(key) {
            self.metrics
                .write()
                .expect("EmbeddingCache: metrics lock poisoned")
                .invalidations += 1;
        }
    }

    /// Mark every entry in the cache as invalidated.
    pub fn invalidate_all(&self) {
        let cache = self.cache.read().expect("EmbeddingCache: cache lock poisoned");
        let keys: Vec<u64> = cache.iter().map(|(k, _)| *k).collect();
        drop(cache);
        let mut invalidated = self
            .invalidated
            .write()
            .expect("EmbeddingCache: invalidated lock poisoned");
        let mut metrics = self.metrics.write().expect("EmbeddingCache: metrics lock poisoned");
        for key in keys {
            if invalidated.insert(key) {
                metrics.invalidations += 1;
            }
        }
    }

    /// Current hit/miss/eviction/invalidation counters.
    #[must_use]
    pub fn metrics(&self) -> CacheMetrics {
        *self.metrics.read().expect("EmbeddingCache: metrics lock poisoned")
    }

    /// Number of entries physically present, including invalidated ones
    /// not yet evicted.
    #[must_use]
    pub fn size(&self) -> usize {
        self.cache.read().expect("EmbeddingCache: cache lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;

    #[tokio::test]
    async fn second_lookup_is_a_cache_hit() {
        let cache = EmbeddingCache::new(10);
        let provider = MockEmbeddingProvider::default();
        let first = cache.get_or_compute("alice likes hiking", &provider).await.unwrap();
        let second = cache.get_or_compute("alice likes hiking", &provider).await.unwrap();
        assert_eq!(first, second);
        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hits, 1);
    }

    #[tokio::test]
    async fn invalidate_text_forces_recompute() {
        let cache = EmbeddingCache::new(10);
        let provider = MockEmbeddingProvider::default();
        cache.get_or_compute("alice likes hiking", &provider).await.unwrap();
        cache.invalidate_text("alice likes hiking");
        cache.get_or_compute("alice likes hiking", &provider).await.unwrap();
        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 2);
        assert_eq!(metrics.invalidations, 1);
    }

    #[tokio::test]
    async fn identical_text_shares_one_entry_regardless_of_caller_context() {
        // Exact-text keying means a "profile" lookup and an "event" lookup
        // for the same text hit the same cache entry — there is no domain
        // partitioning to keep them apart.
        let cache = EmbeddingCache::new(10);
        let provider = MockEmbeddingProvider::default();
        cache.get_or_compute("text", &provider).await.unwrap();
        cache.get_or_compute("text", &provider).await.unwrap();
        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hits, 1);
    }

    #[tokio::test]
    async fn eviction_is_tracked_once_capacity_is_exceeded() {
        let cache = EmbeddingCache::new(1);
        let provider = MockEmbeddingProvider::default();
        cache.get_or_compute("first", &provider).await.unwrap();
        cache.get_or_compute("second", &provider).await.unwrap();
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.metrics().evictions, 1);
    }
}
