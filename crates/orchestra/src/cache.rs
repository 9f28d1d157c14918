use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};

use crate::{memory::Embedder, Result};

/// Cache key for embeddings: text hash scoped to the producing model
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CacheKey {
    content_hash: u64,
    model: String,
}

impl CacheKey {
    pub fn new(content: &str, model: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);

        Self {
            content_hash: hasher.finish(),
            model: model.to_string(),
        }
    }
}

/// Bounded TTL cache of embedding vectors
#[derive(Debug)]
pub struct EmbeddingCache {
    cache: Cache<CacheKey, Arc<Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    /// # Arguments
    /// * `max_capacity` - Maximum number of vectors to keep
    /// * `ttl_seconds` - Time-to-live in seconds for each entry
    pub fn new(max_capacity: u64, ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Vec<f32>>> {
        let result = self.cache.get(key).await;
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    pub async fn put(&self, key: CacheKey, embedding: Vec<f32>) {
        self.cache.insert(key, Arc::new(embedding)).await;
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        CacheStats {
            entry_count: self.cache.entry_count(),
            hits,
            misses,
            hit_rate,
        }
    }

    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

impl Default for EmbeddingCache {
    /// 1000 vectors, 1 hour TTL
    fn default() -> Self {
        Self::new(1000, 3600)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entry_count: u64,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

/// Embedder decorator that memoizes vectors of repeated texts
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: EmbeddingCache,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, cache: EmbeddingCache) -> Self {
        Self { inner, cache }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = CacheKey::new(text, self.inner.name());
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit.as_ref().clone());
        }

        let embedding = self.inner.embed(text).await?;
        self.cache.put(key, embedding.clone()).await;
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::memory::HashingEmbedder;

    struct CountingEmbedder {
        calls: AtomicUsize,
        inner: HashingEmbedder,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }
    }

    #[tokio::test]
    async fn test_cache_key_generation() {
        assert_eq!(CacheKey::new("flood", "a"), CacheKey::new("flood", "a"));
        assert_ne!(CacheKey::new("flood", "a"), CacheKey::new("fire", "a"));
        assert_ne!(CacheKey::new("flood", "a"), CacheKey::new("flood", "b"));
    }

    #[tokio::test]
    async fn test_cache_put_and_get() {
        let cache = EmbeddingCache::new(10, 60);
        let key = CacheKey::new("text", "m");
        assert!(cache.get(&key).await.is_none());

        cache.put(key.clone(), vec![0.5, 0.5]).await;
        assert_eq!(cache.get(&key).await.unwrap().as_slice(), &[0.5, 0.5]);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_cached_embedder_skips_repeat_calls() {
        let inner = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            inner: HashingEmbedder::new(16),
        });
        let embedder = CachedEmbedder::new(inner.clone(), EmbeddingCache::default());

        let first = embedder.embed("same text").await.unwrap();
        let second = embedder.embed("same text").await.unwrap();
        embedder.embed("other text").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(embedder.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = EmbeddingCache::new(10, 60);
        let key = CacheKey::new("text", "m");
        cache.put(key.clone(), vec![1.0]).await;

        cache.invalidate_all().await;
        assert!(cache.get(&key).await.is_none());
    }
}
