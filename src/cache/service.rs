//! # Cache Service Implementation
//!
//! Cache-aside storage with namespacing, TTL management, pattern
//! invalidation, batch warming, and a memoization combinator. All operations
//! are best-effort: store errors are logged and converted to misses or no-ops
//! so the cache can never cause a caller's operation to fail.

use crate::cache::category::CacheCategory;
use crate::config::CacheConfig;
use crate::store::StoreConnection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Hit/miss accounting snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub total_requests: u64,
    /// `hits / (hits + misses)`, 0.0 before any request
    pub hit_rate: f64,
}

/// Namespaced cache service over the shared store connection.
#[derive(Debug)]
pub struct CacheService {
    store: Arc<StoreConnection>,
    config: CacheConfig,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl CacheService {
    pub fn new(store: Arc<StoreConnection>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    fn make_key(&self, category: CacheCategory, key: &str) -> String {
        format!("{}:{}:{}", self.config.namespace_prefix, category, key)
    }

    fn make_pattern(&self, category: CacheCategory, pattern: &str) -> String {
        format!("{}:{}:{}", self.config.namespace_prefix, category, pattern)
    }

    fn ttl_for(&self, category: CacheCategory, ttl: Option<u64>) -> u64 {
        ttl.unwrap_or_else(|| category.default_ttl_seconds())
    }

    /// Get a value from the cache. Any store or deserialization error counts
    /// as a miss and returns `None`.
    pub async fn get<T: DeserializeOwned>(&self, category: CacheCategory, key: &str) -> Option<T> {
        let cache_key = self.make_key(category, key);

        match self.store.json_get::<T>(&cache_key).await {
            Ok(Some(value)) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                debug!(key = %cache_key, "Cache HIT");
                Some(value)
            }
            Ok(None) => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                debug!(key = %cache_key, "Cache MISS");
                None
            }
            Err(e) => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                error!(key = %cache_key, error = %e, "Cache get error");
                None
            }
        }
    }

    /// Get a value, falling back to `default` on miss.
    pub async fn get_or<T: DeserializeOwned>(
        &self,
        category: CacheCategory,
        key: &str,
        default: T,
    ) -> T {
        self.get(category, key).await.unwrap_or(default)
    }

    /// Store a value with the category's default TTL unless overridden.
    /// Returns `false` on any error; caching is best-effort.
    pub async fn set<T: Serialize>(
        &self,
        category: CacheCategory,
        key: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> bool {
        let cache_key = self.make_key(category, key);
        let ttl = self.ttl_for(category, ttl);

        match self.store.json_set(&cache_key, value, Some(ttl)).await {
            Ok(_) => {
                debug!(key = %cache_key, ttl_seconds = ttl, "Cache SET");
                true
            }
            Err(e) => {
                error!(key = %cache_key, error = %e, "Cache set error");
                false
            }
        }
    }

    /// Delete a key. Returns `true` only when a key was actually removed.
    pub async fn delete(&self, category: CacheCategory, key: &str) -> bool {
        let cache_key = self.make_key(category, key);
        match self.store.del(&[cache_key.as_str()]).await {
            Ok(count) => {
                debug!(key = %cache_key, "Cache DELETE");
                count > 0
            }
            Err(e) => {
                error!(key = %cache_key, error = %e, "Cache delete error");
                false
            }
        }
    }

    /// Whether a key currently exists.
    pub async fn exists(&self, category: CacheCategory, key: &str) -> bool {
        let cache_key = self.make_key(category, key);
        match self.store.exists(&[cache_key.as_str()]).await {
            Ok(count) => count > 0,
            Err(e) => {
                error!(key = %cache_key, error = %e, "Cache exists check error");
                false
            }
        }
    }

    /// Remaining TTL in seconds: `-1` no expiry, `-2` absent (or error).
    pub async fn get_ttl(&self, category: CacheCategory, key: &str) -> i64 {
        let cache_key = self.make_key(category, key);
        match self.store.ttl(&cache_key).await {
            Ok(ttl) => ttl,
            Err(e) => {
                error!(key = %cache_key, error = %e, "Cache TTL check error");
                -2
            }
        }
    }

    /// Extend an existing TTL. No-op returning `false` when the key has no
    /// current expiry or does not exist.
    pub async fn extend_ttl(
        &self,
        category: CacheCategory,
        key: &str,
        additional_seconds: u64,
    ) -> bool {
        let cache_key = self.make_key(category, key);
        let current = match self.store.ttl(&cache_key).await {
            Ok(ttl) => ttl,
            Err(e) => {
                error!(key = %cache_key, error = %e, "Cache TTL extension error");
                return false;
            }
        };

        if current <= 0 {
            return false;
        }

        match self
            .store
            .expire(&cache_key, current as u64 + additional_seconds)
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                error!(key = %cache_key, error = %e, "Cache TTL extension error");
                false
            }
        }
    }

    /// Delete every key in a category matching `pattern`, using an
    /// incremental scan with batched deletes so large categories do not stall
    /// the store. Returns the number of keys removed (0 on error).
    pub async fn invalidate_pattern(&self, category: CacheCategory, pattern: &str) -> u64 {
        let full_pattern = self.make_pattern(category, pattern);
        let batch = self.config.scan_batch_size;
        let mut deleted = 0u64;
        let mut cursor = 0u64;

        loop {
            let (next_cursor, keys) = match self.store.scan_match(cursor, &full_pattern, batch).await
            {
                Ok(step) => step,
                Err(e) => {
                    error!(pattern = %full_pattern, error = %e, "Cache invalidation error");
                    return deleted;
                }
            };

            if !keys.is_empty() {
                match self.store.del(&keys).await {
                    Ok(count) => deleted += count,
                    Err(e) => {
                        error!(pattern = %full_pattern, error = %e, "Cache invalidation error");
                        return deleted;
                    }
                }
            }

            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }

        info!(pattern = %full_pattern, deleted = deleted, "Cache invalidated");
        deleted
    }

    /// Delete every key in a category.
    pub async fn invalidate_all(&self, category: CacheCategory) -> u64 {
        self.invalidate_pattern(category, "*").await
    }

    /// Populate the cache for each key not already present, calling `fetch`
    /// per missing key. A per-key failure is reported as `false` for that key
    /// without aborting the batch.
    pub async fn warm<T, E, F, Fut>(
        &self,
        category: CacheCategory,
        keys: &[String],
        fetch: F,
    ) -> HashMap<String, bool>
    where
        T: Serialize,
        E: std::fmt::Display,
        F: Fn(String) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let mut results = HashMap::with_capacity(keys.len());

        for key in keys {
            if self.exists(category, key).await {
                results.insert(key.clone(), true);
                continue;
            }

            match fetch(key.clone()).await {
                Ok(value) => {
                    let stored = self.set(category, key, &value, None).await;
                    results.insert(key.clone(), stored);
                }
                Err(e) => {
                    error!(category = %category, key = %key, error = %e, "Failed to warm cache");
                    results.insert(key.clone(), false);
                }
            }
        }

        let succeeded = results.values().filter(|ok| **ok).count();
        info!(
            category = %category,
            succeeded = succeeded,
            total = keys.len(),
            "Cache warming completed"
        );
        results
    }

    /// Memoize an operation (cache-aside): check the cache first, execute on
    /// miss, store the result, then optionally invalidate other categories as
    /// a write-through side effect of the successful call.
    ///
    /// The cache key is `key_prefix` plus a digest of the deterministically
    /// serialized arguments. Errors from the wrapped operation propagate
    /// unchanged; cache failures never surface.
    pub async fn cached<A, T, E, F, Fut>(
        &self,
        category: CacheCategory,
        key_prefix: &str,
        args: &A,
        ttl: Option<u64>,
        invalidate_on: &[CacheCategory],
        fetch: F,
    ) -> std::result::Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let full_key = match argument_digest(args) {
            Ok(digest) => Some(format!("{key_prefix}:{digest}")),
            Err(e) => {
                warn!(key_prefix = %key_prefix, error = %e, "Unhashable cache arguments, bypassing cache");
                None
            }
        };

        if let Some(key) = &full_key {
            if let Some(hit) = self.get::<T>(category, key).await {
                return Ok(hit);
            }
        }

        let result = fetch().await?;

        if let Some(key) = &full_key {
            self.set(category, key, &result, ttl).await;
        }
        for invalidated in invalidate_on {
            self.invalidate_all(*invalidated).await;
        }

        Ok(result)
    }

    /// Hit/miss statistics.
    pub fn stats(&self) -> CacheStats {
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hit_count: hits,
            miss_count: misses,
            total_requests: total,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

/// Deterministic digest of an operation's arguments.
///
/// Serializes through `serde_json::Value` so map keys are emitted in sorted
/// order, then hashes; equal argument sets always produce equal keys.
fn argument_digest<A: Serialize + ?Sized>(args: &A) -> serde_json::Result<String> {
    let value = serde_json::to_value(args)?;
    let canonical = serde_json::to_string(&value)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, StoreConfig};

    fn service() -> CacheService {
        let store_config = StoreConfig {
            url: "redis://127.0.0.1:1".to_string(),
            max_connections: 4,
            connect_timeout_seconds: 1,
            operation_timeout_seconds: 1,
            max_failures: 100,
            open_duration_seconds: 60,
            max_retries: 0,
            backoff_factor: 1.0,
        };
        CacheService::new(
            Arc::new(StoreConnection::new(store_config)),
            CacheConfig::default(),
        )
    }

    #[test]
    fn test_key_namespacing() {
        let cache = service();
        assert_eq!(
            cache.make_key(CacheCategory::Metadata, "region:42"),
            "cachegate:metadata:region:42"
        );
        assert_eq!(
            cache.make_pattern(CacheCategory::RiskScores, "region:*"),
            "cachegate:risk_scores:region:*"
        );
    }

    #[test]
    fn test_ttl_fallback_uses_category_default() {
        let cache = service();
        assert_eq!(cache.ttl_for(CacheCategory::ComputedResults, None), 300);
        assert_eq!(cache.ttl_for(CacheCategory::ComputedResults, Some(30)), 30);
    }

    #[test]
    fn test_argument_digest_is_deterministic() {
        let a = argument_digest(&("region", 42, vec![1, 2, 3])).unwrap();
        let b = argument_digest(&("region", 42, vec![1, 2, 3])).unwrap();
        let c = argument_digest(&("region", 43, vec![1, 2, 3])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_argument_digest_sorts_map_keys() {
        let mut first = HashMap::new();
        first.insert("b", 2);
        first.insert("a", 1);
        let mut second = HashMap::new();
        second.insert("a", 1);
        second.insert("b", 2);
        assert_eq!(
            argument_digest(&first).unwrap(),
            argument_digest(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_get_counts_errors_as_misses() {
        let cache = service();
        let value: Option<String> = cache.get(CacheCategory::Metadata, "missing").await;
        assert!(value.is_none());

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 0);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[tokio::test]
    async fn test_set_returns_false_on_store_error() {
        let cache = service();
        assert!(!cache.set(CacheCategory::Metadata, "k", &"v", None).await);
    }

    #[tokio::test]
    async fn test_cached_propagates_operation_result_when_store_down() {
        let cache = service();

        // Wrapped operation still runs and its value comes back
        let ok: Result<u64, std::io::Error> = cache
            .cached(CacheCategory::ComputedResults, "op", &(1, 2), None, &[], || async {
                Ok(42u64)
            })
            .await;
        assert_eq!(ok.unwrap(), 42);

        // Wrapped operation errors propagate unchanged
        let err: Result<u64, std::io::Error> = cache
            .cached(CacheCategory::ComputedResults, "op", &(1, 2), None, &[], || async {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            })
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_warm_reports_per_key_failures_without_aborting() {
        let cache = service();
        let keys = vec!["a".to_string(), "b".to_string()];

        let results = cache
            .warm(CacheCategory::Metadata, &keys, |key| async move {
                if key == "a" {
                    Ok("value".to_string())
                } else {
                    Err("fetch failed".to_string())
                }
            })
            .await;

        // Store is unreachable, so even fetched values fail to persist;
        // what matters is every key is reported and the batch completed
        assert_eq!(results.len(), 2);
        assert_eq!(results.get("b"), Some(&false));
    }

    #[tokio::test]
    async fn test_extend_ttl_is_noop_when_store_unreachable() {
        let cache = service();
        assert!(!cache.extend_ttl(CacheCategory::Metadata, "k", 60).await);
    }

    #[tokio::test]
    async fn test_invalidate_pattern_returns_zero_on_error() {
        let cache = service();
        assert_eq!(cache.invalidate_pattern(CacheCategory::Metadata, "*").await, 0);
    }
}
