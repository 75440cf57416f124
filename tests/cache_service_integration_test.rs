//! Integration tests for the namespaced cache service against a live store.
//!
//! Tests marked `#[ignore]` require a running Redis; set `REDIS_URL` or run
//! one on localhost:6379 and invoke `cargo test -- --ignored`.

use cachegate::cache::{CacheCategory, CacheService};
use cachegate::config::{CacheConfig, StoreConfig};
use cachegate::store::StoreConnection;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Prediction {
    region: String,
    score: f64,
}

/// Each test gets its own namespace prefix so concurrent runs never collide.
fn live_cache() -> CacheService {
    let store_config = StoreConfig {
        url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        ..StoreConfig::default()
    };
    let cache_config = CacheConfig {
        namespace_prefix: format!("cachegate_test_{}", Uuid::new_v4().simple()),
        ..CacheConfig::default()
    };
    CacheService::new(Arc::new(StoreConnection::new(store_config)), cache_config)
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_set_get_overwrite_delete() {
    let cache = live_cache();
    let value = Prediction {
        region: "42".to_string(),
        score: 0.87,
    };

    assert!(cache.set(CacheCategory::Predictions, "region:42", &value, None).await);
    let hit: Option<Prediction> = cache.get(CacheCategory::Predictions, "region:42").await;
    assert_eq!(hit, Some(value.clone()));

    // Re-setting replaces the value
    let updated = Prediction {
        score: 0.91,
        ..value
    };
    assert!(cache.set(CacheCategory::Predictions, "region:42", &updated, None).await);
    let hit: Option<Prediction> = cache.get(CacheCategory::Predictions, "region:42").await;
    assert_eq!(hit, Some(updated));

    assert!(cache.delete(CacheCategory::Predictions, "region:42").await);
    assert!(!cache.delete(CacheCategory::Predictions, "region:42").await);
    assert!(!cache.exists(CacheCategory::Predictions, "region:42").await);
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_categories_do_not_collide() {
    let cache = live_cache();

    cache.set(CacheCategory::Metadata, "shared", &1u32, None).await;
    cache.set(CacheCategory::RiskScores, "shared", &2u32, None).await;

    assert_eq!(cache.get::<u32>(CacheCategory::Metadata, "shared").await, Some(1));
    assert_eq!(cache.get::<u32>(CacheCategory::RiskScores, "shared").await, Some(2));

    cache.invalidate_all(CacheCategory::Metadata).await;
    cache.invalidate_all(CacheCategory::RiskScores).await;
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_ttl_defaults_and_extension() {
    let cache = live_cache();

    // Category default applies when no TTL is given
    cache.set(CacheCategory::ComputedResults, "k", &"v", None).await;
    let ttl = cache.get_ttl(CacheCategory::ComputedResults, "k").await;
    assert!(ttl > 0 && ttl <= 300);

    // Explicit TTL overrides the default
    cache.set(CacheCategory::ComputedResults, "short", &"v", Some(30)).await;
    let ttl = cache.get_ttl(CacheCategory::ComputedResults, "short").await;
    assert!(ttl > 0 && ttl <= 30);

    assert!(cache.extend_ttl(CacheCategory::ComputedResults, "short", 300).await);
    assert!(cache.get_ttl(CacheCategory::ComputedResults, "short").await > 30);

    // Missing keys cannot be extended
    assert!(!cache.extend_ttl(CacheCategory::ComputedResults, "absent", 60).await);
    assert_eq!(cache.get_ttl(CacheCategory::ComputedResults, "absent").await, -2);

    cache.invalidate_all(CacheCategory::ComputedResults).await;
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_expired_entry_reads_as_miss() {
    let cache = live_cache();

    cache.set(CacheCategory::Metadata, "ephemeral", &"v", Some(1)).await;
    assert!(cache.exists(CacheCategory::Metadata, "ephemeral").await);

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    let value: Option<String> = cache.get(CacheCategory::Metadata, "ephemeral").await;
    assert!(value.is_none());
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_pattern_invalidation_is_precise() {
    let cache = live_cache();

    cache.set(CacheCategory::RiskScores, "region:1:day", &1u32, None).await;
    cache.set(CacheCategory::RiskScores, "region:1:week", &2u32, None).await;
    cache.set(CacheCategory::RiskScores, "region:2:day", &3u32, None).await;

    let deleted = cache.invalidate_pattern(CacheCategory::RiskScores, "region:1:*").await;
    assert_eq!(deleted, 2);

    assert!(!cache.exists(CacheCategory::RiskScores, "region:1:day").await);
    assert!(!cache.exists(CacheCategory::RiskScores, "region:1:week").await);
    assert!(cache.exists(CacheCategory::RiskScores, "region:2:day").await);

    cache.invalidate_all(CacheCategory::RiskScores).await;
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_invalidation_scans_past_one_batch() {
    let cache = live_cache();

    for i in 0..250 {
        cache
            .set(CacheCategory::ComputedResults, &format!("bulk:{i}"), &i, None)
            .await;
    }

    // Default scan batch is 100, so this takes several scan iterations
    let deleted = cache.invalidate_pattern(CacheCategory::ComputedResults, "bulk:*").await;
    assert_eq!(deleted, 250);
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_cached_executes_once_then_serves_hits() {
    let cache = live_cache();
    let executions = Arc::new(AtomicU32::new(0));

    for _ in 0..3 {
        let executions = Arc::clone(&executions);
        let result: Result<Prediction, String> = cache
            .cached(
                CacheCategory::Predictions,
                "forecast",
                &("region", 7),
                None,
                &[],
                || async move {
                    executions.fetch_add(1, Ordering::SeqCst);
                    Ok(Prediction {
                        region: "7".to_string(),
                        score: 0.5,
                    })
                },
            )
            .await;
        assert_eq!(result.unwrap().region, "7");
    }

    assert_eq!(executions.load(Ordering::SeqCst), 1, "only the first call should execute");

    // Different arguments get their own cache entry
    let executions2 = Arc::clone(&executions);
    let _: Result<Prediction, String> = cache
        .cached(
            CacheCategory::Predictions,
            "forecast",
            &("region", 8),
            None,
            &[],
            || async move {
                executions2.fetch_add(1, Ordering::SeqCst);
                Ok(Prediction {
                    region: "8".to_string(),
                    score: 0.6,
                })
            },
        )
        .await;
    assert_eq!(executions.load(Ordering::SeqCst), 2);

    cache.invalidate_all(CacheCategory::Predictions).await;
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_cached_invalidates_dependent_categories_on_write() {
    let cache = live_cache();

    cache.set(CacheCategory::ComputedResults, "derived", &"stale", None).await;

    let result: Result<u32, String> = cache
        .cached(
            CacheCategory::Metadata,
            "update",
            &1u32,
            None,
            &[CacheCategory::ComputedResults],
            || async { Ok(99u32) },
        )
        .await;
    assert_eq!(result.unwrap(), 99);

    // The dependent category was swept as a side effect
    assert!(!cache.exists(CacheCategory::ComputedResults, "derived").await);

    cache.invalidate_all(CacheCategory::Metadata).await;
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_warm_skips_present_keys() {
    let cache = live_cache();

    cache.set(CacheCategory::Metadata, "warm:a", &"existing", None).await;
    let fetches = Arc::new(AtomicU32::new(0));

    let keys = vec!["warm:a".to_string(), "warm:b".to_string()];
    let fetches_ref = Arc::clone(&fetches);
    let results = cache
        .warm(CacheCategory::Metadata, &keys, move |key| {
            let fetches = Arc::clone(&fetches_ref);
            async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(format!("fetched:{key}"))
            }
        })
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results.get("warm:a"), Some(&true));
    assert_eq!(results.get("warm:b"), Some(&true));
    assert_eq!(fetches.load(Ordering::SeqCst), 1, "present keys are not refetched");

    // Pre-existing value untouched
    assert_eq!(
        cache.get::<String>(CacheCategory::Metadata, "warm:a").await,
        Some("existing".to_string())
    );

    cache.invalidate_all(CacheCategory::Metadata).await;
}

#[tokio::test]
#[ignore] // Requires a running Redis
async fn test_stats_track_hits_and_misses() {
    let cache = live_cache();

    cache.set(CacheCategory::Metadata, "present", &"v", None).await;
    let _: Option<String> = cache.get(CacheCategory::Metadata, "present").await;
    let _: Option<String> = cache.get(CacheCategory::Metadata, "present").await;
    let _: Option<String> = cache.get(CacheCategory::Metadata, "absent").await;

    let stats = cache.stats();
    assert_eq!(stats.hit_count, 2);
    assert_eq!(stats.miss_count, 1);
    assert_eq!(stats.total_requests, 3);
    assert!((stats.hit_rate - 2.0 / 3.0).abs() < f64::EPSILON);

    cache.invalidate_all(CacheCategory::Metadata).await;
}
