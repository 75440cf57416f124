//! # Cache Service Module
//!
//! Generic cache-aside storage on top of [`StoreConnection`](crate::store::StoreConnection):
//! namespaced keys (`prefix:category:key`), per-category default TTLs, safe
//! bulk invalidation via incremental scans, batch warming, and hit/miss
//! accounting. Caching here is always best-effort: every store error converts
//! to a miss or a no-op, so a cache outage slows callers down but never fails
//! them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cachegate::cache::{CacheCategory, CacheService};
//! use cachegate::config::{CacheConfig, StoreConfig};
//! use cachegate::store::StoreConnection;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(StoreConnection::new(StoreConfig::default()));
//! let cache = CacheService::new(store, CacheConfig::default());
//!
//! cache.set(CacheCategory::Metadata, "region:42", &"payload", None).await;
//! let value: Option<String> = cache.get(CacheCategory::Metadata, "region:42").await;
//!
//! // Memoize an expensive operation (cache-aside)
//! let result: Result<u64, std::io::Error> = cache
//!     .cached(CacheCategory::ComputedResults, "score", &("region", 42), None, &[], || async {
//!         Ok(1234u64)
//!     })
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod category;
pub mod service;

pub use category::CacheCategory;
pub use service::{CacheService, CacheStats};
