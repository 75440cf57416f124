//! Closed enumeration of cache categories.
//!
//! Every cached value belongs to exactly one category, which contributes the
//! middle segment of the namespaced key and carries a default TTL tuned to how
//! quickly that class of data goes stale. Keeping the set closed prevents
//! accidental key collisions and makes category-scoped invalidation safe.

use serde::{Deserialize, Serialize};

/// Cache categories with per-category default TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    /// Short-lived computed results (5 minutes)
    ComputedResults,
    /// Risk scoring outputs (10 minutes)
    RiskScores,
    /// Model prediction results (1 hour)
    Predictions,
    /// Long-lived reference metadata (24 hours)
    Metadata,
    /// Conversational agent memory (1 hour)
    AgentMemory,
    /// Raw model inference outputs (30 minutes)
    ModelInference,
}

impl CacheCategory {
    /// Default TTL in seconds for values in this category.
    pub fn default_ttl_seconds(&self) -> u64 {
        match self {
            CacheCategory::ComputedResults => 300,
            CacheCategory::RiskScores => 600,
            CacheCategory::Predictions => 3600,
            CacheCategory::Metadata => 86400,
            CacheCategory::AgentMemory => 3600,
            CacheCategory::ModelInference => 1800,
        }
    }

    /// Key segment for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::ComputedResults => "computed_results",
            CacheCategory::RiskScores => "risk_scores",
            CacheCategory::Predictions => "predictions",
            CacheCategory::Metadata => "metadata",
            CacheCategory::AgentMemory => "agent_memory",
            CacheCategory::ModelInference => "model_inference",
        }
    }

    /// All categories, for bulk administrative operations.
    pub fn all() -> [CacheCategory; 6] {
        [
            CacheCategory::ComputedResults,
            CacheCategory::RiskScores,
            CacheCategory::Predictions,
            CacheCategory::Metadata,
            CacheCategory::AgentMemory,
            CacheCategory::ModelInference,
        ]
    }
}

impl std::fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
