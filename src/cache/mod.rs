//! Multi-level cache: L1 exact match, L2 semantic similarity, L3 execution
//! path. `lookup` composes L1 → L2 (the read chain actually consulted at
//! dispatch time); L3 is written after every pipeline run but — per the
//! resolved Open Question in SPEC_FULL.md §9 — is never read back to short
//! circuit a query, only for analytics/path-replay tooling outside this
//! crate.

pub mod fingerprint;
pub mod l1;
pub mod l2;
pub mod l3;
pub mod stats;

use glob::Pattern;

use crate::error::{Error, Result};
use crate::models::QueryResult;
use l1::L1Cache;
use l2::L2Cache;
use l3::L3Cache;
pub use l3::PathStep;
pub use stats::CacheStats;

/// Recognised cache options (§6).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub l1_max_size: usize,
    pub l1_ttl_secs: i64,
    pub l2_max_size: usize,
    pub l2_ttl_secs: i64,
    pub l2_similarity_threshold: f64,
    pub l3_max_paths: usize,
    pub l3_ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_max_size: 100,
            l1_ttl_secs: 3600,
            l2_max_size: 500,
            l2_ttl_secs: 7200,
            l2_similarity_threshold: 0.95,
            l3_max_paths: 100,
            l3_ttl_secs: 86400,
        }
    }
}

/// Aggregated statistics across the three tiers.
#[derive(Debug, Clone, Default)]
pub struct MultiLevelStats {
    pub l1: CacheStats,
    pub l2: CacheStats,
    pub l3: CacheStats,
}

pub struct MultiLevelCache {
    l1: L1Cache,
    l2: L2Cache,
    l3: L3Cache,
}

impl MultiLevelCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            l1: L1Cache::new(config.l1_max_size, config.l1_ttl_secs),
            l2: L2Cache::new(config.l2_max_size, config.l2_ttl_secs, config.l2_similarity_threshold),
            l3: L3Cache::new(config.l3_max_paths, config.l3_ttl_secs),
        }
    }

    pub fn l3(&self) -> &L3Cache {
        &self.l3
    }

    /// L1 exact match, falling back to L2 semantic similarity when an
    /// embedding is available. Returns at the first hit.
    pub async fn lookup(&self, query: &str, embedding: Option<&[f32]>) -> Option<QueryResult> {
        if let Some(hit) = self.l1.get(query).await {
            return Some(hit);
        }
        if let Some(embedding) = embedding {
            if let Some(hit) = self.l2.get_similar(embedding).await {
                return Some(hit);
            }
        }
        None
    }

    /// Write a fresh result to every enabled tier. L1, L2 writes are issued
    /// concurrently; at least L1 is durable before this returns (§5).
    pub async fn store(&self, query: &str, result: QueryResult, embedding: Option<Vec<f32>>) {
        let l1_write = self.l1.set(query, result.clone());
        match embedding {
            Some(embedding) => {
                let l2_write = self.l2.set(query, result, embedding);
                tokio::join!(l1_write, l2_write);
            }
            None => {
                l1_write.await;
            }
        }
    }

    /// Record the path an orchestrator run took, for analytics only.
    pub async fn record_path(&self, query: &str, path: Vec<PathStep>, is_better: bool) {
        self.l3.save_path(query, path, is_better).await;
    }

    /// Remove every entry in every tier whose query matches `pattern`, plus
    /// L2 entries near an invalidated entry's embedding (prevents stale
    /// semantic echoes). Each tier's sweep is atomic; a concurrent lookup
    /// sees either the pre- or post-state for that tier, never a partial
    /// view.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let matcher = Pattern::new(pattern).map_err(|e| Error::cache_error(e.to_string()))?;
        let l1_removed = self.l1.invalidate_matching(&matcher).await;
        let (l2_removed, removed_embeddings) = self.l2.invalidate_matching(&matcher).await;
        let l3_removed = self.l3.invalidate_matching(&matcher).await;

        let echoes_removed = if removed_embeddings.is_empty() {
            0
        } else {
            self.l2.invalidate_near(&removed_embeddings).await
        };

        Ok(l1_removed + l2_removed + echoes_removed + l3_removed)
    }

    pub async fn clear(&self) {
        tokio::join!(self.l1.clear(), self.l2.clear(), self.l3.clear());
    }

    pub async fn stats(&self) -> MultiLevelStats {
        MultiLevelStats {
            l1: self.l1.stats().await,
            l2: self.l2.stats().await,
            l3: self.l3.stats().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn result(answer: &str) -> QueryResult {
        let mut r = QueryResult::new(Uuid::new_v4(), crate::models::Strategy::Classic);
        r.answer = answer.to_string();
        r
    }

    #[tokio::test]
    async fn lookup_hits_l1_before_l2() {
        let cache = MultiLevelCache::new(&CacheConfig::default());
        cache.store("q", result("from l1"), Some(vec![1.0, 0.0])).await;
        let hit = cache.lookup("q", Some(&[1.0, 0.0])).await.unwrap();
        assert_eq!(hit.answer, "from l1");
    }

    #[tokio::test]
    async fn lookup_falls_through_to_l2_on_semantic_match() {
        let cache = MultiLevelCache::new(&CacheConfig::default());
        cache.store("What is Python?", result("Python is a language"), Some(vec![1.0, 0.0, 0.0])).await;

        let hit = cache
            .lookup("What's Python?", Some(&[0.999, 0.01, 0.0]))
            .await
            .unwrap();
        assert_eq!(hit.answer, "Python is a language");
    }

    #[tokio::test]
    async fn invalidate_pattern_clears_all_tiers() {
        let cache = MultiLevelCache::new(&CacheConfig::default());
        cache.store("foo bar", result("x"), Some(vec![1.0, 0.0])).await;
        cache.record_path("foo bar", vec![], false).await;

        let removed = cache.invalidate_pattern("*").await.unwrap();
        assert!(removed >= 2);
        assert!(cache.lookup("foo bar", Some(&[1.0, 0.0])).await.is_none());
        assert!(cache.l3().get_path("foo bar").await.is_none());
    }

    #[tokio::test]
    async fn invalidate_pattern_cascades_to_near_embeddings_in_l2() {
        let cache = MultiLevelCache::new(&CacheConfig::default());
        cache.store("foo bar", result("x"), Some(vec![1.0, 0.0, 0.0])).await;
        // Not matched by the pattern below, but embeds near the entry that is.
        cache.store("unrelated text", result("y"), Some(vec![0.999, 0.01, 0.0])).await;

        let removed = cache.invalidate_pattern("foo *").await.unwrap();
        assert_eq!(removed, 2);
        assert!(cache.lookup("unrelated text", Some(&[0.999, 0.01, 0.0])).await.is_none());
    }
}
