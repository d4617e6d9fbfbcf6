//! L3 execution-path cache: records the sequence of orchestrator steps that
//! produced a result, for analytics. Per the resolved Open Question in
//! SPEC_FULL.md §9, this tier is write-only during dispatch — nothing reads
//! it to replay steps before executing a pipeline.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::fingerprint::fingerprint;
use super::stats::CacheStats;

/// One executed step in an orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathStep {
    pub agent: String,
    pub action: String,
    pub result: String,
}

struct PathEntry {
    query: String,
    path: Vec<PathStep>,
    created_at: DateTime<Utc>,
}

impl PathEntry {
    fn is_expired(&self, ttl: ChronoDuration) -> bool {
        self.created_at + ttl < Utc::now()
    }
}

pub struct L3Cache {
    paths: RwLock<HashMap<String, PathEntry>>,
    max_paths: usize,
    ttl: ChronoDuration,
    stats: RwLock<CacheStats>,
}

impl L3Cache {
    pub fn new(max_paths: usize, ttl_secs: i64) -> Self {
        Self {
            paths: RwLock::new(HashMap::new()),
            max_paths,
            ttl: ChronoDuration::seconds(ttl_secs),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Insert or replace the stored path. When `is_better` is true, the new
    /// path unconditionally replaces the old; otherwise it is stored only if
    /// the slot is empty.
    pub async fn save_path(&self, query: &str, path: Vec<PathStep>, is_better: bool) {
        let key = fingerprint(query);
        let mut paths = self.paths.write().await;

        if !is_better && paths.contains_key(&key) {
            return;
        }

        if !paths.contains_key(&key) && paths.len() >= self.max_paths {
            if let Some(oldest_key) = paths
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                paths.remove(&oldest_key);
                self.stats.write().await.record_eviction();
            }
        }

        paths.insert(
            key,
            PathEntry {
                query: query.to_string(),
                path,
                created_at: Utc::now(),
            },
        );
    }

    pub async fn get_path(&self, query: &str) -> Option<Vec<PathStep>> {
        let key = fingerprint(query);
        let mut paths = self.paths.write().await;
        let expired = paths.get(&key).map(|e| e.is_expired(self.ttl)).unwrap_or(false);
        if expired {
            paths.remove(&key);
            self.stats.write().await.record_miss();
            return None;
        }
        match paths.get(&key) {
            Some(entry) => {
                let path = entry.path.clone();
                drop(paths);
                self.stats.write().await.record_hit();
                Some(path)
            }
            None => {
                drop(paths);
                self.stats.write().await.record_miss();
                None
            }
        }
    }

    pub async fn clear(&self) {
        self.paths.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().await.clone();
        stats.size = self.paths.read().await.len();
        stats
    }

    pub async fn invalidate_matching(&self, matcher: &glob::Pattern) -> usize {
        let mut paths = self.paths.write().await;
        let before = paths.len();
        paths.retain(|_, e| !matcher.matches(&e.query));
        before - paths.len()
    }

    pub async fn len(&self) -> usize {
        self.paths.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> PathStep {
        PathStep {
            agent: "research".to_string(),
            action: "search".to_string(),
            result: "ok".to_string(),
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let cache = L3Cache::new(100, 86400);
        cache.save_path("q", vec![step()], false).await;
        let path = cache.get_path("q").await.unwrap();
        assert_eq!(path.len(), 1);
    }

    #[tokio::test]
    async fn non_better_save_does_not_overwrite_existing() {
        let cache = L3Cache::new(100, 86400);
        cache.save_path("q", vec![step()], false).await;
        cache
            .save_path(
                "q",
                vec![step(), step()],
                false,
            )
            .await;
        assert_eq!(cache.get_path("q").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn is_better_unconditionally_replaces() {
        let cache = L3Cache::new(100, 86400);
        cache.save_path("q", vec![step()], false).await;
        cache
            .save_path("q", vec![step(), step()], true)
            .await;
        assert_eq!(cache.get_path("q").await.unwrap().len(), 2);
    }
}
