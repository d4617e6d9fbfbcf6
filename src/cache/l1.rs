//! L1 exact-match cache: in-memory LRU with bounded capacity and TTL.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::fingerprint::fingerprint;
use super::stats::CacheStats;
use crate::models::QueryResult;

struct Entry {
    query: String,
    value: QueryResult,
    created_at: DateTime<Utc>,
    hit_count: u64,
}

impl Entry {
    fn is_expired(&self, ttl: ChronoDuration) -> bool {
        self.created_at + ttl < Utc::now()
    }
}

/// Exact-match tier keyed by a SHA-256 fingerprint of the raw query text.
pub struct L1Cache {
    entries: RwLock<HashMap<String, Entry>>,
    /// Recency order, most-recently-used at the back. Kept separate from
    /// `entries` so eviction doesn't need to scan the whole map.
    order: RwLock<Vec<String>>,
    max_size: usize,
    ttl: ChronoDuration,
    stats: RwLock<CacheStats>,
}

impl L1Cache {
    pub fn new(max_size: usize, ttl_secs: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            max_size,
            ttl: ChronoDuration::seconds(ttl_secs),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// `get` touches recency and `hit_count` on a hit.
    pub async fn get(&self, query: &str) -> Option<QueryResult> {
        let key = fingerprint(query);
        let mut entries = self.entries.write().await;
        let expired = entries.get(&key).map(|e| e.is_expired(self.ttl)).unwrap_or(false);
        if expired {
            entries.remove(&key);
            self.touch_order(&key, false).await;
            self.stats.write().await.record_miss();
            return None;
        }
        if let Some(entry) = entries.get_mut(&key) {
            entry.hit_count += 1;
            let value = entry.value.clone();
            drop(entries);
            self.touch_order(&key, true).await;
            self.stats.write().await.record_hit();
            Some(value)
        } else {
            drop(entries);
            self.stats.write().await.record_miss();
            None
        }
    }

    pub async fn set(&self, query: &str, value: QueryResult) {
        let key = fingerprint(query);
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&key) && entries.len() >= self.max_size {
            let victim = {
                let order = self.order.read().await;
                order.first().cloned()
            };
            if let Some(victim) = victim {
                entries.remove(&victim);
                self.touch_order(&victim, false).await;
                self.stats.write().await.record_eviction();
            }
        }

        entries.insert(
            key.clone(),
            Entry {
                query: query.to_string(),
                value,
                created_at: Utc::now(),
                hit_count: 0,
            },
        );
        drop(entries);
        self.touch_order(&key, true).await;
    }

    /// Move `key` to the most-recently-used position, or drop it entirely
    /// when `present` is false (used on eviction/expiry).
    async fn touch_order(&self, key: &str, present: bool) {
        let mut order = self.order.write().await;
        order.retain(|k| k != key);
        if present {
            order.push(key.to_string());
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.order.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().await.clone();
        stats.size = self.entries.read().await.len();
        stats
    }

    /// Remove every entry whose stored query matches `matcher`.
    pub async fn invalidate_matching(&self, matcher: &glob::Pattern) -> usize {
        let mut entries = self.entries.write().await;
        let removed: Vec<String> = entries
            .iter()
            .filter(|(_, e)| matcher.matches(&e.query))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &removed {
            entries.remove(key);
        }
        drop(entries);
        for key in &removed {
            self.touch_order(key, false).await;
        }
        removed.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
