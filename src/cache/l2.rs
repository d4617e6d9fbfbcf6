//! L2 semantic-similarity cache: keyed by embedding, matched by cosine
//! similarity against a threshold.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::RwLock;

use super::stats::CacheStats;
use crate::models::QueryResult;

struct Entry {
    query: String,
    value: QueryResult,
    embedding: Vec<f32>,
    created_at: DateTime<Utc>,
    hit_count: u64,
}

impl Entry {
    fn is_expired(&self, ttl: ChronoDuration) -> bool {
        self.created_at + ttl < Utc::now()
    }
}

/// Cosine similarity of two equal-length vectors. Returns 0.0 for a
/// zero-magnitude vector rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

pub struct L2Cache {
    entries: RwLock<Vec<Entry>>,
    max_size: usize,
    ttl: ChronoDuration,
    similarity_threshold: f64,
    stats: RwLock<CacheStats>,
}

impl L2Cache {
    pub fn new(max_size: usize, ttl_secs: i64, similarity_threshold: f64) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            max_size,
            ttl: ChronoDuration::seconds(ttl_secs),
            similarity_threshold,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    async fn evict_expired(&self, entries: &mut Vec<Entry>) {
        let ttl = self.ttl;
        let before = entries.len();
        entries.retain(|e| !e.is_expired(ttl));
        let removed = before - entries.len();
        if removed > 0 {
            let mut stats = self.stats.write().await;
            for _ in 0..removed {
                stats.record_eviction();
            }
        }
    }

    /// Returns the stored entry with the highest cosine similarity to
    /// `embedding`, iff that similarity ≥ `similarity_threshold`.
    pub async fn get_similar(&self, embedding: &[f32]) -> Option<QueryResult> {
        let mut entries = self.entries.write().await;
        self.evict_expired(&mut entries).await;

        let best = entries
            .iter_mut()
            .map(|e| (cosine_similarity(&e.embedding, embedding), e))
            .filter(|(sim, _)| *sim >= self.similarity_threshold)
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((_, entry)) => {
                entry.hit_count += 1;
                let value = entry.value.clone();
                drop(entries);
                self.stats.write().await.record_hit();
                Some(value)
            }
            None => {
                drop(entries);
                self.stats.write().await.record_miss();
                None
            }
        }
    }

    /// Returns up to `k` entries meeting the threshold, sorted by similarity
    /// descending.
    pub async fn get_top_k_similar(&self, embedding: &[f32], k: usize) -> Vec<(QueryResult, f64)> {
        let mut entries = self.entries.write().await;
        self.evict_expired(&mut entries).await;

        let mut scored: Vec<(f64, &Entry)> = entries
            .iter()
            .map(|e| (cosine_similarity(&e.embedding, embedding), e))
            .filter(|(sim, _)| *sim >= self.similarity_threshold)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .map(|(sim, e)| (e.value.clone(), sim))
            .collect()
    }

    pub async fn set(&self, query: &str, value: QueryResult, embedding: Vec<f32>) {
        let mut entries = self.entries.write().await;
        self.evict_expired(&mut entries).await;

        if entries.len() >= self.max_size {
            // Evict lowest hit_count, breaking ties by oldest created_at.
            if let Some((idx, _)) = entries
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.hit_count
                        .cmp(&b.hit_count)
                        .then(a.created_at.cmp(&b.created_at))
                })
            {
                entries.remove(idx);
                self.stats.write().await.record_eviction();
            }
        }

        entries.push(Entry {
            query: query.to_string(),
            value,
            embedding,
            created_at: Utc::now(),
            hit_count: 0,
        });
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().await.clone();
        stats.size = self.entries.read().await.len();
        stats
    }

    /// Removes every entry whose stored query matches `matcher`, returning
    /// the embeddings of the removed entries so the caller can cascade into
    /// `invalidate_near` and catch semantic echoes of what was just removed.
    pub async fn invalidate_matching(&self, matcher: &glob::Pattern) -> (usize, Vec<Vec<f32>>) {
        let mut entries = self.entries.write().await;
        let removed_embeddings: Vec<Vec<f32>> = entries
            .iter()
            .filter(|e| matcher.matches(&e.query))
            .map(|e| e.embedding.clone())
            .collect();
        entries.retain(|e| !matcher.matches(&e.query));
        (removed_embeddings.len(), removed_embeddings)
    }

    /// Remove entries whose embedding is near any of `embeddings` — prevents
    /// stale semantic echoes after an exact-match invalidation (§4.4).
    pub async fn invalidate_near(&self, embeddings: &[Vec<f32>]) -> usize {
        let threshold = self.similarity_threshold;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| {
            !embeddings
                .iter()
                .any(|target| cosine_similarity(&e.embedding, target) >= threshold)
        });
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
