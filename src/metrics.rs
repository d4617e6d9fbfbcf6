//! Cost accounting and lock-free request counters.
//!
//! Grounded in the teacher's per-model `CostTracker`/`TierCosts`, adapted
//! here to accumulate per-strategy rather than per-model spend, since the
//! fabric's unit of accounting is a routing strategy, not an LLM model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::Strategy;

/// Accumulated token/cost spend for one strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyCosts {
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub request_count: u64,
}

impl StrategyCosts {
    fn record(&mut self, tokens: u64, cost: f64) {
        self.tokens_used += tokens;
        self.cost_usd += cost;
        self.request_count += 1;
    }
}

/// Accumulates spend across all requests, broken down by strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostTracker {
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub total_requests: u64,
    pub by_strategy: HashMap<Strategy, StrategyCosts>,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, strategy: Strategy, tokens: u64, cost: f64) {
        self.total_tokens += tokens;
        self.total_cost_usd += cost;
        self.total_requests += 1;
        self.by_strategy.entry(strategy).or_default().record(tokens, cost);
    }

    pub fn merge(&mut self, other: &CostTracker) {
        self.total_tokens += other.total_tokens;
        self.total_cost_usd += other.total_cost_usd;
        self.total_requests += other.total_requests;
        for (strategy, costs) in &other.by_strategy {
            let entry = self.by_strategy.entry(*strategy).or_default();
            entry.tokens_used += costs.tokens_used;
            entry.cost_usd += costs.cost_usd;
            entry.request_count += costs.request_count;
        }
    }
}

/// Lock-free counters for the events named across §7/§8 (cache errors,
/// timeouts, fallbacks). Histograms of latency distributions are left to a
/// real `MetricsSink` implementation outside this crate; these counters back
/// only the aggregate figures the core itself needs to reason about.
#[derive(Debug, Default)]
pub struct Counters {
    pub queries_total: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub cache_errors: AtomicU64,
    pub timeouts: AtomicU64,
    pub fallbacks_used: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            queries_total: self.queries_total.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            fallbacks_used: self.fallbacks_used.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub queries_total: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub timeouts: u64,
    pub fallbacks_used: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_tracker_accumulates_by_strategy() {
        let mut tracker = CostTracker::new();
        tracker.record(Strategy::Classic, 100, 0.001);
        tracker.record(Strategy::Classic, 50, 0.0005);
        tracker.record(Strategy::Agentic, 2000, 0.02);

        assert_eq!(tracker.total_requests, 3);
        assert_eq!(tracker.by_strategy[&Strategy::Classic].request_count, 2);
        assert_eq!(tracker.by_strategy[&Strategy::Classic].tokens_used, 150);
    }

    #[test]
    fn cost_tracker_merge_combines_totals() {
        let mut a = CostTracker::new();
        a.record(Strategy::Classic, 100, 0.001);
        let mut b = CostTracker::new();
        b.record(Strategy::Classic, 50, 0.0005);
        a.merge(&b);
        assert_eq!(a.total_tokens, 150);
        assert_eq!(a.by_strategy[&Strategy::Classic].request_count, 2);
    }

    #[test]
    fn counters_snapshot_reflects_increments() {
        let counters = Counters::new();
        Counters::incr(&counters.cache_hits);
        Counters::incr(&counters.cache_hits);
        Counters::incr(&counters.cache_misses);
        let snap = counters.snapshot();
        assert_eq!(snap.cache_hits, 2);
        assert_eq!(snap.cache_misses, 1);
    }
}
