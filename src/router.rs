//! Intelligent routing: maps `(complexity, confidence)` to an execution
//! strategy, computes time/cost estimates, and walks the fixed fallback
//! chain against a `ResourceOracle` before committing.

use crate::collaborators::ResourceOracle;
use crate::error::{Error, Result};
use crate::models::{Complexity, RoutingDecision, Strategy};

/// Thresholds and base estimates the Router is parameterised on (§6).
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub complexity_threshold_simple: f64,
    pub complexity_threshold_complex: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            complexity_threshold_simple: 0.3,
            complexity_threshold_complex: 0.7,
        }
    }
}

fn base_strategy(complexity: Complexity, confidence: f64) -> Strategy {
    match complexity {
        Complexity::Simple => Strategy::Classic,
        Complexity::Moderate => {
            if confidence > 0.7 {
                Strategy::Classic
            } else {
                Strategy::Hybrid
            }
        }
        Complexity::Complex | Complexity::MultiHop => Strategy::Agentic,
    }
}

/// Fixed fallback chain for a strategy (§4.3). `cache` has no fallback chain
/// — it is only ever reached via a cache hit short-circuit, never via this
/// table.
fn fallback_chain(strategy: Strategy) -> Vec<Strategy> {
    match strategy {
        Strategy::Agentic => vec![Strategy::Hybrid, Strategy::Classic],
        Strategy::Hybrid => vec![Strategy::Classic, Strategy::Agentic],
        Strategy::Classic => vec![Strategy::Hybrid, Strategy::Agentic],
        Strategy::Cache => vec![],
    }
}

fn complexity_multiplier(complexity: Complexity) -> f64 {
    match complexity {
        Complexity::Simple => 0.5,
        Complexity::Moderate => 1.0,
        Complexity::Complex => 2.0,
        Complexity::MultiHop => 3.0,
    }
}

fn base_time_ms(strategy: Strategy) -> u64 {
    match strategy {
        Strategy::Classic => 200,
        Strategy::Agentic => 2000,
        Strategy::Hybrid => 1500,
        Strategy::Cache => 10,
    }
}

fn base_cost_usd(strategy: Strategy) -> f64 {
    match strategy {
        Strategy::Classic => 0.001,
        Strategy::Agentic => 0.01,
        Strategy::Hybrid => 0.005,
        Strategy::Cache => 0.0,
    }
}

/// Time/cost estimate for a strategy given complexity and query length
/// (§4.3): base × complexity multiplier, cost further scaled by
/// `1 + len(query)/1000`.
pub fn estimate(strategy: Strategy, complexity: Complexity, query_len: usize) -> (u64, f64) {
    let multiplier = complexity_multiplier(complexity);
    let time_ms = (base_time_ms(strategy) as f64 * multiplier) as u64;
    let cost = base_cost_usd(strategy) * multiplier * (1.0 + query_len as f64 / 1000.0);
    (time_ms, cost)
}

fn reasoning_for(strategy: Strategy, complexity: Complexity, confidence: f64) -> String {
    format!(
        "complexity={complexity} confidence={confidence:.2} -> strategy={strategy}",
    )
}

/// Strategy selector. Stateless across requests — any rate-limiting or
/// circuit-breaker state lives in the `ResourceOracle`.
#[derive(Debug, Clone, Default)]
pub struct Router {
    pub config: RouterConfig,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// Produce a `RoutingDecision`, walking the fallback chain against the
    /// resource oracle until an available strategy is found. Fails with
    /// `ResourceUnavailable` if none are.
    pub async fn route(
        &self,
        complexity: Complexity,
        confidence: f64,
        query: &str,
        oracle: &dyn ResourceOracle,
    ) -> Result<RoutingDecision> {
        let preferred = base_strategy(complexity, confidence);
        let mut candidates = vec![preferred];
        candidates.extend(fallback_chain(preferred));

        for (idx, candidate) in candidates.iter().enumerate() {
            if oracle.available(*candidate).await {
                let (estimated_time_ms, estimated_cost_usd) = estimate(*candidate, complexity, query.len());
                let remaining_fallbacks: Vec<Strategy> = candidates[idx + 1..].to_vec();
                return Ok(RoutingDecision {
                    strategy: *candidate,
                    confidence,
                    reasoning: reasoning_for(*candidate, complexity, confidence),
                    fallback_strategies: remaining_fallbacks,
                    estimated_time_ms,
                    estimated_cost_usd,
                    cache_hit: false,
                });
            }
        }

        Err(Error::resource_unavailable(preferred.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::AlwaysAvailable;

    #[test]
    fn simple_always_routes_classic() {
        assert_eq!(base_strategy(Complexity::Simple, 0.5), Strategy::Classic);
    }

    #[test]
    fn moderate_routes_by_confidence() {
        assert_eq!(base_strategy(Complexity::Moderate, 0.9), Strategy::Classic);
        assert_eq!(base_strategy(Complexity::Moderate, 0.5), Strategy::Hybrid);
    }

    #[test]
    fn complex_and_multi_hop_route_agentic() {
        assert_eq!(base_strategy(Complexity::Complex, 0.5), Strategy::Agentic);
        assert_eq!(base_strategy(Complexity::MultiHop, 0.5), Strategy::Agentic);
    }

    #[test]
    fn fallback_chains_never_contain_self() {
        for strategy in [Strategy::Classic, Strategy::Agentic, Strategy::Hybrid] {
            let chain = fallback_chain(strategy);
            assert!(!chain.contains(&strategy));
        }
        assert!(fallback_chain(Strategy::Cache).is_empty());
    }

    #[test]
    fn estimate_scales_by_complexity_and_length() {
        let (time_simple, cost_simple) = estimate(Strategy::Classic, Complexity::Simple, 0);
        let (time_multi, cost_multi) = estimate(Strategy::Classic, Complexity::MultiHop, 0);
        assert!(time_multi > time_simple);
        assert!(cost_multi > cost_simple);

        let (_, cost_short) = estimate(Strategy::Classic, Complexity::Simple, 0);
        let (_, cost_long) = estimate(Strategy::Classic, Complexity::Simple, 1000);
        assert!(cost_long > cost_short);
    }

    #[tokio::test]
    async fn route_returns_preferred_when_available() {
        let router = Router::default();
        let decision = router
            .route(Complexity::Simple, 0.9, "hi", &AlwaysAvailable)
            .await
            .unwrap();
        assert_eq!(decision.strategy, Strategy::Classic);
        assert!(!decision.fallback_strategies.contains(&decision.strategy));
    }

    struct NoneAvailable;
    #[async_trait::async_trait]
    impl ResourceOracle for NoneAvailable {
        async fn available(&self, _strategy: Strategy) -> bool {
            false
        }
        async fn reserve(&self, _strategy: Strategy) {}
        async fn release(&self, _strategy: Strategy) {}
    }

    #[tokio::test]
    async fn route_fails_when_nothing_available() {
        let router = Router::default();
        let result = router
            .route(Complexity::Simple, 0.9, "hi", &NoneAvailable)
            .await;
        assert!(result.is_err());
    }

    proptest::proptest! {
        #[test]
        fn estimate_cost_never_decreases_with_query_length(
            strategy_idx in 0..4usize,
            short_len in 0..200usize,
            extra_len in 0..5000usize,
        ) {
            let strategy = [Strategy::Classic, Strategy::Agentic, Strategy::Hybrid, Strategy::Cache][strategy_idx];
            let (_, cost_short) = estimate(strategy, Complexity::Complex, short_len);
            let (_, cost_long) = estimate(strategy, Complexity::Complex, short_len + extra_len);
            proptest::prop_assert!(cost_long >= cost_short);
        }

        #[test]
        fn time_estimate_scales_monotonically_with_complexity_rank(strategy_idx in 0..4usize) {
            let strategy = [Strategy::Classic, Strategy::Agentic, Strategy::Hybrid, Strategy::Cache][strategy_idx];
            let (t_simple, _) = estimate(strategy, Complexity::Simple, 0);
            let (t_moderate, _) = estimate(strategy, Complexity::Moderate, 0);
            let (t_complex, _) = estimate(strategy, Complexity::Complex, 0);
            let (t_multi_hop, _) = estimate(strategy, Complexity::MultiHop, 0);
            proptest::prop_assert!(t_simple <= t_moderate);
            proptest::prop_assert!(t_moderate <= t_complex);
            proptest::prop_assert!(t_complex <= t_multi_hop);
        }
    }
}
