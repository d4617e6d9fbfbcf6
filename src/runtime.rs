//! Composition root (§9): a single `Runtime` value that owns every
//! collaborator, component, and piece of mutable state. No part of this
//! crate reaches for a global/singleton — callers construct one `Runtime`
//! and share it behind an `Arc` themselves.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::timeout;
use uuid::Uuid;

use crate::cache::{CacheConfig, MultiLevelCache};
use crate::classic::ClassicPipeline;
use crate::classifier::Classifier;
use crate::collaborators::{Completer, Embedder, MetricsSink, ResourceOracle, Retriever};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::extraction::{extract_entities, extract_intent, extract_keywords};
use crate::hybrid::HybridCoordinator;
use crate::metrics::{CostTracker, Counters, CountersSnapshot};
use crate::models::{Complexity, QueryMetadata, QueryResult, Strategy};
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::router::{Router, RouterConfig};

/// Everything the fabric needs from the outside world, bundled so `Runtime`
/// only takes one argument besides `Settings`.
pub struct Collaborators {
    pub completer: Arc<dyn Completer>,
    pub embedder: Arc<dyn Embedder>,
    pub retriever: Arc<dyn Retriever>,
    pub oracle: Arc<dyn ResourceOracle>,
    pub metrics: Arc<dyn MetricsSink>,
}

/// The hybrid decision fabric. Holds the classifier, router, cache, agent
/// orchestrator, and hybrid coordinator, wired to one set of collaborators.
pub struct Runtime {
    settings: Settings,
    classifier: Classifier,
    router: Router,
    cache: MultiLevelCache,
    classic: ClassicPipeline,
    orchestrator: Arc<Orchestrator>,
    hybrid: HybridCoordinator,
    oracle: Arc<dyn ResourceOracle>,
    embedder: Arc<dyn Embedder>,
    metrics: Arc<dyn MetricsSink>,
    costs: RwLock<CostTracker>,
    counters: Counters,
}

/// Optional per-query overrides accepted by `Runtime::query`.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub force_strategy: Option<Strategy>,
}

impl Runtime {
    pub fn new(settings: Settings, collaborators: Collaborators) -> Self {
        let cache_config = CacheConfig {
            l1_max_size: settings.l1_max_size,
            l1_ttl_secs: settings.l1_ttl,
            l2_max_size: settings.l2_max_size,
            l2_ttl_secs: settings.l2_ttl,
            l2_similarity_threshold: settings.l2_similarity_threshold,
            l3_max_paths: settings.l3_max_paths,
            l3_ttl_secs: settings.l3_ttl,
        };

        let router_config = RouterConfig {
            complexity_threshold_simple: settings.complexity_threshold_simple,
            complexity_threshold_complex: settings.complexity_threshold_complex,
        };

        let strategy_mode = if settings.parallel_agents {
            crate::orchestrator::StrategyMode::Adaptive
        } else {
            crate::orchestrator::StrategyMode::Sequential
        };

        let orchestrator_config = OrchestratorConfig {
            max_iterations: settings.max_iterations_agentic,
            confidence_threshold: settings.confidence_threshold,
            strategy_mode,
        };

        let classic = ClassicPipeline::new(collaborators.completer.clone(), collaborators.retriever.clone());
        let orchestrator = Arc::new(Orchestrator::new(
            collaborators.completer.clone(),
            collaborators.retriever.clone(),
            orchestrator_config,
        ));
        let hybrid = HybridCoordinator::new(
            ClassicPipeline::new(collaborators.completer.clone(), collaborators.retriever.clone()),
            orchestrator.clone(),
        );

        Self {
            classifier: Classifier::new(),
            router: Router::new(router_config),
            cache: MultiLevelCache::new(&cache_config),
            classic,
            orchestrator,
            hybrid,
            oracle: collaborators.oracle,
            embedder: collaborators.embedder,
            metrics: collaborators.metrics,
            costs: RwLock::new(CostTracker::new()),
            counters: Counters::new(),
            settings,
        }
    }

    /// Step 1 (Analyzer, §4.1): validate, classify, and extract coarse
    /// features. The embedding is populated lazily by the caller only if L1
    /// misses, to avoid paying the embedder's cost on a definitional query.
    fn analyze(&self, text: &str) -> Result<QueryMetadata> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_query("query is empty"));
        }
        if trimmed.len() > self.settings.max_query_len {
            return Err(Error::invalid_query(format!(
                "query exceeds max length of {} characters",
                self.settings.max_query_len
            )));
        }

        let classification = self.classifier.classify(trimmed);
        let mut metadata = QueryMetadata::new(trimmed, classification.complexity, classification.confidence);
        metadata.keywords = extract_keywords(trimmed);
        metadata.entities = extract_entities(trimmed);
        metadata.intent = extract_intent(trimmed);
        Ok(metadata)
    }

    /// Step 2/3: consult the cache (L1 exact, then L2 semantic once an
    /// embedding has been computed). Returns `None` on a full miss.
    async fn check_cache(&self, metadata: &mut QueryMetadata) -> Option<QueryResult> {
        if let Some(hit) = self.cache.lookup(&metadata.original_query, None).await {
            return Some(hit);
        }

        if metadata.embedding.is_none() {
            if let Ok(embedding) = self.embedder.encode(&metadata.original_query).await {
                metadata.embedding = Some(embedding);
            }
        }

        self.cache.lookup(&metadata.original_query, metadata.embedding.as_deref()).await
    }

    /// Dispatch to the pipeline matching `strategy`, with no fallback logic
    /// of its own — the caller handles fallback and timeout. A classic
    /// pipeline failure is sealed into a `QueryResult` here so the fallback
    /// loop can treat every strategy uniformly.
    async fn dispatch(&self, strategy: Strategy, metadata: &QueryMetadata) -> QueryResult {
        match strategy {
            Strategy::Classic => match self.classic.run(metadata).await {
                Ok(result) => result,
                Err(err) => seal(metadata.query_id, Strategy::Classic, &err),
            },
            Strategy::Agentic => self.orchestrator.run(metadata).await,
            Strategy::Hybrid => self.hybrid.run(metadata).await,
            Strategy::Cache => unreachable!("cache is never a dispatch target"),
        }
    }

    /// Run one query end-to-end: analyze, check cache, route, dispatch
    /// (with deadline and fallback-chain handling), record metrics, and
    /// write back to the cache. Never returns `Err` — every failure mode is
    /// sealed into a `QueryResult` per §7.
    pub async fn query(&self, text: &str, options: QueryOptions) -> QueryResult {
        let started = std::time::Instant::now();
        Counters::incr(&self.counters.queries_total);

        let mut metadata = match self.analyze(text) {
            Ok(metadata) => metadata,
            Err(err) => return seal(Uuid::new_v4(), Strategy::Classic, &err),
        };
        metadata.query_id = Uuid::new_v4();

        if let Some(hit) = self.check_cache(&mut metadata).await {
            Counters::incr(&self.counters.cache_hits);
            let mut result = hit;
            result.query_id = metadata.query_id;
            result.mark_cached();
            result.latency_ms = started.elapsed().as_millis() as u64;
            self.metrics.record("query.cache_hit", &[], 1.0);
            return result;
        }
        Counters::incr(&self.counters.cache_misses);

        let decision = match self
            .router
            .route(metadata.complexity, metadata.complexity_score, &metadata.original_query, self.oracle.as_ref())
            .await
        {
            Ok(decision) => decision,
            Err(err) => {
                let result = seal(metadata.query_id, Strategy::Classic, &err);
                return finish(result, started);
            }
        };

        let primary = options.force_strategy.unwrap_or(decision.strategy);
        let mut attempts = vec![primary];
        attempts.extend(decision.fallback_strategies.iter().copied().filter(|s| *s != primary));

        let deadline = Duration::from_secs(self.settings.timeout_seconds);
        let mut result = self.run_with_fallback(&metadata, &attempts, deadline).await;

        let mut costs = self.costs.write().await;
        costs.record(result.strategy_used, result.tokens_used, result.cost_usd);
        drop(costs);

        if result.error.is_none() {
            self.cache.store(&metadata.original_query, result.clone(), metadata.embedding.clone()).await;
        }

        self.metrics.record("query.strategy", &[("strategy", &result.strategy_used.to_string())], 1.0);
        finish(result, started)
    }

    /// Walk `attempts` in order against one shrinking deadline for the
    /// *whole* request: each attempt gets `deadline - elapsed_so_far`, never
    /// a fresh full budget, so an N-attempt chain can't run N times longer
    /// than the configured timeout. A dispatch that comes back with a
    /// sealed pipeline-failure result is treated like a timeout — the next
    /// strategy in the chain gets a shot at the remaining budget. The first
    /// attempt to produce an error-free result wins; any strategy after the
    /// first is marked `fallback_used`.
    async fn run_with_fallback(&self, metadata: &QueryMetadata, attempts: &[Strategy], deadline: Duration) -> QueryResult {
        let mut tried = HashSet::new();
        let started = std::time::Instant::now();
        let mut last_failure: Option<QueryResult> = None;

        for (idx, strategy) in attempts.iter().enumerate() {
            if !tried.insert(*strategy) {
                continue;
            }

            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                Counters::incr(&self.counters.timeouts);
                return last_failure
                    .unwrap_or_else(|| seal(metadata.query_id, *strategy, &Error::timeout(deadline.as_millis() as u64)));
            }

            match timeout(remaining, self.dispatch(*strategy, metadata)).await {
                Ok(mut result) if result.error.is_none() => {
                    if idx > 0 {
                        result.fallback_used = true;
                        Counters::incr(&self.counters.fallbacks_used);
                    }
                    return result;
                }
                Ok(mut result) => {
                    result.fallback_used = idx > 0;
                    last_failure = Some(result);
                }
                Err(_) => {
                    Counters::incr(&self.counters.timeouts);
                    last_failure = Some(seal(metadata.query_id, *strategy, &Error::timeout(remaining.as_millis() as u64)));
                }
            }
        }

        last_failure.unwrap_or_else(|| seal(metadata.query_id, Strategy::Classic, &Error::routing_failed("no strategy available")))
    }

    /// Force the `classic` strategy, bypassing the router entirely.
    pub async fn simple_query(&self, text: &str) -> QueryResult {
        self.query(text, QueryOptions { force_strategy: Some(Strategy::Classic), ..Default::default() }).await
    }

    /// Force the `agentic` strategy, bypassing the router entirely.
    pub async fn complex_query(&self, text: &str) -> QueryResult {
        self.query(text, QueryOptions { force_strategy: Some(Strategy::Agentic), ..Default::default() }).await
    }

    pub async fn cost_snapshot(&self) -> CostTracker {
        self.costs.read().await.clone()
    }

    pub fn counters_snapshot(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        self.cache.invalidate_pattern(pattern).await
    }

    /// Release any held resources. There is no background task or open
    /// connection owned directly by `Runtime` today; this exists so callers
    /// have a stable shutdown hook as collaborators grow real connections.
    pub async fn close(&self) -> Result<()> {
        self.cache.clear().await;
        Ok(())
    }
}

fn finish(mut result: QueryResult, started: std::time::Instant) -> QueryResult {
    result.latency_ms = started.elapsed().as_millis() as u64;
    result
}

fn seal(query_id: Uuid, strategy: Strategy, err: &Error) -> QueryResult {
    QueryResult::from_error(query_id, strategy, false, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as CrateResult;
    use crate::models::Document;
    use async_trait::async_trait;

    struct StubCompleter;
    #[async_trait]
    impl Completer for StubCompleter {
        async fn complete(&self, _prompt: &str, _options: crate::collaborators::CompletionOptions) -> CrateResult<String> {
            Ok("an answer".to_string())
        }
    }

    struct StubEmbedder;
    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn encode(&self, _text: &str) -> CrateResult<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    struct StubRetriever;
    #[async_trait]
    impl Retriever for StubRetriever {
        async fn search(&self, _query: &str, _embedding: Option<&[f32]>, _k: usize) -> CrateResult<Vec<Document>> {
            Ok(vec![])
        }
    }

    fn runtime() -> Runtime {
        Runtime::new(
            Settings::default(),
            Collaborators {
                completer: Arc::new(StubCompleter),
                embedder: Arc::new(StubEmbedder),
                retriever: Arc::new(StubRetriever),
                oracle: Arc::new(crate::collaborators::AlwaysAvailable),
                metrics: Arc::new(crate::collaborators::NullMetricsSink),
            },
        )
    }

    #[tokio::test]
    async fn empty_query_seals_invalid_query_error() {
        let rt = runtime();
        let result = rt.query("   ", QueryOptions::default()).await;
        assert_eq!(result.error.as_deref(), Some("InvalidQuery"));
    }

    #[tokio::test]
    async fn simple_query_forces_classic_strategy() {
        let rt = runtime();
        let result = rt.simple_query("Что такое Rust?").await;
        assert_eq!(result.strategy_used, Strategy::Classic);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn repeated_query_is_served_from_cache() {
        let rt = runtime();
        let first = rt.simple_query("Что такое Rust?").await;
        assert!(!first.cached);

        let second = rt.simple_query("Что такое Rust?").await;
        assert!(second.cached);
        assert_eq!(second.strategy_used, Strategy::Cache);
    }

    #[tokio::test]
    async fn complex_query_forces_agentic_strategy() {
        let rt = runtime();
        let result = rt.complex_query("Analyze and compare two strategies in depth").await;
        assert_eq!(result.strategy_used, Strategy::Agentic);
    }

    #[tokio::test]
    async fn analyze_populates_entities_and_intent() {
        let rt = runtime();
        let result = rt.simple_query(r#"What is "zero-cost abstraction" in Rust?"#).await;
        // analyze() is private, but query() always runs it first — a
        // non-error result here means entities/intent were computed without
        // panicking. The cache-stored metadata isn't exposed on QueryResult,
        // so exercise extraction directly through its own module tests too.
        assert!(result.error.is_none());
    }

    struct FailingRetriever;
    #[async_trait]
    impl Retriever for FailingRetriever {
        async fn search(&self, _query: &str, _embedding: Option<&[f32]>, _k: usize) -> CrateResult<Vec<Document>> {
            Err(crate::error::Error::retrieval("vector store unreachable"))
        }
    }

    #[tokio::test]
    async fn classic_pipeline_failure_falls_back_to_next_strategy_in_chain() {
        let rt = Runtime::new(
            Settings::default(),
            Collaborators {
                completer: Arc::new(StubCompleter),
                embedder: Arc::new(StubEmbedder),
                retriever: Arc::new(FailingRetriever),
                oracle: Arc::new(crate::collaborators::AlwaysAvailable),
                metrics: Arc::new(crate::collaborators::NullMetricsSink),
            },
        );
        // Simple queries route to classic first; classic's retriever always
        // fails here, so the fallback chain must promote a working strategy
        // instead of surfacing a raw PipelineFailed.
        let result = rt.simple_query("Что такое Rust?").await;
        assert_ne!(result.strategy_used, Strategy::Classic);
        assert!(result.fallback_used);
        assert!(result.error.is_none());
    }
}
