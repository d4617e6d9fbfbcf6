//! Hybrid Coordinator (§4.6): for strategy `hybrid`, runs the classic and
//! agentic pipelines concurrently and keeps the stronger result.

use std::sync::Arc;

use crate::classic::ClassicPipeline;
use crate::error::Error;
use crate::models::{QueryMetadata, QueryResult, Strategy};
use crate::orchestrator::Orchestrator;

pub struct HybridCoordinator {
    classic: ClassicPipeline,
    orchestrator: Arc<Orchestrator>,
}

impl HybridCoordinator {
    pub fn new(classic: ClassicPipeline, orchestrator: Arc<Orchestrator>) -> Self {
        Self { classic, orchestrator }
    }

    /// Launches both pipelines concurrently and awaits both (neither is
    /// cancelled early — §4.6 does not permit racing to first-finish). The
    /// agentic pipeline degrades locally and is effectively infallible; the
    /// classic pipeline can genuinely fail, in which case `run_fault_tolerant`
    /// promotes the survivor instead of losing the query.
    pub async fn run(&self, metadata: &QueryMetadata) -> QueryResult {
        let (classic_result, agentic_result) =
            tokio::join!(self.classic.run(metadata), self.orchestrator.run(metadata));

        self.run_fault_tolerant(metadata, classic_result, Ok(agentic_result)).await
    }

    /// Runs both pipelines, tolerating a single failed side: the survivor's
    /// own strategy is promoted onto the result and `fallback_used` is set.
    /// Both failing surfaces the agentic pipeline's own (sealed) error
    /// result, since it is the richer of the two failure modes.
    pub async fn run_fault_tolerant(
        &self,
        metadata: &QueryMetadata,
        classic: Result<QueryResult, Error>,
        agentic: Result<QueryResult, Error>,
    ) -> QueryResult {
        match (classic, agentic) {
            (Ok(c), Ok(a)) => {
                let mut chosen = if a.confidence_score > c.confidence_score { a } else { c };
                chosen.strategy_used = Strategy::Hybrid;
                chosen
            }
            (Ok(mut c), Err(_)) => {
                c.strategy_used = Strategy::Classic;
                c.fallback_used = true;
                c
            }
            (Err(_), Ok(mut a)) => {
                a.strategy_used = Strategy::Agentic;
                a.fallback_used = true;
                a
            }
            (Err(_), Err(e)) => QueryResult::from_error(metadata.query_id, Strategy::Hybrid, true, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CompletionOptions, Completer, Retriever};
    use crate::error::Result;
    use crate::models::{Complexity, Document};
    use crate::orchestrator::OrchestratorConfig;
    use async_trait::async_trait;

    struct StubCompleter(&'static str);
    #[async_trait]
    impl Completer for StubCompleter {
        async fn complete(&self, _prompt: &str, _options: CompletionOptions) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct StubRetriever;
    #[async_trait]
    impl Retriever for StubRetriever {
        async fn search(&self, _query: &str, _embedding: Option<&[f32]>, _k: usize) -> Result<Vec<Document>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn run_picks_higher_confidence_and_reports_hybrid() {
        let completer = Arc::new(StubCompleter("answer"));
        let classic = ClassicPipeline::new(completer.clone(), Arc::new(StubRetriever));
        let orchestrator = Arc::new(Orchestrator::new(completer, Arc::new(StubRetriever), OrchestratorConfig::default()));
        let coordinator = HybridCoordinator::new(classic, orchestrator);

        let metadata = QueryMetadata::new("Compare and analyze two approaches", Complexity::MultiHop, 0.8);
        let result = coordinator.run(&metadata).await;
        assert_eq!(result.strategy_used, Strategy::Hybrid);
    }

    #[tokio::test]
    async fn fault_tolerant_promotes_survivor_strategy() {
        let completer = Arc::new(StubCompleter("answer"));
        let classic = ClassicPipeline::new(completer.clone(), Arc::new(StubRetriever));
        let orchestrator = Arc::new(Orchestrator::new(completer, Arc::new(StubRetriever), OrchestratorConfig::default()));
        let coordinator = HybridCoordinator::new(classic, orchestrator);

        let metadata = QueryMetadata::new("q", Complexity::Simple, 0.9);
        let classic_result = Ok(QueryResult::new(metadata.query_id, Strategy::Classic));
        let agentic_err = Err(crate::error::Error::pipeline_failed("agentic blew up"));

        let result = coordinator.run_fault_tolerant(&metadata, classic_result, agentic_err).await;
        assert_eq!(result.strategy_used, Strategy::Classic);
        assert!(result.fallback_used);
    }

    struct FailingRetriever;
    #[async_trait]
    impl Retriever for FailingRetriever {
        async fn search(&self, _query: &str, _embedding: Option<&[f32]>, _k: usize) -> Result<Vec<Document>> {
            Err(crate::error::Error::retrieval("vector store unreachable"))
        }
    }

    #[tokio::test]
    async fn run_falls_back_to_agentic_when_classic_pipeline_fails() {
        let completer = Arc::new(StubCompleter("answer"));
        let classic = ClassicPipeline::new(completer.clone(), Arc::new(FailingRetriever));
        let orchestrator = Arc::new(Orchestrator::new(completer, Arc::new(StubRetriever), OrchestratorConfig::default()));
        let coordinator = HybridCoordinator::new(classic, orchestrator);

        let metadata = QueryMetadata::new("Compare and analyze two approaches", Complexity::MultiHop, 0.8);
        let result = coordinator.run(&metadata).await;
        assert_eq!(result.strategy_used, Strategy::Agentic);
        assert!(result.fallback_used);
    }
}
