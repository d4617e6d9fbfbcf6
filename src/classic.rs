//! Classic pipeline: single-shot retrieval-and-generation. Low latency, low
//! cost — the fast path for `simple` and confidently `moderate` queries.

use std::sync::Arc;

use crate::collaborators::{CompletionOptions, Completer, Retriever};
use crate::error::{Error, Result};
use crate::models::{QueryMetadata, QueryResult, Strategy};

pub struct ClassicPipeline {
    completer: Arc<dyn Completer>,
    retriever: Arc<dyn Retriever>,
}

impl ClassicPipeline {
    pub fn new(completer: Arc<dyn Completer>, retriever: Arc<dyn Retriever>) -> Self {
        Self { completer, retriever }
    }

    /// Runs retrieve-then-generate. A genuine collaborator failure is
    /// propagated as `Error::pipeline_failed` rather than papered over with
    /// a degraded-but-"successful" result — callers decide how to recover
    /// (fallback chain, hybrid fault tolerance).
    pub async fn run(&self, metadata: &QueryMetadata) -> Result<QueryResult> {
        let documents = self
            .retriever
            .search(&metadata.original_query, metadata.embedding.as_deref(), 5)
            .await
            .map_err(|e| Error::pipeline_failed(format!("retrieval failed: {e}")))?;

        let context = documents
            .iter()
            .map(|d| d.content.clone())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Answer the question using the context below.\n\nContext:\n{context}\n\nQuestion: {}",
            metadata.original_query
        );

        let answer = self
            .completer
            .complete(&prompt, CompletionOptions::default())
            .await
            .map_err(|e| Error::pipeline_failed(format!("completion failed: {e}")))?;

        let mut result = QueryResult::new(metadata.query_id, Strategy::Classic);
        result.answer = answer;
        result.confidence_score = if documents.is_empty() { 0.7 } else { 0.85 };
        result.relevance_score = result.confidence_score;
        result.documents_retrieved = documents;
        result.execution_path = vec!["classic:retrieve".to_string(), "classic:generate".to_string()];
        Ok(result)
    }
}
