//! Narrow async interfaces the core consumes but does not implement: the
//! language model (`Completer`), the embedding model (`Embedder`), the
//! document index (`Retriever`), strategy availability (`ResourceOracle`),
//! and telemetry (`MetricsSink`). Concrete implementations (HTTP clients,
//! local models, in-memory fakes for tests) live outside this crate.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Document, Strategy};

/// Options accepted by a `Completer::complete` call.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// The language model capability. Async, cancellable — callers wrap calls in
/// `tokio::time::timeout` and drop the future on deadline expiry.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String>;
}

/// The embedding model capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns a dense vector of `dimensionality()` length.
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Configured output dimensionality (default 1536 per §6).
    fn dimensionality(&self) -> usize {
        1536
    }
}

/// The document index capability.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, embedding: Option<&[f32]>, k: usize) -> Result<Vec<Document>>;
}

/// Strategy availability and reservation, consulted by the Router before
/// committing to a strategy (§4.3). Any rate-limiting or circuit-breaker
/// state lives behind this trait, not in the Router.
#[async_trait]
pub trait ResourceOracle: Send + Sync {
    async fn available(&self, strategy: Strategy) -> bool;
    async fn reserve(&self, strategy: Strategy);
    async fn release(&self, strategy: Strategy);
}

/// Telemetry sink. `record` is fire-and-forget; implementations must not
/// block the calling component on a slow sink.
pub trait MetricsSink: Send + Sync {
    fn record(&self, event: &str, labels: &[(&str, &str)], value: f64);
}

/// A `MetricsSink` that discards everything, used where no sink is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn record(&self, _event: &str, _labels: &[(&str, &str)], _value: f64) {}
}

/// A `ResourceOracle` that reports every strategy as always available, used
/// where no real resource accounting is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAvailable;

#[async_trait]
impl ResourceOracle for AlwaysAvailable {
    async fn available(&self, _strategy: Strategy) -> bool {
        true
    }
    async fn reserve(&self, _strategy: Strategy) {}
    async fn release(&self, _strategy: Strategy) {}
}
