//! Error types for the decision fabric.

use thiserror::Error;

/// Result type alias using the fabric's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the decision fabric.
///
/// Most of these never reach a caller directly: `HybridFabric::query` catches
/// the recoverable variants at the boundary and seals a `QueryResult` with
/// `error` populated instead (see `QueryResult::from_error`). Only
/// construction-time failures (bad settings) and `close()` return `Result`
/// directly.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty, malformed, or oversized query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Request deadline elapsed before a result was produced.
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// A strategy's dependencies were unavailable and no fallback worked either.
    #[error("resource unavailable for strategy {strategy}")]
    ResourceUnavailable { strategy: String },

    /// The router exhausted every fallback in the chain.
    #[error("routing failed: {0}")]
    RoutingFailed(String),

    /// A pipeline failed and no fallback was available or enabled.
    #[error("pipeline failed: {0}")]
    PipelineFailed(String),

    /// A cache tier faulted; callers should treat this as a miss.
    #[error("cache error: {0}")]
    CacheError(String),

    /// The completer collaborator failed.
    #[error("completion error: {0}")]
    Completion(String),

    /// The embedder collaborator failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The retriever collaborator failed.
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Configuration could not be loaded or was invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything that doesn't fit the taxonomy above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn resource_unavailable(strategy: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            strategy: strategy.into(),
        }
    }

    pub fn routing_failed(message: impl Into<String>) -> Self {
        Self::RoutingFailed(message.into())
    }

    pub fn pipeline_failed(message: impl Into<String>) -> Self {
        Self::PipelineFailed(message.into())
    }

    pub fn cache_error(message: impl Into<String>) -> Self {
        Self::CacheError(message.into())
    }

    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion(message.into())
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The error code named in §6/§7, used as the `QueryResult.error` tag.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidQuery(_) => "InvalidQuery",
            Error::Timeout { .. } => "Timeout",
            Error::ResourceUnavailable { .. } => "ResourceUnavailable",
            Error::RoutingFailed(_) => "RoutingFailed",
            Error::PipelineFailed(_) => "PipelineFailed",
            Error::CacheError(_) => "CacheError",
            Error::Completion(_) | Error::Embedding(_) | Error::Retrieval(_) => "PipelineFailed",
            Error::Config(_) | Error::Serialization(_) | Error::Internal(_) => "Internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_mapping() {
        assert_eq!(Error::invalid_query("empty").code(), "InvalidQuery");
        assert_eq!(Error::timeout(100).code(), "Timeout");
        assert_eq!(
            Error::resource_unavailable("agentic").code(),
            "ResourceUnavailable"
        );
        assert_eq!(Error::internal("boom").code(), "Internal");
    }
}
