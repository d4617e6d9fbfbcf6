//! Shared data types that flow between the Analyzer, Router, Cache, and
//! Orchestrator: `QueryMetadata`, `RoutingDecision`, `Document`, `AgentResult`,
//! `QueryResult`, `CacheEntry`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Error;

/// A query as submitted to the fabric. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: None,
            session_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Discrete complexity bucket assigned to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
    MultiHop,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::Simple => write!(f, "simple"),
            Complexity::Moderate => write!(f, "moderate"),
            Complexity::Complex => write!(f, "complex"),
            Complexity::MultiHop => write!(f, "multi_hop"),
        }
    }
}

/// Execution strategy chosen by the Router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Classic,
    Agentic,
    Hybrid,
    Cache,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Classic => write!(f, "classic"),
            Strategy::Agentic => write!(f, "agentic"),
            Strategy::Hybrid => write!(f, "hybrid"),
            Strategy::Cache => write!(f, "cache"),
        }
    }
}

/// Agent roles the Orchestrator can dispatch to.
///
/// `Code` is not named in the distilled routing rules but is carried over
/// from the original `AgentType` taxonomy for queries whose subtasks involve
/// reasoning over source artifacts; it is dispatched exactly like the other
/// four roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Research,
    Analysis,
    Synthesis,
    Verification,
    Code,
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentType::Research => write!(f, "research"),
            AgentType::Analysis => write!(f, "analysis"),
            AgentType::Synthesis => write!(f, "synthesis"),
            AgentType::Verification => write!(f, "verification"),
            AgentType::Code => write!(f, "code"),
        }
    }
}

/// Produced by the Analyzer. Read-only once created; shared via `Arc` with
/// every downstream component for the lifetime of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub query_id: Uuid,
    pub original_query: String,
    pub language: String,
    pub complexity: Complexity,
    pub complexity_score: f64,
    pub entities: Vec<String>,
    pub intent: String,
    pub keywords: Vec<String>,
    /// Lazily populated by the Embedder — never silently recomputed once set.
    pub embedding: Option<Vec<f32>>,
    pub timestamp: DateTime<Utc>,
}

impl QueryMetadata {
    pub fn new(original_query: impl Into<String>, complexity: Complexity, complexity_score: f64) -> Self {
        Self {
            query_id: Uuid::new_v4(),
            original_query: original_query.into(),
            language: "ru".to_string(),
            complexity,
            complexity_score,
            entities: Vec::new(),
            intent: String::new(),
            keywords: Vec::new(),
            embedding: None,
            timestamp: Utc::now(),
        }
    }
}

/// Decision produced by the Router for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub strategy: Strategy,
    pub confidence: f64,
    pub reasoning: String,
    /// Ordered, strictly decreasing in cost; never contains `strategy`.
    pub fallback_strategies: Vec<Strategy>,
    pub estimated_time_ms: u64,
    pub estimated_cost_usd: f64,
    pub cache_hit: bool,
}

/// A retrieved document, optionally scored and embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub embedding: Option<Vec<f32>>,
    pub score: Option<f64>,
    pub source: String,
    pub chunk_id: Option<String>,
}

/// Output of one agent's subtask execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_type: AgentType,
    pub agent_id: String,
    pub result: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub execution_time_ms: u64,
    pub tokens_used: u64,
    pub cost_usd: f64,
}

impl AgentResult {
    /// A zero-confidence stand-in for a subtask whose agent failed; the
    /// failure degrades this subtask's contribution rather than the query.
    pub fn failed(agent_type: AgentType, agent_id: impl Into<String>) -> Self {
        Self {
            agent_type,
            agent_id: agent_id.into(),
            result: String::new(),
            confidence: 0.0,
            sources: Vec::new(),
            execution_time_ms: 0,
            tokens_used: 0,
            cost_usd: 0.0,
        }
    }
}

/// The final response object sealed at the Orchestrator/Coordinator boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub query_id: Uuid,
    pub answer: String,
    pub strategy_used: Strategy,
    pub confidence_score: f64,
    pub relevance_score: f64,
    pub latency_ms: u64,
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub documents_retrieved: Vec<Document>,
    pub agents_used: Vec<AgentType>,
    pub agent_results: Vec<AgentResult>,
    pub execution_path: Vec<String>,
    pub reasoning_chain: Vec<String>,
    pub cached: bool,
    pub fallback_used: bool,
    pub error: Option<String>,
}

impl QueryResult {
    pub fn new(query_id: Uuid, strategy_used: Strategy) -> Self {
        Self {
            query_id,
            answer: String::new(),
            strategy_used,
            confidence_score: 0.0,
            relevance_score: 0.0,
            latency_ms: 0,
            tokens_used: 0,
            cost_usd: 0.0,
            documents_retrieved: Vec::new(),
            agents_used: Vec::new(),
            agent_results: Vec::new(),
            execution_path: Vec::new(),
            reasoning_chain: Vec::new(),
            cached: false,
            fallback_used: false,
            error: None,
        }
    }

    /// Seal an error result per §7: every surfaced error is a `QueryResult`
    /// with `error` populated, `strategy_used` reflecting the last attempt,
    /// and a short apologetic answer — never a raw `Err` to the caller.
    pub fn from_error(query_id: Uuid, strategy_used: Strategy, fallback_used: bool, err: &Error) -> Self {
        let mut result = Self::new(query_id, strategy_used);
        result.fallback_used = fallback_used;
        result.error = Some(err.code().to_string());
        result.answer = format!("Sorry, I couldn't process that request ({}).", err.code());
        result
    }

    pub fn mark_cached(&mut self) {
        self.cached = true;
        self.strategy_used = Strategy::Cache;
    }
}

/// An entry in any cache tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: QueryResult,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_result_mark_cached_sets_strategy() {
        let mut r = QueryResult::new(Uuid::new_v4(), Strategy::Classic);
        r.mark_cached();
        assert!(r.cached);
        assert_eq!(r.strategy_used, Strategy::Cache);
    }

    #[test]
    fn from_error_never_panics_and_tags_code() {
        let err = Error::timeout(100);
        let r = QueryResult::from_error(Uuid::new_v4(), Strategy::Agentic, false, &err);
        assert_eq!(r.error.as_deref(), Some("Timeout"));
        assert!(!r.answer.is_empty());
    }

    #[test]
    fn complexity_display_matches_wire_names() {
        assert_eq!(Complexity::MultiHop.to_string(), "multi_hop");
        assert_eq!(Strategy::Classic.to_string(), "classic");
    }
}
