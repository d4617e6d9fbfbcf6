//! # hybrid-fabric-core
//!
//! A hybrid RAG decision fabric: classifies incoming queries, routes them
//! across a classic retrieval pipeline, an agentic multi-step orchestrator,
//! or both at once, and serves repeat queries out of a three-tier cache.
//!
//! ## Core Components
//!
//! - **Classifier**: heuristic (and optionally model-backed) complexity scoring
//! - **Router**: strategy selection, fallback chains, time/cost estimation
//! - **Cache**: L1 exact match, L2 semantic similarity, L3 execution path
//! - **Orchestrator**: decomposition, role-based agent dispatch, synthesis
//! - **Runtime**: the composition root tying the above to caller-supplied
//!   completer/embedder/retriever collaborators
//!
//! ## Example
//!
//! ```rust,ignore
//! use hybrid_fabric_core::{Runtime, Collaborators, Settings, QueryOptions};
//!
//! let runtime = Runtime::new(Settings::default(), collaborators);
//! let result = runtime.simple_query("What is Rust?").await;
//! println!("{}", result.answer);
//! ```

pub mod cache;
pub mod classic;
pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod extraction;
pub mod hybrid;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod router;
pub mod runtime;

pub use cache::{CacheConfig, MultiLevelCache, MultiLevelStats};
pub use classic::ClassicPipeline;
pub use classifier::{Classification, Classifier, ComplexityModel};
pub use collaborators::{AlwaysAvailable, Completer, CompletionOptions, Embedder, MetricsSink, NullMetricsSink, ResourceOracle, Retriever};
pub use config::Settings;
pub use error::{Error, Result};
pub use hybrid::HybridCoordinator;
pub use metrics::{CostTracker, Counters, CountersSnapshot, StrategyCosts};
pub use models::{
    AgentResult, AgentType, CacheEntry, Complexity, Document, Query, QueryMetadata, QueryResult, RoutingDecision, Strategy,
};
pub use orchestrator::{Orchestrator, OrchestratorConfig, StrategyMode, Subtask};
pub use router::{Router, RouterConfig};
pub use runtime::{Collaborators, QueryOptions, Runtime};
