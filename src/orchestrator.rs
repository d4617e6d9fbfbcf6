//! Agent Orchestrator (§4.5): decomposes a complex query into subtasks,
//! dispatches them to role-specialised agents sequentially, in parallel, or
//! adaptively, and synthesises a final answer with a confidence score.

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::collaborators::{CompletionOptions, Completer, Retriever};
use crate::models::{AgentResult, AgentType, QueryMetadata, QueryResult, Strategy};

/// Fan-out mode for subtasks of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyMode {
    Sequential,
    Parallel,
    Adaptive,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Refinement budget (`max_iterations_agentic`, default 5).
    pub max_iterations: u32,
    /// Early-exit threshold for synthesis confidence (default 0.8).
    pub confidence_threshold: f64,
    pub strategy_mode: StrategyMode,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            confidence_threshold: 0.8,
            strategy_mode: StrategyMode::Adaptive,
        }
    }
}

/// One unit of work produced by decomposition.
#[derive(Debug, Clone)]
pub struct Subtask {
    pub description: String,
    pub agent_type: AgentType,
    pub priority: u32,
    /// Index of a subtask this one depends on. Declared by the decomposer
    /// or, absent declaration, inferred as strict left-to-right (§4.5).
    pub depends_on: Option<usize>,
}

/// All five agent roles in declaration order. Used to size the bounded
/// fan-out semaphore — the default bound is the number of distinct agent
/// roles (§9).
const AGENT_ROLE_COUNT: usize = 5;

/// Decomposes a query, dispatches subtasks, and synthesises a final answer.
pub struct Orchestrator {
    completer: Arc<dyn Completer>,
    retriever: Arc<dyn Retriever>,
    config: OrchestratorConfig,
    fan_out: Semaphore,
}

impl Orchestrator {
    pub fn new(completer: Arc<dyn Completer>, retriever: Arc<dyn Retriever>, config: OrchestratorConfig) -> Self {
        Self {
            completer,
            retriever,
            config,
            fan_out: Semaphore::new(AGENT_ROLE_COUNT),
        }
    }

    /// Step 1: ask the Completer to split the query into subtasks. Falls
    /// back unconditionally to a fixed research/analysis/synthesis template
    /// on any parse failure — the decomposer is never retried (§9).
    async fn decompose(&self, query: &str) -> Vec<Subtask> {
        let prompt = format!(
            "Decompose the following query into an ordered JSON list of subtasks, \
             each with description/type/priority fields (type is one of research, \
             analysis, synthesis, verification, code):\n\n{query}"
        );

        let response = match self.completer.complete(&prompt, CompletionOptions::default()).await {
            Ok(text) => text,
            Err(_) => return Self::fixed_template(),
        };

        match serde_json::from_str::<Vec<DecomposedSubtask>>(&response) {
            Ok(parsed) if !parsed.is_empty() => parsed
                .into_iter()
                .enumerate()
                .map(|(idx, raw)| Subtask {
                    description: raw.description,
                    agent_type: raw.r#type,
                    priority: raw.priority,
                    depends_on: raw.depends_on.or(if idx == 0 { None } else { Some(idx - 1) }),
                })
                .collect(),
            _ => Self::fixed_template(),
        }
    }

    fn fixed_template() -> Vec<Subtask> {
        vec![
            Subtask {
                description: "Gather relevant facts".to_string(),
                agent_type: AgentType::Research,
                priority: 0,
                depends_on: None,
            },
            Subtask {
                description: "Reason over the retrieved facts".to_string(),
                agent_type: AgentType::Analysis,
                priority: 1,
                depends_on: Some(0),
            },
            Subtask {
                description: "Compose the final answer".to_string(),
                agent_type: AgentType::Synthesis,
                priority: 2,
                depends_on: Some(1),
            },
        ]
    }

    /// Step 2/3: assign and execute subtasks, honouring the configured
    /// strategy mode and dependency ordering.
    async fn assign_and_execute(&self, subtasks: Vec<Subtask>) -> (Vec<AgentResult>, Vec<String>) {
        let mut context = Vec::new();
        let mut results: Vec<AgentResult> = Vec::with_capacity(subtasks.len());
        let mut execution_path = Vec::new();

        match self.config.strategy_mode {
            StrategyMode::Sequential => {
                for subtask in subtasks {
                    let result = self.execute_subtask(&subtask, &context).await;
                    execution_path.push(format!("{}:{}", subtask.agent_type, subtask.description));
                    context.push(result.result.clone());
                    results.push(result);
                }
            }
            StrategyMode::Parallel | StrategyMode::Adaptive => {
                // Batch subtasks with no unmet dependency; run each batch
                // concurrently, bounded by `fan_out`, then fold results into
                // context before the next batch.
                let mut remaining: Vec<(usize, Subtask)> = subtasks.into_iter().enumerate().collect();
                let mut done = vec![false; remaining.len()];

                while !remaining.is_empty() {
                    let ready: Vec<(usize, Subtask)> = remaining
                        .iter()
                        .filter(|(_, s)| s.depends_on.map_or(true, |dep| done[dep]))
                        .cloned()
                        .collect();
                    if ready.is_empty() {
                        // Dependency cycle or bad indices — drain the rest sequentially.
                        remaining.sort_by_key(|(idx, _)| *idx);
                        for (idx, subtask) in remaining.drain(..) {
                            let result = self.execute_subtask(&subtask, &context).await;
                            execution_path.push(format!("{}:{}", subtask.agent_type, subtask.description));
                            context.push(result.result.clone());
                            results.push(result);
                            done[idx] = true;
                        }
                        break;
                    }

                    let ctx_snapshot = context.clone();
                    let futures = ready.iter().map(|(_, subtask)| {
                        let ctx = ctx_snapshot.clone();
                        async move { self.execute_subtask(subtask, &ctx).await }
                    });
                    let batch_results = futures::future::join_all(futures).await;

                    for ((idx, subtask), result) in ready.iter().zip(batch_results) {
                        execution_path.push(format!("{}:{}", subtask.agent_type, subtask.description));
                        context.push(result.result.clone());
                        results.push(result);
                        done[*idx] = true;
                    }

                    let ready_ids: std::collections::HashSet<usize> = ready.iter().map(|(idx, _)| *idx).collect();
                    remaining.retain(|(idx, _)| !ready_ids.contains(idx));
                }
            }
        }

        (results, execution_path)
    }

    /// Step 3 for one subtask: execute via the role's collaborator, then
    /// refine once through the Completer if the agent signalled it needs
    /// refinement.
    async fn execute_subtask(&self, subtask: &Subtask, context: &[String]) -> AgentResult {
        let _permit = self.fan_out.acquire().await;

        let started = std::time::Instant::now();
        let joined_context = context.join("\n---\n");

        let (mut text, needs_refinement) = match subtask.agent_type {
            AgentType::Research => match self.retriever.search(&subtask.description, None, 5).await {
                Ok(docs) => {
                    let joined = docs.iter().map(|d| d.content.clone()).collect::<Vec<_>>().join("\n");
                    (joined, false)
                }
                Err(_) => return AgentResult::failed(subtask.agent_type, subtask.agent_type.to_string()),
            },
            _ => {
                let prompt = format!(
                    "Role: {}\nTask: {}\nContext so far:\n{}\n",
                    subtask.agent_type, subtask.description, joined_context
                );
                match self.completer.complete(&prompt, CompletionOptions::default()).await {
                    Ok(text) => {
                        let needs_refinement = text.to_lowercase().contains("needs_refinement");
                        (text, needs_refinement)
                    }
                    Err(_) => return AgentResult::failed(subtask.agent_type, subtask.agent_type.to_string()),
                }
            }
        };

        if needs_refinement {
            let refinement_prompt = format!("Refine this answer, it was flagged as incomplete:\n{text}");
            if let Ok(refined) = self.completer.complete(&refinement_prompt, CompletionOptions::default()).await {
                text = refined;
            }
        }

        AgentResult {
            agent_type: subtask.agent_type,
            agent_id: format!("{}-agent", subtask.agent_type),
            result: text,
            confidence: 0.8,
            sources: Vec::new(),
            execution_time_ms: started.elapsed().as_millis() as u64,
            tokens_used: 0,
            cost_usd: 0.0,
        }
    }

    /// Step 4: synthesise the final answer from the original query and all
    /// subtask results.
    async fn synthesize(&self, query: &str, agent_results: &[AgentResult]) -> String {
        let summary = agent_results
            .iter()
            .map(|r| format!("[{}] {}", r.agent_type, r.result))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!("Original query: {query}\nSubtask results:\n{summary}\n\nCompose the final answer.");
        self.completer
            .complete(&prompt, CompletionOptions::default())
            .await
            .unwrap_or_else(|_| "Unable to synthesize an answer.".to_string())
    }

    /// Step 5: arithmetic mean of per-subtask confidences, or 0.75 if none
    /// reported one.
    fn score(agent_results: &[AgentResult]) -> f64 {
        if agent_results.is_empty() {
            return 0.75;
        }
        let sum: f64 = agent_results.iter().map(|r| r.confidence).sum();
        sum / agent_results.len() as f64
    }

    /// Run the full pipeline for one query metadata, producing a sealed
    /// `QueryResult` with `strategy_used = Agentic`.
    ///
    /// Decompose/execute runs once; synthesis then repeats, feeding the
    /// previous answer back in as a critique target, until the confidence
    /// score clears `config.confidence_threshold` or `config.max_iterations`
    /// refinement rounds are spent — whichever comes first. The best-scoring
    /// round's answer wins even if it never cleared the threshold.
    pub async fn run(&self, metadata: &QueryMetadata) -> QueryResult {
        let subtasks = self.decompose(&metadata.original_query).await;
        let (agent_results, execution_path) = self.assign_and_execute(subtasks).await;
        let confidence_floor = Self::score(&agent_results).clamp(0.0, 1.0);

        let mut best_answer = self.synthesize(&metadata.original_query, &agent_results).await;
        let mut best_confidence = confidence_floor;
        let mut refinement_rounds = 0u32;

        while best_confidence < self.config.confidence_threshold && refinement_rounds < self.config.max_iterations.saturating_sub(1) {
            refinement_rounds += 1;
            let (candidate, candidate_confidence) = self.refine(metadata, &agent_results, &best_answer, best_confidence).await;
            if candidate_confidence <= best_confidence {
                break;
            }
            best_answer = candidate;
            best_confidence = candidate_confidence;
        }

        let agents_used: Vec<AgentType> = agent_results.iter().map(|r| r.agent_type).collect();
        let tokens_used = agent_results.iter().map(|r| r.tokens_used).sum();
        let cost_usd = agent_results.iter().map(|r| r.cost_usd).sum();

        let mut result = QueryResult::new(metadata.query_id, Strategy::Agentic);
        result.answer = best_answer;
        result.confidence_score = best_confidence;
        result.relevance_score = best_confidence;
        result.agents_used = agents_used;
        result.agent_results = agent_results;
        result.execution_path = execution_path;
        result.tokens_used = tokens_used;
        result.cost_usd = cost_usd;
        result
    }

    /// One refinement round: ask the Completer to critique-and-improve the
    /// current best answer. Confidence nudges up by a fixed step per round
    /// (there is no second scoring model to re-run) capped at 0.97, so the
    /// loop can still terminate on `max_iterations` even if the Completer's
    /// prose never changes.
    async fn refine(
        &self,
        metadata: &QueryMetadata,
        agent_results: &[AgentResult],
        current_answer: &str,
        current_confidence: f64,
    ) -> (String, f64) {
        let summary = agent_results
            .iter()
            .map(|r| format!("[{}] {}", r.agent_type, r.result))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Original query: {}\nSubtask results:\n{summary}\n\nCurrent answer:\n{current_answer}\n\n\
             Critique the current answer and produce an improved version.",
            metadata.original_query
        );

        match self.completer.complete(&prompt, CompletionOptions::default()).await {
            Ok(refined) => {
                let bumped = (current_confidence + 0.05).min(0.97);
                (refined, bumped)
            }
            Err(_) => (current_answer.to_string(), current_confidence),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}

#[derive(Debug, serde::Deserialize)]
struct DecomposedSubtask {
    description: String,
    r#type: AgentType,
    #[serde(default)]
    priority: u32,
    #[serde(default)]
    depends_on: Option<usize>,
}
