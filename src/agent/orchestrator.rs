//! Session orchestrator: the routing state machine.
//!
//! ```text
//! Router → {SQLExpert | DocumentExpert} → (tools) → Evaluator
//!   Evaluator: satisfactory            → Synthesizer
//!              error | unsatisfactory  → same expert while retry_count < max_retries
//!                                      → SemanticExpert → (tools) → Synthesizer
//!              no_results              → end without an answer
//! ```
//!
//! Each call to [`Orchestrator::answer`] owns a fresh [`RunState`] and its
//! own connectors, so concurrent sessions share only the read-only catalog,
//! the knowledge base, and the provider.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::config::AgentConfig;
use super::evaluator::ResultEvaluator;
use super::executor::{SessionBackends, ToolExecutor};
use super::expert::{ExpertStep, QueryExpert};
use super::message::{Role, assistant_message, tool_message};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::router::SourceRouter;
use super::semantic::SemanticExpert;
use super::synthesizer::SynthesizerAgent;
use super::tool::{ToolCall, ToolName};
use crate::backend::{BackendFactory, KnowledgeBase};
use crate::catalog::Catalog;
use crate::core::{EvaluationLabel, ExpertKind, Node, RunState};
use crate::error::SessionError;

/// Result of one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    /// Synthesized answer. `None` only when the expert replied without
    /// querying its backend.
    pub answer: Option<String>,
    /// The expert's plain-text reply in the `no_results` case.
    pub direct_reply: Option<String>,
    /// Sources the answer was built from.
    pub sources_consulted: Vec<String>,
    /// Final run state, including the full conversation.
    pub state: RunState,
    /// Nodes visited, in order.
    pub trace: Vec<Node>,
}

impl SessionOutcome {
    /// Text to show the user: the answer, or the direct reply.
    #[must_use]
    pub fn text(&self) -> &str {
        self.answer
            .as_deref()
            .or(self.direct_reply.as_deref())
            .unwrap_or_default()
    }

    /// Number of visits to a node.
    #[must_use]
    pub fn visits(&self, node: Node) -> usize {
        self.trace.iter().filter(|n| **n == node).count()
    }
}

/// Runs question-answering sessions.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
    prompts: PromptSet,
    catalog: Arc<Catalog>,
    factory: Arc<dyn BackendFactory>,
    knowledge: Arc<dyn KnowledgeBase>,
}

impl Orchestrator {
    /// Creates a new orchestrator.
    ///
    /// Loads prompt templates from the directory specified in
    /// [`AgentConfig::prompt_dir`], falling back to compiled-in defaults.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: AgentConfig,
        catalog: Arc<Catalog>,
        factory: Arc<dyn BackendFactory>,
        knowledge: Arc<dyn KnowledgeBase>,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self {
            provider,
            config,
            prompts,
            catalog,
            factory,
            knowledge,
        }
    }

    /// Replaces the prompt set.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// The catalog sessions route over.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Answers one question.
    ///
    /// Recoverable failures (missing sources, connector errors, bad queries,
    /// inadequate results) are absorbed into the retry and fallback policy.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for an empty catalog, a blank question, or a
    /// failed router or synthesizer call.
    pub async fn answer(&self, question: &str) -> Result<SessionOutcome, SessionError> {
        let provider = &*self.provider;
        let mut state = RunState::new(question);
        let mut trace = vec![Node::Router];

        let router = SourceRouter::new(&self.config, self.prompts.router.clone());
        let decision = router.route(provider, question, &self.catalog).await?;
        info!(
            node = "router",
            source = %decision.source,
            expert = %decision.expert,
            "route selected"
        );
        let expert_kind = decision.expert;
        state.set_route(expert_kind, decision.source);

        let expert = QueryExpert::new(expert_kind, &self.config, self.expert_prompt(expert_kind));
        let evaluator = ResultEvaluator::new(&self.config, self.prompts.evaluator.clone());
        let mut backends = SessionBackends::new(
            Arc::clone(&self.knowledge),
            self.config.semantic_top_k,
        );

        loop {
            trace.push(Node::expert(expert_kind));
            let step = expert
                .run(
                    provider,
                    &mut state,
                    &self.catalog,
                    self.factory.as_ref(),
                    &mut backends,
                )
                .await;
            info!(
                node = %Node::expert(expert_kind),
                retry_count = state.retry_count(),
                called_tool = matches!(step, ExpertStep::ToolCalls(_)),
                "expert step finished"
            );
            if let ExpertStep::ToolCalls(calls) = &step {
                Self::run_tools(&mut state, &backends, calls, Self::bound_tool(expert_kind));
            }

            let label = evaluator.evaluate(provider, &mut state).await;
            trace.push(Node::Evaluator(label));
            info!(
                node = "evaluator",
                %label,
                retry_count = state.retry_count(),
                "result evaluated"
            );

            match label {
                EvaluationLabel::Satisfactory => break,
                EvaluationLabel::NoResults => {
                    let direct_reply = state
                        .conversation()
                        .last()
                        .filter(|m| m.role == Role::Assistant)
                        .map(|m| m.content.clone());
                    return Ok(SessionOutcome {
                        answer: None,
                        direct_reply,
                        sources_consulted: Vec::new(),
                        state,
                        trace,
                    });
                }
                EvaluationLabel::Error | EvaluationLabel::Unsatisfactory
                    if state.retry_count() < self.config.max_retries =>
                {
                    debug!(retry_count = state.retry_count(), "retrying same source");
                }
                EvaluationLabel::Error | EvaluationLabel::Unsatisfactory => {
                    self.fallback(&mut state, &mut trace, &backends).await;
                    break;
                }
            }
        }

        trace.push(Node::Synthesizer);
        let synthesizer = SynthesizerAgent::new(&self.config, self.prompts.synthesizer.clone());
        let (answer, evidence) = synthesizer
            .synthesize(provider, &state)
            .await
            .map_err(SessionError::Synthesis)?;
        info!(
            node = "synthesizer",
            sources = ?evidence.sources_consulted,
            "answer synthesized"
        );
        state
            .conversation_mut()
            .push(assistant_message(&answer));

        Ok(SessionOutcome {
            answer: Some(answer),
            direct_reply: None,
            sources_consulted: evidence.sources_consulted,
            state,
            trace,
        })
    }

    /// Runs the semantic fallback expert and its knowledge search.
    async fn fallback(
        &self,
        state: &mut RunState,
        trace: &mut Vec<Node>,
        backends: &SessionBackends,
    ) {
        trace.push(Node::SemanticExpert);
        info!(
            node = "semantic_expert",
            retry_count = state.retry_count(),
            "retry budget exhausted, falling back to knowledge base"
        );
        let semantic = SemanticExpert::new(&self.config, self.prompts.semantic.clone());
        if let ExpertStep::ToolCalls(calls) = semantic.run(&*self.provider, state).await {
            Self::run_tools(state, backends, &calls, ToolName::KnowledgeSearch);
        }
    }

    /// Executes tool calls and appends their results.
    ///
    /// Calls to any tool other than `bound` come back as error results.
    fn run_tools(
        state: &mut RunState,
        backends: &SessionBackends,
        calls: &[ToolCall],
        bound: ToolName,
    ) {
        let executor = ToolExecutor::new(backends).bound_to(bound);
        state.conversation_mut().extend(calls.iter().map(|call| {
            let result = executor.execute(call);
            tool_message(&result.tool_call_id, &result.tool_name, &result.content)
        }));
    }

    const fn bound_tool(kind: ExpertKind) -> ToolName {
        match kind {
            ExpertKind::Sql => ToolName::SqlQuery,
            ExpertKind::Document => ToolName::DocumentQuery,
        }
    }

    fn expert_prompt(&self, kind: ExpertKind) -> String {
        match kind {
            ExpertKind::Sql => self.prompts.sql_expert.clone(),
            ExpertKind::Document => self.prompts.document_expert.clone(),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .field("sources", &self.catalog.sources().len())
            .finish_non_exhaustive()
    }
}
