//! Response synthesizer.
//!
//! Gathers every piece of evidence the session produced and asks the model
//! for one final answer. Evidence gathering is a pure function of the
//! conversation, so repeated synthesis over the same history cites the
//! same sources.

use async_trait::async_trait;
use serde::Serialize;

use super::config::AgentConfig;
use super::message::Role;
use super::prompt::build_synthesizer_prompt;
use super::provider::LlmProvider;
use super::tool::ToolName;
use super::traits::Agent;
use crate::catalog::BackendKind;
use crate::core::RunState;
use crate::error::AgentError;

/// Source label for knowledge-base evidence.
pub const KNOWLEDGE_BASE_SOURCE: &str = "Knowledge base";

/// Evidence collected from a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evidence {
    /// Relational and document tool results, in order.
    pub database_results: Vec<String>,
    /// Knowledge-search tool results, in order.
    pub knowledge_results: Vec<String>,
    /// System error notes, in order.
    pub issues: Vec<String>,
    /// Sources consulted, database first.
    pub sources_consulted: Vec<String>,
}

impl Evidence {
    /// Collects evidence from the session's conversation.
    #[must_use]
    pub fn gather(state: &RunState) -> Self {
        let mut evidence = Self::default();

        for msg in state.conversation().messages() {
            match msg.role {
                Role::Tool => {
                    let kind = msg
                        .tool_name
                        .as_deref()
                        .and_then(ToolName::parse)
                        .map(ToolName::backend_kind);
                    match kind {
                        Some(BackendKind::Relational | BackendKind::Document) => {
                            evidence.database_results.push(msg.content.clone());
                        }
                        Some(BackendKind::Vector) => {
                            evidence.knowledge_results.push(msg.content.clone());
                        }
                        None => {}
                    }
                }
                Role::System if msg.is_error_note() => evidence.issues.push(msg.content.clone()),
                _ => {}
            }
        }

        if !evidence.database_results.is_empty() {
            let source = state.selected_source().unwrap_or("database");
            evidence.sources_consulted.push(format!("Database: {source}"));
        }
        if !evidence.knowledge_results.is_empty() {
            evidence
                .sources_consulted
                .push(KNOWLEDGE_BASE_SOURCE.to_string());
        }
        evidence
    }
}

/// Agent that writes the final answer.
pub struct SynthesizerAgent {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates a new synthesizer agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.synthesizer_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.synthesizer_temperature,
            system_prompt,
        }
    }

    /// Produces the final answer and the evidence it was built from.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails or returns no text.
    pub async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        state: &RunState,
    ) -> Result<(String, Evidence), AgentError> {
        let evidence = Evidence::gather(state);
        let user_msg = build_synthesizer_prompt(
            state.question(),
            &evidence.database_results,
            &evidence.knowledge_results,
            &evidence.issues,
            &evidence.sources_consulted,
        );

        let response = self.execute(provider, &user_msg).await?;
        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(AgentError::EmptyResponse {
                agent: self.name(),
            });
        }
        Ok((answer.to_string(), evidence))
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
