//! Semantic fallback expert.
//!
//! Sees only the original question, never the failed attempts, so that SQL
//! fragments and error text do not leak into the similarity search.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::expert::ExpertStep;
use super::message::{assistant_message, assistant_tool_calls_message, system_message};
use super::provider::LlmProvider;
use super::tool::{ToolDefinition, ToolSet};
use super::traits::Agent;
use crate::core::RunState;

/// Agent that queries the knowledge base.
pub struct SemanticExpert {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl SemanticExpert {
    /// Creates the fallback expert.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.expert_model.clone(),
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Asks the model for a knowledge search over the question alone.
    pub async fn run(&self, provider: &dyn LlmProvider, state: &mut RunState) -> ExpertStep {
        let history: Vec<_> = state
            .conversation()
            .user_question()
            .cloned()
            .into_iter()
            .collect();

        match self
            .execute_messages(provider, &self.system_prompt, &history)
            .await
        {
            Ok(response) if !response.tool_calls.is_empty() => {
                state.conversation_mut().push(assistant_tool_calls_message(
                    &response.content,
                    response.tool_calls.clone(),
                ));
                ExpertStep::ToolCalls(response.tool_calls)
            }
            Ok(response) => {
                state
                    .conversation_mut()
                    .push(assistant_message(&response.content));
                ExpertStep::DirectAnswer
            }
            Err(e) => {
                tracing::warn!(error = %e, "semantic expert model call failed");
                state.conversation_mut().push(system_message(&format!(
                    "Error: the knowledge base search could not be generated: {e}"
                )));
                ExpertStep::Failed
            }
        }
    }
}

#[async_trait]
impl Agent for SemanticExpert {
    fn name(&self) -> &'static str {
        "semantic_expert"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        ToolSet::knowledge_tools().into_definitions()
    }
}
