//! Agent trait definition.
//!
//! Every model-backed node of the state machine implements this trait,
//! which gives a uniform way to build requests from an agent's fixed
//! configuration.

use async_trait::async_trait;

use super::message::{ChatMessage, ChatRequest, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use super::tool::{ToolCall, ToolDefinition};
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone, Default)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Tool calls the model requested.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"tool_calls"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate one role (routing, querying, judging, answering)
/// with a system prompt and model configuration.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// Base system prompt that defines the agent's role.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Tool definitions bound to this agent. Empty by default.
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Executes the agent with its own system prompt and one user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        self.execute_messages(
            provider,
            self.system_prompt(),
            std::slice::from_ref(&user_message(user_msg)),
        )
        .await
    }

    /// Executes the agent with explicit instructions over a message history.
    ///
    /// The instructions become the leading system message; `history` follows
    /// unchanged. Bound tools are attached.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute_messages(
        &self,
        provider: &dyn LlmProvider,
        instructions: &str,
        history: &[ChatMessage],
    ) -> Result<AgentResponse, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(system_message(instructions));
        messages.extend_from_slice(history);

        let request = ChatRequest {
            model: self.model().to_string(),
            messages,
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
            tools: self.tools(),
        };

        tracing::debug!(
            agent = self.name(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending agent request"
        );

        let response = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            tool_calls: response.tool_calls,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
