//! Provider registry.
//!
//! Maps the configured provider name to a shared [`LlmProvider`] that every
//! session of an orchestrator reuses.

use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::error::AgentError;

/// Creates the provider named by [`AgentConfig::provider`].
///
/// Names are matched case-insensitively. `"openai"` covers every
/// OpenAI-compatible endpoint through [`AgentConfig::base_url`].
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &AgentConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    let provider: Arc<dyn LlmProvider> = match config.provider.trim().to_lowercase().as_str() {
        "openai" => Arc::new(OpenAiProvider::new(config)),
        _ => {
            return Err(AgentError::UnsupportedProvider {
                name: config.provider.clone(),
            });
        }
    };
    tracing::debug!(
        provider = provider.name(),
        base_url = config.base_url.as_deref().unwrap_or("default"),
        "LLM provider ready"
    );
    Ok(provider)
}
