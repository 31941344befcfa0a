//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;

use crate::error::AgentError;

/// Default model for every agent.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default retry budget for the structured experts.
pub const DEFAULT_MAX_RETRIES: u32 = 4;
/// Default number of knowledge-base documents per semantic search.
pub const DEFAULT_SEMANTIC_TOP_K: usize = 3;
/// Default max tokens per model response.
const DEFAULT_MAX_TOKENS: u32 = 2048;
/// Default synthesizer sampling temperature.
const DEFAULT_SYNTHESIZER_TEMPERATURE: f32 = 0.3;

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for the source router.
    pub router_model: String,
    /// Model for the SQL, document, and semantic experts.
    pub expert_model: String,
    /// Model for the result evaluator.
    pub evaluator_model: String,
    /// Model for the response synthesizer.
    pub synthesizer_model: String,
    /// Retry budget shared by the structured experts. Always at least 1.
    pub max_retries: u32,
    /// Documents returned by each knowledge-base search.
    pub semantic_top_k: usize,
    /// Maximum tokens per model response.
    pub max_tokens: u32,
    /// Sampling temperature of the synthesizer.
    pub synthesizer_temperature: f32,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts load from markdown files in this directory,
    /// falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    router_model: Option<String>,
    expert_model: Option<String>,
    evaluator_model: Option<String>,
    synthesizer_model: Option<String>,
    max_retries: Option<u32>,
    semantic_top_k: Option<usize>,
    max_tokens: Option<u32>,
    synthesizer_temperature: Option<f32>,
    prompt_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("SOURCE_ROUTER_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("SOURCE_ROUTER_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("SOURCE_ROUTER_BASE_URL"))
                .ok();
        }
        if self.router_model.is_none() {
            self.router_model = std::env::var("SOURCE_ROUTER_ROUTER_MODEL").ok();
        }
        if self.expert_model.is_none() {
            self.expert_model = std::env::var("SOURCE_ROUTER_EXPERT_MODEL").ok();
        }
        if self.evaluator_model.is_none() {
            self.evaluator_model = std::env::var("SOURCE_ROUTER_EVALUATOR_MODEL").ok();
        }
        if self.synthesizer_model.is_none() {
            self.synthesizer_model = std::env::var("SOURCE_ROUTER_SYNTHESIZER_MODEL").ok();
        }
        if self.max_retries.is_none() {
            self.max_retries = env_parse("SOURCE_ROUTER_MAX_RETRIES");
        }
        if self.semantic_top_k.is_none() {
            self.semantic_top_k = env_parse("SOURCE_ROUTER_SEMANTIC_TOP_K");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("SOURCE_ROUTER_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the router model.
    #[must_use]
    pub fn router_model(mut self, model: impl Into<String>) -> Self {
        self.router_model = Some(model.into());
        self
    }

    /// Sets the expert model.
    #[must_use]
    pub fn expert_model(mut self, model: impl Into<String>) -> Self {
        self.expert_model = Some(model.into());
        self
    }

    /// Sets the evaluator model.
    #[must_use]
    pub fn evaluator_model(mut self, model: impl Into<String>) -> Self {
        self.evaluator_model = Some(model.into());
        self
    }

    /// Sets the synthesizer model.
    #[must_use]
    pub fn synthesizer_model(mut self, model: impl Into<String>) -> Self {
        self.synthesizer_model = Some(model.into());
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the number of documents per semantic search.
    #[must_use]
    pub const fn semantic_top_k(mut self, n: usize) -> Self {
        self.semantic_top_k = Some(n);
        self
    }

    /// Sets the max tokens per response.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the synthesizer temperature.
    #[must_use]
    pub const fn synthesizer_temperature(mut self, t: f32) -> Self {
        self.synthesizer_temperature = Some(t);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;
        let model = |m: Option<String>| m.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            router_model: model(self.router_model),
            expert_model: model(self.expert_model),
            evaluator_model: model(self.evaluator_model),
            synthesizer_model: model(self.synthesizer_model),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES).max(1),
            semantic_top_k: self
                .semantic_top_k
                .unwrap_or(DEFAULT_SEMANTIC_TOP_K)
                .max(1),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            synthesizer_temperature: self
                .synthesizer_temperature
                .unwrap_or(DEFAULT_SYNTHESIZER_TEMPERATURE),
            prompt_dir: self.prompt_dir,
        })
    }
}
