//! Source router.
//!
//! Picks exactly one catalog source for the question with a single
//! JSON-mode call. Runs once per session; every failure here is fatal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::config::AgentConfig;
use super::prompt::build_router_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::catalog::Catalog;
use crate::core::ExpertKind;
use crate::error::{AgentError, SessionError};

/// Characters of the question kept in router error messages.
const QUERY_PREVIEW_CHARS: usize = 100;

/// The router's structured decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    /// Expert that will own the session.
    pub expert: ExpertKind,
    /// Selected source name, as returned by the model.
    pub source: String,
}

#[derive(Deserialize)]
struct RawDecision {
    #[serde(default)]
    route: String,
    #[serde(default)]
    source: String,
}

/// Agent that selects a data source.
pub struct SourceRouter {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl SourceRouter {
    /// Creates a router with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.router_model.clone(),
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Selects a source for `question`.
    ///
    /// Fails before any model call when the catalog or the question is empty.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyCatalog`], [`SessionError::MissingQuestion`],
    /// or [`SessionError::Router`] if the model call or its output fails.
    pub async fn route(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
        catalog: &Catalog,
    ) -> Result<RouteDecision, SessionError> {
        if catalog.is_empty() {
            return Err(SessionError::EmptyCatalog);
        }
        if question.trim().is_empty() {
            return Err(SessionError::MissingQuestion);
        }

        let wrap = |source: AgentError| SessionError::Router {
            query: question.chars().take(QUERY_PREVIEW_CHARS).collect(),
            source,
        };

        let user_msg = build_router_prompt(question, &catalog.summary());
        let response = self.execute(provider, &user_msg).await.map_err(wrap)?;
        Self::parse_decision(&response.content, catalog).map_err(wrap)
    }

    /// Parses the model's JSON answer.
    ///
    /// Unknown route labels fall back to the kind of the named source when
    /// it exists in the catalog.
    fn parse_decision(content: &str, catalog: &Catalog) -> Result<RouteDecision, AgentError> {
        let trimmed = content.trim();
        let json_str = if trimmed.starts_with("```") {
            trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim()
        } else {
            trimmed
        };

        let raw: RawDecision =
            serde_json::from_str(json_str).map_err(|e| AgentError::ResponseParse {
                message: format!("Failed to parse route decision: {e}"),
                content: content.to_string(),
            })?;

        let expert = parse_route(&raw.route)
            .or_else(|| {
                catalog
                    .sources()
                    .iter()
                    .find(|s| s.name == raw.source)
                    .and_then(|s| ExpertKind::for_backend(s.kind))
            })
            .ok_or_else(|| AgentError::ResponseParse {
                message: format!("unknown route '{}'", raw.route),
                content: content.to_string(),
            })?;

        Ok(RouteDecision {
            expert,
            source: raw.source.trim().to_string(),
        })
    }
}

/// Maps a route label to an expert.
fn parse_route(route: &str) -> Option<ExpertKind> {
    match route.trim().to_lowercase().as_str() {
        "relational" | "sql" | "expert_sql" => Some(ExpertKind::Sql),
        "document" | "nosql" | "mongodb" | "expert_nosql" => Some(ExpertKind::Document),
        _ => None,
    }
}

#[async_trait]
impl Agent for SourceRouter {
    fn name(&self) -> &'static str {
        "router"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
