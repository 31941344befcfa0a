//! Query experts for relational and document sources.
//!
//! One type serves both backends; [`ExpertKind`] selects the tool, the
//! prompt, and the connector slot. Every call counts as an attempt, so the
//! retry loop terminates even when the source can never be resolved.

use std::sync::Arc;

use async_trait::async_trait;

use super::config::AgentConfig;
use super::executor::{DocumentTarget, SessionBackends};
use super::message::{assistant_message, assistant_tool_calls_message, system_message};
use super::prompt::{build_document_expert_prompt, build_sql_expert_prompt, retry_hint};
use super::provider::LlmProvider;
use super::tool::{ToolCall, ToolDefinition, ToolSet};
use super::traits::Agent;
use crate::backend::BackendFactory;
use crate::catalog::{Catalog, ConnectionSpec, DataSourceDescriptor};
use crate::core::{ExpertKind, RunState};

/// What an expert step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpertStep {
    /// The model asked for these tool calls; they still have to run.
    ToolCalls(Vec<ToolCall>),
    /// The model answered in plain text.
    DirectAnswer,
    /// The source or model could not be used; a system note was written.
    Failed,
}

/// Agent that turns a question into a backend query.
pub struct QueryExpert {
    kind: ExpertKind,
    model: String,
    max_tokens: u32,
    max_retries: u32,
    system_prompt: String,
}

impl QueryExpert {
    /// Creates an expert of the given kind.
    #[must_use]
    pub fn new(kind: ExpertKind, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            kind,
            model: config.expert_model.clone(),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            system_prompt,
        }
    }

    /// Which backend this expert queries.
    #[must_use]
    pub const fn kind(&self) -> ExpertKind {
        self.kind
    }

    /// Runs one attempt against the session's selected source.
    ///
    /// Configuration and model failures are written to the conversation as
    /// system error notes instead of being returned.
    pub async fn run(
        &self,
        provider: &dyn LlmProvider,
        state: &mut RunState,
        catalog: &Catalog,
        factory: &dyn BackendFactory,
        backends: &mut SessionBackends,
    ) -> ExpertStep {
        let hint = retry_hint(state.retry_count(), self.max_retries);

        let instructions = match self.prepare(state, catalog, factory, backends, hint.as_deref()) {
            Ok(instructions) => instructions,
            Err(note) => {
                tracing::warn!(expert = %self.kind, %note, "source could not be resolved");
                state.conversation_mut().push(system_message(&note));
                state.increment_retry();
                return ExpertStep::Failed;
            }
        };

        let result = self
            .execute_messages(provider, &instructions, state.conversation().messages())
            .await;
        state.increment_retry();

        match result {
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
                tracing::warn!(expert = %self.kind, error = %e, "expert model call failed");
                state.conversation_mut().push(system_message(&format!(
                    "Error: the {} expert could not generate a query: {e}",
                    self.kind
                )));
                ExpertStep::Failed
            }
        }
    }

    /// Resolves the source, binds its connector, and builds the instructions.
    fn prepare(
        &self,
        state: &RunState,
        catalog: &Catalog,
        factory: &dyn BackendFactory,
        backends: &mut SessionBackends,
        hint: Option<&str>,
    ) -> Result<String, String> {
        let name = state
            .selected_source()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Error: no data source was selected for this session".to_string())?;
        let source = catalog
            .get_source_config(name, self.kind.backend_kind())
            .ok_or_else(|| {
                format!(
                    "Error: {} data source '{name}' was not found in the catalog",
                    self.kind.backend_kind()
                )
            })?;

        match self.kind {
            ExpertKind::Sql => self.prepare_sql(source, factory, backends, hint),
            ExpertKind::Document => self.prepare_documents(source, factory, backends, hint),
        }
    }

    fn prepare_sql(
        &self,
        source: &DataSourceDescriptor,
        factory: &dyn BackendFactory,
        backends: &mut SessionBackends,
        hint: Option<&str>,
    ) -> Result<String, String> {
        let backend = match backends.sql() {
            Some(backend) => backend,
            None => {
                let backend = factory
                    .sql(source)
                    .map_err(|e| format!("Error: could not create a connector for '{}': {e}", source.name))?;
                backends.set_sql(Arc::clone(&backend));
                backend
            }
        };

        let schema = match &source.schema {
            Some(schema) => schema.clone(),
            None => backend.schema().unwrap_or_else(|e| {
                tracing::warn!(source = %source.name, error = %e, "schema introspection failed");
                "Schema unavailable.".to_string()
            }),
        };

        Ok(build_sql_expert_prompt(
            &self.system_prompt,
            backend.engine().as_str(),
            &schema,
            hint,
        ))
    }

    fn prepare_documents(
        &self,
        source: &DataSourceDescriptor,
        factory: &dyn BackendFactory,
        backends: &mut SessionBackends,
        hint: Option<&str>,
    ) -> Result<String, String> {
        let ConnectionSpec::Document(conn) = &source.connection else {
            return Err(format!(
                "Error: data source '{}' is not a document source",
                source.name
            ));
        };

        if !backends.has_documents() {
            let backend = factory
                .documents(source)
                .map_err(|e| format!("Error: could not create a connector for '{}': {e}", source.name))?;
            backends.set_documents(DocumentTarget {
                backend,
                database: conn.database.clone(),
                collections: conn.collections.clone(),
            });
        }

        let schema = source.schema.as_deref().unwrap_or("No schema provided");
        Ok(build_document_expert_prompt(
            &self.system_prompt,
            &conn.database,
            &conn.collections,
            schema,
            hint,
        ))
    }
}

#[async_trait]
impl Agent for QueryExpert {
    fn name(&self) -> &'static str {
        match self.kind {
            ExpertKind::Sql => "sql_expert",
            ExpertKind::Document => "document_expert",
        }
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
        match self.kind {
            ExpertKind::Sql => ToolSet::sql_tools(),
            ExpertKind::Document => ToolSet::document_tools(),
        }
        .into_definitions()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::backend::{DefaultBackendFactory, InMemoryKnowledgeBase};
    use crate::catalog::{DocumentConnection, SqlConnection, SqlEngine};
    use crate::error::AgentError;

    struct Unreachable;

    #[async_trait]
    impl LlmProvider for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            panic!("the model must not be called when the source cannot be resolved");
        }
    }

    fn config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn backends() -> SessionBackends {
        SessionBackends::new(Arc::new(InMemoryKnowledgeBase::default()), 3)
    }

    fn catalog() -> Catalog {
        let mut server = SqlConnection::sqlite("unused.db");
        server.engine = SqlEngine::Postgres;
        server.path = None;
        Catalog::from_sources(vec![
            DataSourceDescriptor::sql("warehouse", server, "Postgres warehouse"),
            DataSourceDescriptor::document("app_logs", DocumentConnection::new("logs"), "Events"),
        ])
        .unwrap_or_else(|_| unreachable!())
    }

    async fn run_once(kind: ExpertKind, source: &str) -> (ExpertStep, RunState) {
        let expert = QueryExpert::new(kind, &config(), "[expert]".to_string());
        let mut state = RunState::new("How many orders shipped?");
        state.set_route(kind, source);
        let step = expert
            .run(
                &Unreachable,
                &mut state,
                &catalog(),
                &DefaultBackendFactory,
                &mut backends(),
            )
            .await;
        (step, state)
    }

    #[tokio::test]
    async fn test_unknown_source_writes_note() {
        let (step, state) = run_once(ExpertKind::Sql, "ghost").await;
        assert_eq!(step, ExpertStep::Failed);
        assert_eq!(state.retry_count(), 1);
        let note = state.conversation().last().unwrap_or_else(|| unreachable!());
        assert!(note.is_error_note());
        assert!(note.content.contains("'ghost' was not found"));
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_not_found() {
        let (step, state) = run_once(ExpertKind::Document, "warehouse").await;
        assert_eq!(step, ExpertStep::Failed);
        assert_eq!(state.retry_count(), 1);
    }

    #[tokio::test]
    async fn test_connector_failure_writes_note() {
        let (step, state) = run_once(ExpertKind::Sql, "warehouse").await;
        assert_eq!(step, ExpertStep::Failed);
        let note = state.conversation().last().unwrap_or_else(|| unreachable!());
        assert!(note.content.starts_with("Error: could not create a connector for 'warehouse'"));
        assert!(note.content.contains("postgres"));
    }

    #[tokio::test]
    async fn test_document_store_without_path_is_unsupported() {
        let (step, state) = run_once(ExpertKind::Document, "app_logs").await;
        assert_eq!(step, ExpertStep::Failed);
        let note = state.conversation().last().unwrap_or_else(|| unreachable!());
        assert!(note.content.contains("mongodb"));
    }

    #[test]
    fn test_tools_follow_kind() {
        let sql = QueryExpert::new(ExpertKind::Sql, &config(), String::new());
        let docs = QueryExpert::new(ExpertKind::Document, &config(), String::new());
        assert_eq!(sql.name(), "sql_expert");
        assert_eq!(sql.tools()[0].name, "sql_query");
        assert_eq!(docs.kind(), ExpertKind::Document);
        assert_eq!(docs.tools()[0].name, "document_query");
    }
}
