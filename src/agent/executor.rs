//! Tool executor that dispatches tool calls to the session's backends.
//!
//! Connectors live in a [`SessionBackends`] value owned by one session, so
//! the executor never reaches for process-wide state. Every outcome is a
//! string tool result; nothing here returns an error to the state machine.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::tool::{
    DocumentQueryArgs, KnowledgeSearchArgs, MAX_ARGUMENT_BYTES, SqlQueryArgs, ToolCall, ToolName,
    ToolResult,
};
use crate::backend::{
    DocumentBackend, KnowledgeBase, SqlBackend, format_hits, run_document_tool, run_sql_tool,
};

/// Document connector plus the scope the expert was given.
#[derive(Clone)]
pub struct DocumentTarget {
    /// Store connector.
    pub backend: Arc<dyn DocumentBackend>,
    /// Database named in the catalog.
    pub database: String,
    /// Collections the expert may query; empty means unrestricted.
    pub collections: Vec<String>,
}

/// Connectors bound to one session.
///
/// The relational and document slots are filled by the expert when it
/// resolves its source; the knowledge base is shared read-only.
#[derive(Clone)]
pub struct SessionBackends {
    sql: Option<Arc<dyn SqlBackend>>,
    documents: Option<DocumentTarget>,
    knowledge: Arc<dyn KnowledgeBase>,
    top_k: usize,
}

impl SessionBackends {
    /// Creates an empty session context over a knowledge base.
    #[must_use]
    pub fn new(knowledge: Arc<dyn KnowledgeBase>, top_k: usize) -> Self {
        Self {
            sql: None,
            documents: None,
            knowledge,
            top_k,
        }
    }

    /// Binds the relational connector.
    pub fn set_sql(&mut self, backend: Arc<dyn SqlBackend>) {
        self.sql = Some(backend);
    }

    /// Binds the document connector.
    pub fn set_documents(&mut self, target: DocumentTarget) {
        self.documents = Some(target);
    }

    /// The bound relational connector, if any.
    #[must_use]
    pub fn sql(&self) -> Option<Arc<dyn SqlBackend>> {
        self.sql.clone()
    }

    /// Returns `true` if a document connector is bound.
    #[must_use]
    pub const fn has_documents(&self) -> bool {
        self.documents.is_some()
    }
}

impl std::fmt::Debug for SessionBackends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBackends")
            .field("sql", &self.sql.is_some())
            .field("documents", &self.documents.as_ref().map(|d| &d.database))
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

/// Executes tool calls against a session's connectors.
pub struct ToolExecutor<'a> {
    backends: &'a SessionBackends,
    bound: Option<ToolName>,
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, args: &str) -> Result<T, String> {
    serde_json::from_str(args).map_err(|e| format!("Error: invalid arguments for {tool}: {e}"))
}

impl<'a> ToolExecutor<'a> {
    /// Creates an executor over the given session context.
    #[must_use]
    pub const fn new(backends: &'a SessionBackends) -> Self {
        Self {
            backends,
            bound: None,
        }
    }

    /// Restricts dispatch to the one tool the calling agent was given.
    #[must_use]
    pub const fn bound_to(mut self, tool: ToolName) -> Self {
        self.bound = Some(tool);
        self
    }

    /// Dispatches a tool call.
    ///
    /// Validates the raw argument size before parsing.
    #[must_use]
    pub fn execute(&self, call: &ToolCall) -> ToolResult {
        let result = if call.arguments.len() > MAX_ARGUMENT_BYTES {
            Err(format!(
                "Error: invalid arguments: {} bytes exceeds the {MAX_ARGUMENT_BYTES} byte limit",
                call.arguments.len()
            ))
        } else {
            match ToolName::parse(&call.name) {
                Some(tool) if self.bound.is_some_and(|bound| bound != tool) => Err(format!(
                    "Error: tool '{tool}' is not available here; use '{}'",
                    self.bound.map_or("", ToolName::as_str)
                )),
                Some(tool @ ToolName::SqlQuery) => self.sql_query(tool, &call.arguments),
                Some(tool @ ToolName::DocumentQuery) => self.document_query(tool, &call.arguments),
                Some(tool @ ToolName::KnowledgeSearch) => {
                    self.knowledge_search(tool, &call.arguments)
                }
                None => Err(format!("Error: unknown tool '{}'", call.name)),
            }
        };

        tracing::debug!(
            tool = %call.name,
            ok = result.is_ok(),
            "tool call dispatched"
        );

        let (content, is_error) = match result {
            Ok(content) => (content, false),
            Err(content) => (content, true),
        };
        ToolResult {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            content,
            is_error,
        }
    }

    fn sql_query(&self, tool: ToolName, args: &str) -> Result<String, String> {
        let args: SqlQueryArgs = parse_args(tool, args)?;
        let backend = self
            .backends
            .sql
            .as_deref()
            .ok_or_else(|| "Error: no relational connector is bound to this session".to_string())?;
        Ok(run_sql_tool(backend, &args.query))
    }

    fn document_query(&self, tool: ToolName, args: &str) -> Result<String, String> {
        let args: DocumentQueryArgs = parse_args(tool, args)?;
        let target = self
            .backends
            .documents
            .as_ref()
            .ok_or_else(|| "Error: no document connector is bound to this session".to_string())?;
        if args.database != target.database {
            return Ok(format!(
                "Error: database '{}' is not available. Use database '{}'",
                args.database, target.database
            ));
        }
        if !target.collections.is_empty() && !target.collections.contains(&args.collection) {
            return Ok(format!(
                "Error: collection '{}' is not available. Available collections: {}",
                args.collection,
                target.collections.join(", ")
            ));
        }
        Ok(run_document_tool(
            target.backend.as_ref(),
            &args.database,
            &args.collection,
            &args.query,
        ))
    }

    fn knowledge_search(&self, tool: ToolName, args: &str) -> Result<String, String> {
        let args: KnowledgeSearchArgs = parse_args(tool, args)?;
        match self
            .backends
            .knowledge
            .similarity_search(&args.query, self.backends.top_k)
        {
            Ok(hits) => Ok(format_hits(&hits)),
            Err(e) => Ok(format!("Error searching the knowledge base: {e}")),
        }
    }
}
