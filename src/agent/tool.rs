//! Tool type definitions for function-calling.
//!
//! Each backend kind exposes exactly one tool. Experts are bound to the
//! single tool of their backend; the semantic expert gets the knowledge
//! search tool.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::catalog::BackendKind;

/// Largest accepted argument payload, in bytes.
pub const MAX_ARGUMENT_BYTES: usize = 100_000;

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match dispatch table in executor).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Name of the tool that ran.
    pub tool_name: String,
    /// Result content (rows, a no-results marker, or an error description).
    pub content: String,
    /// Whether the call never reached a backend (unknown tool, bad arguments).
    pub is_error: bool,
}

/// The tools known to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Relational query tool.
    SqlQuery,
    /// Document query tool.
    DocumentQuery,
    /// Vector similarity search tool.
    KnowledgeSearch,
}

impl ToolName {
    /// Wire name of the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SqlQuery => "sql_query",
            Self::DocumentQuery => "document_query",
            Self::KnowledgeSearch => "knowledge_search",
        }
    }

    /// Looks up a tool by its wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sql_query" => Some(Self::SqlQuery),
            "document_query" => Some(Self::DocumentQuery),
            "knowledge_search" => Some(Self::KnowledgeSearch),
            _ => None,
        }
    }

    /// Backend kind the tool queries.
    #[must_use]
    pub const fn backend_kind(self) -> BackendKind {
        match self {
            Self::SqlQuery => BackendKind::Relational,
            Self::DocumentQuery => BackendKind::Document,
            Self::KnowledgeSearch => BackendKind::Vector,
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of `sql_query`.
#[derive(Debug, Clone, Deserialize)]
pub struct SqlQueryArgs {
    /// SQL text.
    pub query: String,
}

/// Arguments of `document_query`.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentQueryArgs {
    /// Database name.
    pub database: String,
    /// Collection name.
    pub collection: String,
    /// Filter document as a JSON string.
    #[serde(default)]
    pub query: String,
}

/// Arguments of `knowledge_search`.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeSearchArgs {
    /// Free-text search query.
    pub query: String,
}

/// A set of tool definitions scoped to an agent role.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Consumes the set, returning its definitions.
    #[must_use]
    pub fn into_definitions(self) -> Vec<ToolDefinition> {
        self.definitions
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Tool set of the relational expert.
    #[must_use]
    pub fn sql_tools() -> Self {
        Self {
            definitions: vec![def_sql_query()],
        }
    }

    /// Tool set of the document expert.
    #[must_use]
    pub fn document_tools() -> Self {
        Self {
            definitions: vec![def_document_query()],
        }
    }

    /// Tool set of the semantic fallback expert.
    #[must_use]
    pub fn knowledge_tools() -> Self {
        Self {
            definitions: vec![def_knowledge_search()],
        }
    }

    /// Empty tool set (no tools available).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

fn def_sql_query() -> ToolDefinition {
    ToolDefinition {
        name: ToolName::SqlQuery.as_str().to_string(),
        description: "Execute a read-only SQL query against the selected database and return \
                      the rows as JSON. Only a single SELECT (or WITH ... SELECT) statement \
                      is allowed."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The SQL query to execute."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

fn def_document_query() -> ToolDefinition {
    ToolDefinition {
        name: ToolName::DocumentQuery.as_str().to_string(),
        description: "Find documents in a collection of the selected document database using \
                      a filter document given as a JSON string."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "database": {
                    "type": "string",
                    "description": "Name of the database."
                },
                "collection": {
                    "type": "string",
                    "description": "Name of the collection."
                },
                "query": {
                    "type": "string",
                    "description": "Filter document as a JSON string, e.g. '{\"level\": \"critical\"}'."
                }
            },
            "required": ["database", "collection", "query"],
            "additionalProperties": false
        }),
    }
}

fn def_knowledge_search() -> ToolDefinition {
    ToolDefinition {
        name: ToolName::KnowledgeSearch.as_str().to_string(),
        description: "Search the knowledge base for the documents most similar to a query."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query text."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}
