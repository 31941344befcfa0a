//! Backend drivers behind the tool boundary.
//!
//! The routing core never talks to a database directly. Each backend kind
//! is a `Send + Sync` trait object returning plain strings, so every outcome
//! (rows, a "no results" marker, a driver error, a guard rejection) flows
//! back into the conversation as a tool message.

pub mod documents;
pub mod factory;
pub mod guard;
pub mod knowledge;
pub mod sqlite;

use serde_json::Value;

use crate::catalog::SqlEngine;
use crate::error::BackendError;

pub use documents::JsonDocumentStore;
pub use factory::{BackendFactory, DefaultBackendFactory};
pub use guard::{Rejection, check_document_filter, check_sql};
pub use knowledge::{InMemoryKnowledgeBase, KnowledgeHit, format_hits};
pub use sqlite::SqliteBackend;

/// A relational database reachable by SQL.
pub trait SqlBackend: Send + Sync {
    /// SQL dialect, shown to the expert model.
    fn engine(&self) -> SqlEngine;

    /// Introspected schema description.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the schema cannot be read.
    fn schema(&self) -> Result<String, BackendError>;

    /// Runs a query that already passed the read-only guard.
    fn execute(&self, query: &str) -> String;
}

/// A document database queried with filter documents.
pub trait DocumentBackend: Send + Sync {
    /// Runs a `find` with a filter that already passed the guard.
    fn find(&self, database: &str, collection: &str, filter: &serde_json::Map<String, Value>)
    -> String;
}

/// A vector knowledge base.
pub trait KnowledgeBase: Send + Sync {
    /// Returns up to `k` documents ranked by similarity to `query`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the index cannot be searched.
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<KnowledgeHit>, BackendError>;
}

/// Guards and runs a model-generated SQL query.
pub fn run_sql_tool(backend: &dyn SqlBackend, query: &str) -> String {
    if let Err(rejection) = check_sql(query) {
        tracing::warn!(%rejection, "rejected SQL query");
        return rejection.to_string();
    }
    backend.execute(query)
}

/// Parses, guards, and runs a model-generated document filter.
///
/// An empty query string matches every document.
pub fn run_document_tool(
    backend: &dyn DocumentBackend,
    database: &str,
    collection: &str,
    query: &str,
) -> String {
    let parsed = if query.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        match serde_json::from_str::<Value>(query) {
            Ok(value) => value,
            Err(e) => return format!("Error: query is not valid JSON: {e}"),
        }
    };
    let Value::Object(filter) = parsed else {
        return "Error: query must be a JSON object".to_string();
    };
    if let Err(rejection) = check_document_filter(&Value::Object(filter.clone())) {
        tracing::warn!(%rejection, "rejected document filter");
        return rejection.to_string();
    }
    backend.find(database, collection, &filter)
}
