//! Per-session connector construction.
//!
//! Experts ask the factory for a connector each time they resolve their
//! source, and keep it in the session's own context. Nothing here is
//! shared mutable state, so concurrent sessions cannot see each other's
//! connectors.

use std::sync::Arc;

use super::{DocumentBackend, JsonDocumentStore, SqlBackend, SqliteBackend};
use crate::catalog::{ConnectionSpec, DataSourceDescriptor, SqlEngine};
use crate::error::BackendError;

/// Builds backend connectors from catalog descriptors.
pub trait BackendFactory: Send + Sync {
    /// Connector for a relational source.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if no driver supports the source or the
    /// connection cannot be opened.
    fn sql(&self, source: &DataSourceDescriptor) -> Result<Arc<dyn SqlBackend>, BackendError>;

    /// Connector for a document source.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if no driver supports the source or the
    /// store cannot be opened.
    fn documents(
        &self,
        source: &DataSourceDescriptor,
    ) -> Result<Arc<dyn DocumentBackend>, BackendError>;
}

/// Factory for the bundled drivers: `SQLite` files and JSON document stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn sql(&self, source: &DataSourceDescriptor) -> Result<Arc<dyn SqlBackend>, BackendError> {
        let ConnectionSpec::Sql(conn) = &source.connection else {
            return Err(BackendError::UnsupportedEngine {
                source_name: source.name.clone(),
                engine: "document".to_string(),
            });
        };
        match (conn.engine, conn.path.as_deref()) {
            (SqlEngine::Sqlite, Some(path)) => {
                Ok(Arc::new(SqliteBackend::open(&source.name, path)?))
            }
            (SqlEngine::Sqlite, None) => Err(BackendError::Connection {
                source_name: source.name.clone(),
                message: "sqlite source has no path".to_string(),
            }),
            (engine, _) => Err(BackendError::UnsupportedEngine {
                source_name: source.name.clone(),
                engine: engine.as_str().to_string(),
            }),
        }
    }

    fn documents(
        &self,
        source: &DataSourceDescriptor,
    ) -> Result<Arc<dyn DocumentBackend>, BackendError> {
        match &source.connection {
            ConnectionSpec::Document(conn) => match conn.path.as_deref() {
                Some(path) => Ok(Arc::new(JsonDocumentStore::open(&source.name, path)?)),
                None => Err(BackendError::UnsupportedEngine {
                    source_name: source.name.clone(),
                    engine: "mongodb".to_string(),
                }),
            },
            ConnectionSpec::Sql(conn) => Err(BackendError::UnsupportedEngine {
                source_name: source.name.clone(),
                engine: conn.engine.as_str().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DocumentConnection, SqlConnection};

    fn sql_conn(engine: SqlEngine, path: Option<std::path::PathBuf>) -> SqlConnection {
        SqlConnection {
            engine,
            path,
            host: None,
            port: None,
            database: None,
            username: None,
            password: None,
        }
    }

    #[test]
    fn test_server_engines_unsupported() {
        let source = DataSourceDescriptor::sql("pg", sql_conn(SqlEngine::Postgres, None), "x");
        assert!(matches!(
            DefaultBackendFactory.sql(&source),
            Err(BackendError::UnsupportedEngine { engine, .. }) if engine == "postgres"
        ));
    }

    #[test]
    fn test_sqlite_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let missing = DataSourceDescriptor::sql(
            "ghost",
            sql_conn(SqlEngine::Sqlite, Some(dir.path().join("nope.db"))),
            "x",
        );
        assert!(matches!(
            DefaultBackendFactory.sql(&missing),
            Err(BackendError::Connection { .. })
        ));

        let path = dir.path().join("ok.db");
        rusqlite::Connection::open(&path)
            .and_then(|c| c.execute_batch("CREATE TABLE t (x INTEGER);"))
            .unwrap_or_else(|_| unreachable!());
        let ok = DataSourceDescriptor::sql("ok", sql_conn(SqlEngine::Sqlite, Some(path)), "x");
        assert!(DefaultBackendFactory.sql(&ok).is_ok());
    }

    #[test]
    fn test_document_store_without_path_is_unsupported() {
        let source = DataSourceDescriptor::document(
            "logs",
            DocumentConnection {
                database: "logs".to_string(),
                collections: vec!["events".to_string()],
                path: None,
                uri: Some("mongodb://localhost:27017".to_string()),
            },
            "x",
        );
        assert!(matches!(
            DefaultBackendFactory.documents(&source),
            Err(BackendError::UnsupportedEngine { engine, .. }) if engine == "mongodb"
        ));
    }
}
