//! Data-source catalog.
//!
//! Loaded once at startup from a YAML file keyed by backend kind and
//! treated as read-only afterwards. Sessions share it through an `Arc`.
//!
//! ```yaml
//! sql:
//!   - name: sales_db
//!     engine: sqlite
//!     path: data/sales.db
//!     description: Sales transactions
//! mongodb:
//!   - name: app_logs
//!     database: logs
//!     collections: [events]
//!     path: data/logs
//!     description: Application logs
//! vector:
//!   path: data/knowledge.json
//! ```

use std::collections::HashSet;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Kind of backend a data source lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQL database.
    Relational,
    /// Document database.
    Document,
    /// Vector knowledge base.
    Vector,
}

impl BackendKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Document => "document",
            Self::Vector => "vector",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL dialect of a relational source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlEngine {
    /// `SQLite` file database.
    Sqlite,
    /// `PostgreSQL` server.
    #[serde(alias = "postgresql")]
    Postgres,
    /// `MySQL` server.
    Mysql,
}

impl SqlEngine {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }
}

/// Connection parameters for a relational source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConnection {
    /// SQL dialect.
    pub engine: SqlEngine,
    /// Database file (`SQLite` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Server host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Server port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Database name on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Login user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Login password.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

/// Connection parameters for a document source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConnection {
    /// Database name.
    pub database: String,
    /// Collections the expert may query.
    #[serde(default)]
    pub collections: Vec<String>,
    /// Root directory of the JSON document store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Server URI, for drivers that connect over the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl SqlConnection {
    /// Connection to a local `SQLite` file.
    #[must_use]
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            engine: SqlEngine::Sqlite,
            path: Some(path.into()),
            host: None,
            port: None,
            database: None,
            username: None,
            password: None,
        }
    }
}

impl DocumentConnection {
    /// Connection to a database with no collection restriction.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Vec::new(),
            path: None,
            uri: None,
        }
    }

    /// Sets the store root directory.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Restricts the collections the expert may query.
    #[must_use]
    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = collections.into_iter().map(Into::into).collect();
        self
    }
}

/// Backend-specific connection parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ConnectionSpec {
    /// Relational source.
    Sql(SqlConnection),
    /// Document source.
    Document(DocumentConnection),
}

/// One entry of the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct DataSourceDescriptor {
    /// Unique source name.
    pub name: String,
    /// Backend kind.
    pub kind: BackendKind,
    /// Human-readable description used by the router.
    pub description: String,
    /// Schema text handed to the query expert. Introspected when absent.
    pub schema: Option<String>,
    /// Connection parameters.
    pub connection: ConnectionSpec,
}

impl DataSourceDescriptor {
    /// Creates a relational source.
    #[must_use]
    pub fn sql(
        name: impl Into<String>,
        connection: SqlConnection,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: BackendKind::Relational,
            description: description.into(),
            schema: None,
            connection: ConnectionSpec::Sql(connection),
        }
    }

    /// Creates a document source.
    #[must_use]
    pub fn document(
        name: impl Into<String>,
        connection: DocumentConnection,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: BackendKind::Document,
            description: description.into(),
            schema: None,
            connection: ConnectionSpec::Document(connection),
        }
    }

    /// Sets the schema text.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Location of the vector knowledge base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// JSON file with `{content, metadata}` documents.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Deserialize)]
struct RawSqlSource {
    name: String,
    #[serde(alias = "type")]
    engine: SqlEngine,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    schema: Option<String>,
    #[serde(flatten)]
    connection: RawSqlConnection,
}

#[derive(Deserialize)]
struct RawSqlConnection {
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Deserialize)]
struct RawDocumentSource {
    name: String,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    collections: Vec<String>,
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    schema: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawCatalog {
    #[serde(default)]
    sql: Vec<RawSqlSource>,
    #[serde(default, alias = "document", alias = "nosql")]
    mongodb: Vec<RawDocumentSource>,
    #[serde(default)]
    vector: Option<KnowledgeBaseConfig>,
}

/// The process-wide, read-only catalog of data sources.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sources: Vec<DataSourceDescriptor>,
    knowledge_base: KnowledgeBaseConfig,
}

impl Catalog {
    /// Builds a catalog from descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateSource`] if two sources share a name.
    pub fn from_sources(sources: Vec<DataSourceDescriptor>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.name.as_str()) {
                return Err(CatalogError::DuplicateSource {
                    name: source.name.clone(),
                });
            }
        }
        Ok(Self {
            sources,
            knowledge_base: KnowledgeBaseConfig::default(),
        })
    }

    /// Sets the knowledge-base location.
    #[must_use]
    pub fn with_knowledge_base(mut self, config: KnowledgeBaseConfig) -> Self {
        self.knowledge_base = config;
        self
    }

    /// Loads a catalog from a YAML file.
    ///
    /// Relative `path` entries are resolved against the catalog's directory.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut catalog = Self::from_yaml_str(&text)?;
        if let Some(base) = path.parent() {
            catalog.resolve_paths(base);
        }
        Ok(catalog)
    }

    /// Parses a catalog from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let raw: Option<RawCatalog> =
            serde_yaml::from_str(text).map_err(|e| CatalogError::Parse {
                message: e.to_string(),
            })?;
        let raw = raw.unwrap_or_default();

        let mut sources = Vec::with_capacity(raw.sql.len() + raw.mongodb.len());
        for s in raw.sql {
            let description = s.description.unwrap_or_else(|| "No description".to_string());
            sources.push(DataSourceDescriptor {
                name: s.name,
                kind: BackendKind::Relational,
                description,
                schema: s.schema,
                connection: ConnectionSpec::Sql(SqlConnection {
                    engine: s.engine,
                    path: s.connection.path,
                    host: s.connection.host,
                    port: s.connection.port,
                    database: s.connection.database,
                    username: s.connection.username,
                    password: s.connection.password,
                }),
            });
        }
        for d in raw.mongodb {
            let database = d.database.ok_or_else(|| CatalogError::MissingField {
                source_name: d.name.clone(),
                field: "database",
            })?;
            sources.push(DataSourceDescriptor {
                name: d.name,
                kind: BackendKind::Document,
                description: d.description.unwrap_or_else(|| "No description".to_string()),
                schema: d.schema,
                connection: ConnectionSpec::Document(DocumentConnection {
                    database,
                    collections: d.collections,
                    path: d.path,
                    uri: d.uri,
                }),
            });
        }

        Ok(Self::from_sources(sources)?.with_knowledge_base(raw.vector.unwrap_or_default()))
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut Option<PathBuf>| {
            if let Some(path) = p
                && path.is_relative()
            {
                *path = base.join(&*path);
            }
        };
        for source in &mut self.sources {
            match &mut source.connection {
                ConnectionSpec::Sql(c) => resolve(&mut c.path),
                ConnectionSpec::Document(c) => resolve(&mut c.path),
            }
        }
        resolve(&mut self.knowledge_base.path);
    }

    /// All sources, in catalog order.
    #[must_use]
    pub fn sources(&self) -> &[DataSourceDescriptor] {
        &self.sources
    }

    /// Knowledge-base location.
    #[must_use]
    pub const fn knowledge_base(&self) -> &KnowledgeBaseConfig {
        &self.knowledge_base
    }

    /// Returns `true` if there are no routable sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Finds a source by name within one backend kind.
    #[must_use]
    pub fn get_source_config(&self, name: &str, kind: BackendKind) -> Option<&DataSourceDescriptor> {
        self.sources
            .iter()
            .find(|s| s.kind == kind && s.name == name)
    }

    /// One line per source: `- name (kind): description`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for s in &self.sources {
            let _ = writeln!(out, "- {} ({}): {}", s.name, s.kind, s.description);
        }
        out
    }
}
