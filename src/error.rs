//! Error types for source-router.
//!
//! Each layer owns a focused error enum. Only [`SessionError`] escapes the
//! routing state machine; everything recoverable is folded into the
//! conversation as a note or tool result instead.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for library consumers and the CLI.
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog loading or validation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A backend driver could not be constructed or loaded.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Agent configuration or model access failed.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// A session failed fatally.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A CLI command failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Errors at the language-model boundary.
#[derive(Error, Debug)]
pub enum AgentError {
    /// No API key was configured.
    #[error("no API key configured: set OPENAI_API_KEY or SOURCE_ROUTER_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is not known.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name from configuration.
        name: String,
    },

    /// The provider request failed.
    #[error("LLM API request failed: {message}")]
    ApiRequest {
        /// Error description from the transport.
        message: String,
        /// HTTP status code, when known.
        status: Option<u16>,
    },

    /// The model answered with something that could not be parsed.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// Raw model output.
        content: String,
    },

    /// The model returned neither text nor a tool call.
    #[error("{agent} received an empty model response")]
    EmptyResponse {
        /// Agent that issued the request.
        agent: &'static str,
    },
}

/// Errors loading or validating the data-source catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Io {
        /// Catalog path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The catalog file is not valid YAML for the expected shape.
    #[error("failed to parse catalog: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },

    /// Two sources share a name.
    #[error("duplicate data source name: {name}")]
    DuplicateSource {
        /// Offending name.
        name: String,
    },

    /// A source is missing a field required by its backend.
    #[error("data source '{source_name}' is missing required field '{field}'")]
    MissingField {
        /// Source name.
        source_name: String,
        /// Missing field.
        field: &'static str,
    },
}

/// Errors constructing or loading a backend driver.
#[derive(Error, Debug)]
pub enum BackendError {
    /// No driver is available for the configured engine.
    #[error("no connector available for '{source_name}' (engine: {engine})")]
    UnsupportedEngine {
        /// Source name.
        source_name: String,
        /// Engine from the catalog.
        engine: String,
    },

    /// The driver could not open its connection.
    #[error("could not connect to '{source_name}': {message}")]
    Connection {
        /// Source name.
        source_name: String,
        /// Driver message.
        message: String,
    },

    /// A file-backed store failed to load.
    #[error("failed to load {path}: {message}")]
    Load {
        /// File path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

/// Fatal session errors.
///
/// These indicate a broken deployment or an unusable model rather than a
/// bad query attempt, so they are never retried.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The catalog has no relational or document sources to route to.
    #[error("data source catalog is empty")]
    EmptyCatalog,

    /// The question was empty or whitespace.
    #[error("no user question was provided")]
    MissingQuestion,

    /// The router could not produce a routing decision.
    #[error("router failed for query '{query}': {source}")]
    Router {
        /// Question prefix, for diagnostics.
        query: String,
        /// Underlying agent error.
        source: AgentError,
    },

    /// The final answer could not be produced.
    #[error("response synthesis failed: {0}")]
    Synthesis(#[source] AgentError),
}

/// CLI command errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command execution failed.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output serialization failed.
    #[error("failed to render output: {0}")]
    Output(String),
}
