//! Shared fixtures for integration tests: a scripted LLM provider and
//! counting backends.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};
use source_router::agent::message::{ChatRequest, ChatResponse, Role};
use source_router::agent::{AgentConfig, LlmProvider, Orchestrator, PromptSet, ToolCall};
use source_router::backend::{
    BackendFactory, DocumentBackend, InMemoryKnowledgeBase, KnowledgeBase, SqlBackend,
};
use source_router::backend::knowledge::KnowledgeDocument;
use source_router::catalog::{Catalog, DataSourceDescriptor, SqlConnection, SqlEngine};
use source_router::error::{AgentError, BackendError};

/// Which node issued a model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Caller {
    Router,
    SqlExpert,
    DocumentExpert,
    Evaluator,
    Semantic,
    Synthesizer,
}

/// Markers that open each node's system prompt.
pub fn test_prompts() -> PromptSet {
    PromptSet {
        router: "[router]".to_string(),
        sql_expert: "[sql_expert]".to_string(),
        document_expert: "[document_expert]".to_string(),
        evaluator: "[evaluator]".to_string(),
        semantic: "[semantic]".to_string(),
        synthesizer: "[synthesizer]".to_string(),
    }
}

fn caller_of(request: &ChatRequest) -> Caller {
    let system = request
        .messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    let markers = [
        ("[router]", Caller::Router),
        ("[sql_expert]", Caller::SqlExpert),
        ("[document_expert]", Caller::DocumentExpert),
        ("[evaluator]", Caller::Evaluator),
        ("[semantic]", Caller::Semantic),
        ("[synthesizer]", Caller::Synthesizer),
    ];
    markers
        .into_iter()
        .find(|(marker, _)| system.starts_with(marker))
        .map(|(_, caller)| caller)
        .unwrap_or_else(|| panic!("unrecognized system prompt: {system}"))
}

/// One scripted model reply.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Plain text.
    Text(String),
    /// A single tool call with JSON arguments.
    Tool { name: String, arguments: String },
    /// The last user message, verbatim.
    EchoUser,
    /// A transport failure.
    Fail,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }

    pub fn sql(query: &str) -> Self {
        Self::Tool {
            name: "sql_query".to_string(),
            arguments: serde_json::json!({ "query": query }).to_string(),
        }
    }

    pub fn documents(database: &str, collection: &str, filter: &str) -> Self {
        Self::Tool {
            name: "document_query".to_string(),
            arguments: serde_json::json!({
                "database": database,
                "collection": collection,
                "query": filter,
            })
            .to_string(),
        }
    }

    pub fn knowledge(query: &str) -> Self {
        Self::Tool {
            name: "knowledge_search".to_string(),
            arguments: serde_json::json!({ "query": query }).to_string(),
        }
    }
}

/// Provider that answers each node from a script.
///
/// Each caller has a queue of one-shot replies and a default used once the
/// queue is drained.
#[derive(Default)]
pub struct ScriptedProvider {
    queues: Mutex<HashMap<Caller, VecDeque<Reply>>>,
    defaults: Mutex<HashMap<Caller, Reply>>,
    requests: Mutex<Vec<(Caller, ChatRequest)>>,
    tool_ids: AtomicUsize,
}

impl ScriptedProvider {
    /// A provider where every node behaves for the happy path.
    pub fn new() -> Self {
        let provider = Self::default();
        provider
            .always(Caller::Router, Reply::text(r#"{"route":"relational","source":"sales_db"}"#))
            .always(Caller::SqlExpert, Reply::sql("SELECT product, SUM(amount) AS total FROM sales GROUP BY product"))
            .always(Caller::DocumentExpert, Reply::documents("logs", "events", "{}"))
            .always(Caller::Evaluator, Reply::text("satisfactory"))
            .always(Caller::Semantic, Reply::knowledge("product revenue"))
            .always(Caller::Synthesizer, Reply::EchoUser)
    }

    /// Sets the default reply for a caller.
    pub fn always(self, caller: Caller, reply: Reply) -> Self {
        self.defaults.lock().unwrap().insert(caller, reply);
        self
    }

    /// Queues a one-shot reply for a caller.
    pub fn then(self, caller: Caller, reply: Reply) -> Self {
        self.queues
            .lock()
            .unwrap()
            .entry(caller)
            .or_default()
            .push_back(reply);
        self
    }

    /// Number of calls made by a caller.
    pub fn calls(&self, caller: Caller) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == caller)
            .count()
    }

    /// Total number of model calls.
    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests issued by a caller, in order.
    pub fn requests(&self, caller: Caller) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == caller)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let caller = caller_of(request);
        self.requests.lock().unwrap().push((caller, request.clone()));

        let queued = self
            .queues
            .lock()
            .unwrap()
            .get_mut(&caller)
            .and_then(VecDeque::pop_front);
        let reply = queued
            .or_else(|| self.defaults.lock().unwrap().get(&caller).cloned())
            .unwrap_or_else(|| panic!("no reply scripted for {caller:?}"));

        match reply {
            Reply::Text(content) => Ok(ChatResponse {
                content,
                finish_reason: Some("stop".to_string()),
                ..ChatResponse::default()
            }),
            Reply::Tool { name, arguments } => {
                let n = self.tool_ids.fetch_add(1, Ordering::SeqCst);
                Ok(ChatResponse {
                    tool_calls: vec![ToolCall {
                        id: format!("call_{n}"),
                        name,
                        arguments,
                    }],
                    finish_reason: Some("tool_calls".to_string()),
                    ..ChatResponse::default()
                })
            }
            Reply::EchoUser => {
                let content = request
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                Ok(ChatResponse {
                    content,
                    ..ChatResponse::default()
                })
            }
            Reply::Fail => Err(AgentError::ApiRequest {
                message: "scripted failure".to_string(),
                status: Some(500),
            }),
        }
    }
}

/// Relational backend returning a fixed payload and counting executions.
pub struct FixedSql {
    pub payload: String,
    pub executed: AtomicUsize,
}

impl FixedSql {
    pub fn new(payload: &str) -> Arc<Self> {
        Arc::new(Self {
            payload: payload.to_string(),
            executed: AtomicUsize::new(0),
        })
    }

    pub fn executions(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

impl SqlBackend for FixedSql {
    fn engine(&self) -> SqlEngine {
        SqlEngine::Sqlite
    }

    fn schema(&self) -> Result<String, BackendError> {
        Ok("Table sales(product TEXT, amount REAL)".to_string())
    }

    fn execute(&self, _query: &str) -> String {
        self.executed.fetch_add(1, Ordering::SeqCst);
        self.payload.clone()
    }
}

/// Document backend returning a fixed payload.
pub struct FixedDocuments(pub String);

impl DocumentBackend for FixedDocuments {
    fn find(&self, _database: &str, _collection: &str, _query: &Map<String, Value>) -> String {
        self.0.clone()
    }
}

/// Factory handing out shared mock connectors and counting constructions.
pub struct MockFactory {
    pub sql: Arc<FixedSql>,
    pub documents: Arc<FixedDocuments>,
    pub built: AtomicUsize,
}

impl MockFactory {
    pub fn new(sql: Arc<FixedSql>) -> Arc<Self> {
        Arc::new(Self {
            sql,
            documents: Arc::new(FixedDocuments(r#"[{"level":"critical"}]"#.to_string())),
            built: AtomicUsize::new(0),
        })
    }
}

impl BackendFactory for MockFactory {
    fn sql(&self, _source: &DataSourceDescriptor) -> Result<Arc<dyn SqlBackend>, BackendError> {
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(self.sql.clone())
    }

    fn documents(
        &self,
        _source: &DataSourceDescriptor,
    ) -> Result<Arc<dyn DocumentBackend>, BackendError> {
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(self.documents.clone())
    }
}

/// Catalog with one relational source, `sales_db`.
pub fn sales_catalog() -> Catalog {
    Catalog::from_sources(vec![
        DataSourceDescriptor::sql(
            "sales_db",
            SqlConnection::sqlite("sales.db"),
            "Sales figures per product",
        )
        .with_schema("sales(product, amount)"),
    ])
    .unwrap()
}

/// Knowledge base with a single revenue document.
pub fn revenue_knowledge() -> Arc<dyn KnowledgeBase> {
    Arc::new(InMemoryKnowledgeBase::from_documents(vec![KnowledgeDocument {
        content: "Product A revenue guidance for the fiscal year".to_string(),
        metadata: serde_json::json!({ "source": "handbook.md" }),
    }]))
}

/// Configuration with a test key and the given retry budget.
pub fn config(max_retries: u32) -> AgentConfig {
    AgentConfig::builder()
        .api_key("test-key")
        .max_retries(max_retries)
        .build()
        .unwrap()
}

/// Builds an orchestrator over mocks.
pub fn orchestrator(
    provider: Arc<ScriptedProvider>,
    catalog: Catalog,
    factory: Arc<MockFactory>,
    max_retries: u32,
) -> Orchestrator {
    Orchestrator::new(
        provider,
        config(max_retries),
        Arc::new(catalog),
        factory,
        revenue_knowledge(),
    )
    .with_prompts(test_prompts())
}
