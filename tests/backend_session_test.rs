//! Sessions over the real connectors: a SQLite file, a JSON document
//! store, and a knowledge base loaded from disk, all wired through a
//! catalog file.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{Caller, Reply, ScriptedProvider, config, test_prompts};
use rusqlite::Connection;
use source_router::agent::Orchestrator;
use source_router::backend::{DefaultBackendFactory, InMemoryKnowledgeBase};
use source_router::catalog::Catalog;
use source_router::{EvaluationLabel, Node};
use tempfile::TempDir;

fn write_fixtures(dir: &Path) -> std::path::PathBuf {
    let conn = Connection::open(dir.join("sales.db")).unwrap();
    conn.execute_batch(
        "CREATE TABLE sales (id INTEGER PRIMARY KEY, product TEXT, amount REAL);
         INSERT INTO sales (product, amount) VALUES
             ('Product A', 1000.0), ('Product A', 250.0), ('Product B', 90.0);",
    )
    .unwrap();
    drop(conn);

    std::fs::create_dir_all(dir.join("docs/logs")).unwrap();
    std::fs::write(
        dir.join("docs/logs/events.json"),
        r#"[
            {"level": "critical", "message": "disk full"},
            {"level": "info", "message": "started"}
        ]"#,
    )
    .unwrap();

    std::fs::write(
        dir.join("kb.json"),
        r#"[{"content": "Refunds are processed within 14 days.", "metadata": {"source": "policy.md"}}]"#,
    )
    .unwrap();

    let catalog = dir.join("catalog.yaml");
    std::fs::write(
        &catalog,
        "sql:\n\
         \x20 - name: sales_db\n\
         \x20   engine: sqlite\n\
         \x20   path: sales.db\n\
         \x20   description: Sales per product\n\
         mongodb:\n\
         \x20 - name: app_logs\n\
         \x20   database: logs\n\
         \x20   collections: [events]\n\
         \x20   path: docs\n\
         \x20   description: Application events\n\
         vector:\n\
         \x20 path: kb.json\n",
    )
    .unwrap();
    catalog
}

fn orchestrator(dir: &Path, provider: Arc<ScriptedProvider>, max_retries: u32) -> Orchestrator {
    let catalog = Catalog::load(&write_fixtures(dir)).unwrap();
    let kb_path = catalog.knowledge_base().path.clone().unwrap();
    let knowledge = InMemoryKnowledgeBase::load(&kb_path).unwrap();
    Orchestrator::new(
        provider,
        config(max_retries),
        Arc::new(catalog),
        Arc::new(DefaultBackendFactory),
        Arc::new(knowledge),
    )
    .with_prompts(test_prompts())
}

#[tokio::test]
async fn test_sqlite_session_answers_from_rows() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new().always(
        Caller::SqlExpert,
        Reply::sql(
            "SELECT product, SUM(amount) AS total FROM sales \
             WHERE product = 'Product A' GROUP BY product",
        ),
    ));
    let orch = orchestrator(dir.path(), provider.clone(), 4);

    let outcome = orch
        .answer("How much revenue came from Product A?")
        .await
        .unwrap();

    assert_eq!(outcome.state.retry_count(), 1);
    assert!(outcome.answer.as_deref().unwrap().contains("1250"));

    // The expert saw the introspected schema.
    let instructions = &provider.requests(Caller::SqlExpert)[0].messages[0].content;
    assert!(instructions.contains("Table sales("));
    assert!(instructions.contains("SQLITE"));
}

#[tokio::test]
async fn test_sqlite_no_rows_falls_back_to_knowledge_base() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new().always(
        Caller::SqlExpert,
        Reply::sql("SELECT * FROM sales WHERE product = 'Refund'"),
    ).always(Caller::Semantic, Reply::knowledge("refunds processed")));
    let orch = orchestrator(dir.path(), provider.clone(), 2);

    let outcome = orch.answer("How long do refunds take?").await.unwrap();

    assert_eq!(outcome.visits(Node::SqlExpert), 2);
    assert_eq!(outcome.visits(Node::Evaluator(EvaluationLabel::Error)), 2);
    assert_eq!(outcome.visits(Node::SemanticExpert), 1);
    let answer = outcome.answer.as_deref().unwrap();
    assert!(answer.contains("14 days"));
    assert!(answer.contains("policy.md"));
}

#[tokio::test]
async fn test_json_store_session() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new()
            .always(
                Caller::Router,
                Reply::text(r#"{"route":"document","source":"app_logs"}"#),
            )
            .always(
                Caller::DocumentExpert,
                Reply::documents("logs", "events", r#"{"level": "critical"}"#),
            ),
    );
    let orch = orchestrator(dir.path(), provider.clone(), 4);

    let outcome = orch.answer("Which events were critical?").await.unwrap();

    let answer = outcome.answer.as_deref().unwrap();
    assert!(answer.contains("disk full"));
    assert!(!answer.contains("started"));
    assert_eq!(outcome.sources_consulted, vec!["Database: app_logs".to_string()]);
}
