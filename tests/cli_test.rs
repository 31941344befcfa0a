//! CLI smoke tests for commands that need no model access.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("source-router").unwrap();
    cmd.env_remove("SOURCE_ROUTER_CATALOG")
        .env_remove("OPENAI_API_KEY")
        .env_remove("SOURCE_ROUTER_API_KEY");
    cmd
}

fn write_catalog(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("catalog.yaml");
    std::fs::write(
        &path,
        "sql:\n  - name: sales_db\n    engine: sqlite\n    path: sales.db\n    description: Sales per product\n\
         mongodb:\n  - name: app_logs\n    database: logs\n    description: Application events\n",
    )
    .unwrap();
    path
}

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("sources"))
        .stdout(predicate::str::contains("init-prompts"));
}

#[test]
fn test_sources_text() {
    let dir = TempDir::new().unwrap();
    let catalog = write_catalog(&dir);
    cmd()
        .arg("--catalog")
        .arg(&catalog)
        .arg("sources")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 data source(s)"))
        .stdout(predicate::str::contains("sales_db"))
        .stdout(predicate::str::contains("app_logs"));
}

#[test]
fn test_sources_json_from_env() {
    let dir = TempDir::new().unwrap();
    let catalog = write_catalog(&dir);
    let output = cmd()
        .env("SOURCE_ROUTER_CATALOG", &catalog)
        .args(["--format", "json", "sources"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["name"], "sales_db");
    assert_eq!(value[1]["kind"], "document");
}

#[test]
fn test_missing_catalog_fails() {
    let dir = TempDir::new().unwrap();
    cmd()
        .arg("--catalog")
        .arg(dir.path().join("absent.yaml"))
        .arg("sources")
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.yaml"));
}

#[test]
fn test_ask_without_api_key_fails() {
    let dir = TempDir::new().unwrap();
    let catalog = write_catalog(&dir);
    cmd()
        .arg("--catalog")
        .arg(&catalog)
        .args(["ask", "How much revenue came from Product A?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn test_init_prompts() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("prompts");
    cmd()
        .arg("init-prompts")
        .arg("--dir")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 6 prompt template(s)"));
    assert!(target.join("router.md").exists());
    assert!(target.join("synthesizer.md").exists());

    cmd()
        .arg("init-prompts")
        .arg("--dir")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("already exist"));
}
