//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

#![allow(clippy::format_push_string)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::client::create_provider;
use crate::agent::config::AgentConfig;
use crate::agent::orchestrator::Orchestrator;
use crate::agent::prompt::PromptSet;
use crate::backend::{DefaultBackendFactory, InMemoryKnowledgeBase, KnowledgeBase};
use crate::catalog::Catalog;
use crate::cli::output::{OutputFormat, format_outcome, format_sources};
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Result};

/// Parameters for the ask command.
#[derive(Debug, Clone)]
pub struct AskParams<'a> {
    /// The question to answer.
    pub question: &'a str,
    /// Retry budget override.
    pub max_retries: Option<u32>,
    /// Knowledge-search depth override.
    pub top_k: Option<usize>,
    /// Model override for every agent.
    pub model: Option<&'a str>,
    /// Custom prompt directory.
    pub prompt_dir: Option<&'a Path>,
    /// Append route and trace details to text output.
    pub verbose: bool,
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let catalog_path = cli.get_catalog_path();

    match &cli.command {
        Commands::Ask {
            question,
            max_retries,
            top_k,
            model,
            prompt_dir,
        } => {
            let params = AskParams {
                question,
                max_retries: *max_retries,
                top_k: *top_k,
                model: model.as_deref(),
                prompt_dir: prompt_dir.as_deref(),
                verbose: cli.verbose,
            };
            cmd_ask(&catalog_path, &params, format)
        }
        Commands::Sources => cmd_sources(&catalog_path, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Loads the knowledge base named by the catalog, or an empty one.
fn open_knowledge_base(catalog: &Catalog) -> Result<InMemoryKnowledgeBase> {
    match &catalog.knowledge_base().path {
        Some(path) => Ok(InMemoryKnowledgeBase::load(path)?),
        None => {
            tracing::debug!("no knowledge base configured; semantic fallback will find nothing");
            Ok(InMemoryKnowledgeBase::default())
        }
    }
}

fn cmd_ask(catalog_path: &Path, params: &AskParams<'_>, format: OutputFormat) -> Result<String> {
    let catalog = Catalog::load(catalog_path)?;
    let knowledge: Arc<dyn KnowledgeBase> = Arc::new(open_knowledge_base(&catalog)?);

    // Build agent configuration from env + CLI overrides
    let mut builder = AgentConfig::builder().from_env();
    if let Some(n) = params.max_retries {
        builder = builder.max_retries(n);
    }
    if let Some(k) = params.top_k {
        builder = builder.semantic_top_k(k);
    }
    if let Some(model) = params.model {
        builder = builder
            .router_model(model)
            .expert_model(model)
            .evaluator_model(model)
            .synthesizer_model(model);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }

    let config = builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}"))
    })?;

    let provider = create_provider(&config)
        .map_err(|e| CommandError::ExecutionFailed(format!("Provider creation failed: {e}")))?;

    let orchestrator = Orchestrator::new(
        provider,
        config,
        Arc::new(catalog),
        Arc::new(DefaultBackendFactory),
        knowledge,
    );

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    let outcome = rt
        .block_on(orchestrator.answer(params.question))
        .map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;

    Ok(format_outcome(&outcome, format, params.verbose)?)
}

fn cmd_sources(catalog_path: &Path, format: OutputFormat) -> Result<String> {
    let catalog = Catalog::load(catalog_path)?;
    Ok(format_sources(catalog.sources(), format)?)
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str(&format!(
                    "  {}\n",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                ));
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect::<Vec<_>>(),
                "count": written.len()
            });
            serde_json::to_string_pretty(&json).map_err(|e| {
                CommandError::Output(format!("JSON serialization failed: {e}")).into()
            })
        }
    }
}
