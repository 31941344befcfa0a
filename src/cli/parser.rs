//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default catalog file, relative to the working directory.
pub const DEFAULT_CATALOG: &str = "source-router.yaml";

/// source-router: answer questions by routing them to the right data source.
///
/// Picks a relational or document source from a catalog, lets an LLM write
/// the query, judges the result, and falls back to a knowledge base when
/// the source cannot answer.
#[derive(Parser, Debug)]
#[command(name = "source-router")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the data-source catalog (YAML).
    ///
    /// Defaults to `source-router.yaml` in the current directory.
    #[arg(short, long, env = "SOURCE_ROUTER_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question from the catalog's sources.
    #[command(after_help = r#"Examples:
  source-router ask "How much revenue came from Product A?"
  source-router --catalog ./catalog.yaml ask "Which events were critical?"
  source-router --format json ask "Top customers" | jq '.trace'
"#)]
    Ask {
        /// The question to answer.
        question: String,

        /// Retry budget per session (overrides `SOURCE_ROUTER_MAX_RETRIES`).
        #[arg(long)]
        max_retries: Option<u32>,

        /// Number of knowledge-base documents per semantic search.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Model for every agent (overrides the per-agent env vars).
        #[arg(short, long)]
        model: Option<String>,

        /// Directory containing custom prompt templates.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// List the catalog's data sources.
    Sources,

    /// Write default prompt templates to a directory for customization.
    #[command(after_help = r#"Examples:
  source-router init-prompts                  # ~/.config/source-router/prompts/
  source-router init-prompts --dir ./prompts  # custom directory
"#)]
    InitPrompts {
        /// Target directory (defaults to `~/.config/source-router/prompts/`).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the catalog path, using the default if not specified.
    #[must_use]
    pub fn get_catalog_path(&self) -> PathBuf {
        self.catalog
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "source-router",
            "--catalog",
            "c.yaml",
            "--format",
            "json",
            "ask",
            "How many orders?",
            "--max-retries",
            "2",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.get_catalog_path(), PathBuf::from("c.yaml"));
        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Ask {
                question,
                max_retries,
                ..
            } => {
                assert_eq!(question, "How many orders?");
                assert_eq!(max_retries, Some(2));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_default_catalog_path() {
        let cli = Cli::try_parse_from(["source-router", "sources"])
            .unwrap_or_else(|_| unreachable!());
        if cli.catalog.is_none() {
            assert_eq!(cli.get_catalog_path(), PathBuf::from(DEFAULT_CATALOG));
        }
    }
}
