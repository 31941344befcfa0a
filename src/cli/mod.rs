//! CLI layer for source-router.
//!
//! Provides the command-line interface using clap, with commands for
//! asking questions, listing the catalog, and managing prompt templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
