//! Output formatting for CLI commands.

#![allow(clippy::format_push_string)]

use serde::Serialize;

use crate::agent::SessionOutcome;
use crate::catalog::DataSourceDescriptor;
use crate::error::CommandError;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

#[derive(Serialize)]
struct SourceRow<'a> {
    name: &'a str,
    kind: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct AnswerView<'a> {
    question: &'a str,
    answer: Option<&'a str>,
    direct_reply: Option<&'a str>,
    selected_source: Option<&'a str>,
    sources_consulted: &'a [String],
    retry_count: u32,
    trace: Vec<String>,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CommandError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CommandError::Output(format!("JSON serialization failed: {e}")))
}

/// Formats the catalog listing.
///
/// # Errors
///
/// Returns [`CommandError::Output`] if JSON serialization fails.
pub fn format_sources(
    sources: &[DataSourceDescriptor],
    format: OutputFormat,
) -> Result<String, CommandError> {
    match format {
        OutputFormat::Text => {
            if sources.is_empty() {
                return Ok("No data sources configured.\n".to_string());
            }
            let mut output = format!("{} data source(s):\n", sources.len());
            for s in sources {
                output.push_str(&format!(
                    "  {:<20} {:<11} {}\n",
                    s.name,
                    s.kind.as_str(),
                    s.description
                ));
            }
            Ok(output)
        }
        OutputFormat::Json => {
            let rows: Vec<_> = sources
                .iter()
                .map(|s| SourceRow {
                    name: &s.name,
                    kind: s.kind.as_str(),
                    description: &s.description,
                })
                .collect();
            to_json(&rows)
        }
    }
}

/// Formats a session outcome.
///
/// In verbose text mode a footer lists the route, retry count, and trace.
///
/// # Errors
///
/// Returns [`CommandError::Output`] if JSON serialization fails.
pub fn format_outcome(
    outcome: &SessionOutcome,
    format: OutputFormat,
    verbose: bool,
) -> Result<String, CommandError> {
    let trace: Vec<String> = outcome.trace.iter().map(ToString::to_string).collect();
    match format {
        OutputFormat::Text => {
            let mut output = outcome.text().to_string();
            if !outcome.sources_consulted.is_empty() && !output.contains("Sources") {
                output.push_str(&format!(
                    "\n\nSources: {}",
                    outcome.sources_consulted.join(", ")
                ));
            }
            if verbose {
                output.push_str(&format!(
                    "\n\n---\nSource: {} | Retries: {} | Trace: {}",
                    outcome.state.selected_source().unwrap_or("none"),
                    outcome.state.retry_count(),
                    trace.join(" → ")
                ));
            }
            output.push('\n');
            Ok(output)
        }
        OutputFormat::Json => to_json(&AnswerView {
            question: outcome.state.question(),
            answer: outcome.answer.as_deref(),
            direct_reply: outcome.direct_reply.as_deref(),
            selected_source: outcome.state.selected_source(),
            sources_consulted: &outcome.sources_consulted,
            retry_count: outcome.state.retry_count(),
            trace,
        }),
    }
}
