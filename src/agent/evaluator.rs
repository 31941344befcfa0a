//! Result evaluator.
//!
//! The single decision point of the state machine. Cheap syntactic checks
//! run first; the model is only asked about results that look usable.

use async_trait::async_trait;
use serde::Deserialize;

use super::config::AgentConfig;
use super::message::{ChatMessage, Role};
use super::prompt::build_evaluator_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::{EvaluationLabel, RunState, classify_result};

/// What the conversation offers for judging.
#[derive(Debug, PartialEq, Eq)]
enum Attempt<'a> {
    /// The most recent tool result.
    ToolResult(&'a str),
    /// No tool result yet; the last message is a system error note.
    ErrorNote,
    /// No tool result yet and no error note.
    Nothing,
}

/// Finds the most recent tool result in the conversation.
///
/// Error notes and plain-text replies only decide the label when no tool
/// has run in this session.
fn latest_attempt(messages: &[ChatMessage]) -> Attempt<'_> {
    if let Some(m) = messages.iter().rev().find(|m| m.role == Role::Tool) {
        return Attempt::ToolResult(&m.content);
    }
    match messages.last() {
        Some(m) if m.is_error_note() => Attempt::ErrorNote,
        _ => Attempt::Nothing,
    }
}

#[derive(Deserialize)]
struct Verdict {
    verdict: String,
}

/// Maps the model's verdict to a label.
///
/// Accepts `{"verdict": "..."}` or a bare word. Only an exact
/// `satisfactory` passes; anything else counts as unsatisfactory.
fn parse_verdict(content: &str) -> EvaluationLabel {
    let raw = serde_json::from_str::<Verdict>(content.trim())
        .map_or_else(|_| content.to_string(), |v| v.verdict);
    let word = raw
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if word == "satisfactory" {
        EvaluationLabel::Satisfactory
    } else {
        EvaluationLabel::Unsatisfactory
    }
}

/// Agent that labels query results.
pub struct ResultEvaluator {
    model: String,
    system_prompt: String,
}

impl ResultEvaluator {
    /// Creates an evaluator with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.evaluator_model.clone(),
            system_prompt,
        }
    }

    /// Labels the latest attempt and records the label in `state`.
    ///
    /// An `unsatisfactory` verdict also counts as an attempt. A failed
    /// model call yields `error` without touching the retry count.
    pub async fn evaluate(
        &self,
        provider: &dyn LlmProvider,
        state: &mut RunState,
    ) -> EvaluationLabel {
        let label = match latest_attempt(state.conversation().messages()) {
            Attempt::Nothing => EvaluationLabel::NoResults,
            Attempt::ErrorNote => EvaluationLabel::Error,
            Attempt::ToolResult(content) if classify_result(content).is_unusable() => {
                EvaluationLabel::Error
            }
            Attempt::ToolResult(content) => {
                let prompt = build_evaluator_prompt(state.question(), content.trim());
                match self.execute(provider, &prompt).await {
                    Ok(response) => parse_verdict(&response.content),
                    Err(e) => {
                        tracing::warn!(error = %e, "evaluator model call failed");
                        EvaluationLabel::Error
                    }
                }
            }
        };

        if label == EvaluationLabel::Unsatisfactory {
            state.increment_retry();
        }
        state.set_evaluation_label(label);
        label
    }
}

#[async_trait]
impl Agent for ResultEvaluator {
    fn name(&self) -> &'static str {
        "evaluator"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        32
    }
}
