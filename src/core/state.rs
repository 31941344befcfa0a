//! Per-session run state and the node trace.

use serde::Serialize;

pub use super::labels::{EvaluationLabel, ExpertKind};
use crate::agent::message::Conversation;

/// A state of the routing state machine, as recorded in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "node", content = "label", rename_all = "snake_case")]
pub enum Node {
    /// Source selection.
    Router,
    /// Relational query generation (and execution, if a tool was called).
    SqlExpert,
    /// Document query generation (and execution, if a tool was called).
    DocumentExpert,
    /// Result evaluation, with the label it produced.
    Evaluator(EvaluationLabel),
    /// Knowledge-base fallback.
    SemanticExpert,
    /// Final answer.
    Synthesizer,
}

impl Node {
    /// Expert node for an expert kind.
    #[must_use]
    pub const fn expert(kind: ExpertKind) -> Self {
        match kind {
            ExpertKind::Sql => Self::SqlExpert,
            ExpertKind::Document => Self::DocumentExpert,
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Router => f.write_str("Router"),
            Self::SqlExpert => f.write_str("SQLExpert"),
            Self::DocumentExpert => f.write_str("DocumentExpert"),
            Self::Evaluator(label) => write!(f, "Evaluator({label})"),
            Self::SemanticExpert => f.write_str("SemanticExpert"),
            Self::Synthesizer => f.write_str("Synthesizer"),
        }
    }
}

/// Mutable record threaded through every step of one session.
///
/// The route is written once by the router. `retry_count` only grows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunState {
    selected_source: Option<String>,
    expert: Option<ExpertKind>,
    retry_count: u32,
    evaluation_label: Option<EvaluationLabel>,
    conversation: Conversation,
}

impl RunState {
    /// Fresh state for a question.
    #[must_use]
    pub fn new(question: &str) -> Self {
        Self {
            conversation: Conversation::with_question(question),
            ..Self::default()
        }
    }

    /// Records the router's decision.
    ///
    /// Returns `false` and leaves the state untouched if a route was
    /// already set.
    pub fn set_route(&mut self, expert: ExpertKind, source: impl Into<String>) -> bool {
        if self.expert.is_some() {
            return false;
        }
        self.expert = Some(expert);
        self.selected_source = Some(source.into());
        true
    }

    /// Source chosen by the router.
    #[must_use]
    pub fn selected_source(&self) -> Option<&str> {
        self.selected_source.as_deref()
    }

    /// Expert chosen by the router.
    #[must_use]
    pub const fn expert(&self) -> Option<ExpertKind> {
        self.expert
    }

    /// Attempts counted so far.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Counts one more attempt.
    pub const fn increment_retry(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }

    /// Label of the latest evaluation.
    #[must_use]
    pub const fn evaluation_label(&self) -> Option<EvaluationLabel> {
        self.evaluation_label
    }

    /// Stores the latest evaluation label.
    pub const fn set_evaluation_label(&mut self, label: EvaluationLabel) {
        self.evaluation_label = Some(label);
    }

    /// Session history.
    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Session history, for appending.
    pub const fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// The user's question.
    #[must_use]
    pub fn question(&self) -> &str {
        self.conversation
            .user_question()
            .map_or("", |m| m.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_is_set_once() {
        let mut state = RunState::new("q");
        assert!(state.set_route(ExpertKind::Sql, "sales_db"));
        assert!(!state.set_route(ExpertKind::Document, "app_logs"));
        assert_eq!(state.selected_source(), Some("sales_db"));
        assert_eq!(state.expert(), Some(ExpertKind::Sql));
    }

    #[test]
    fn test_fresh_state() {
        let mut state = RunState::new("How much revenue?");
        assert_eq!(state.retry_count(), 0);
        assert_eq!(state.evaluation_label(), None);
        assert_eq!(state.question(), "How much revenue?");
        state.increment_retry();
        state.increment_retry();
        assert_eq!(state.retry_count(), 2);
    }

    #[test]
    fn test_node_display_and_serialization() {
        assert_eq!(Node::expert(ExpertKind::Sql).to_string(), "SQLExpert");
        assert_eq!(
            Node::Evaluator(EvaluationLabel::Error).to_string(),
            "Evaluator(error)"
        );
        let json = serde_json::to_string(&Node::Evaluator(EvaluationLabel::Satisfactory))
            .unwrap_or_default();
        assert_eq!(json, r#"{"node":"evaluator","label":"satisfactory"}"#);
        let json = serde_json::to_string(&Node::Router).unwrap_or_default();
        assert_eq!(json, r#"{"node":"router"}"#);
    }
}
