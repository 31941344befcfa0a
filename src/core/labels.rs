//! Routing labels shared by the agents, the state machine, and the CLI.

use serde::{Deserialize, Serialize};

use crate::catalog::BackendKind;

/// Which structured-query expert owns a session.
///
/// Set once by the router and read by the retry logic. Never derived from
/// strings after routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertKind {
    /// Relational database expert.
    Sql,
    /// Document database expert.
    Document,
}

impl ExpertKind {
    /// Backend kind this expert queries.
    #[must_use]
    pub const fn backend_kind(self) -> BackendKind {
        match self {
            Self::Sql => BackendKind::Relational,
            Self::Document => BackendKind::Document,
        }
    }

    /// Expert for a backend kind, if structured routing supports it.
    #[must_use]
    pub const fn for_backend(kind: BackendKind) -> Option<Self> {
        match kind {
            BackendKind::Relational => Some(Self::Sql),
            BackendKind::Document => Some(Self::Document),
            BackendKind::Vector => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::Document => "document",
        }
    }
}

impl std::fmt::Display for ExpertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one evaluation step.
///
/// Exactly one label is produced per evaluation. Only
/// [`EvaluationLabel::Satisfactory`] advances straight to synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationLabel {
    /// The expert answered without calling its tool.
    NoResults,
    /// The attempt failed: configuration error, driver error, or empty result.
    Error,
    /// The result exists but the model judged it inadequate.
    Unsatisfactory,
    /// The result answers the question.
    Satisfactory,
}

impl EvaluationLabel {
    /// Returns `true` when the label goes through the retry/fallback policy.
    #[must_use]
    pub const fn needs_retry(self) -> bool {
        matches!(self, Self::Error | Self::Unsatisfactory)
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoResults => "no_results",
            Self::Error => "error",
            Self::Unsatisfactory => "unsatisfactory",
            Self::Satisfactory => "satisfactory",
        }
    }
}

impl std::fmt::Display for EvaluationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
