//! Syntactic classification of raw backend results.
//!
//! A cheap pre-filter that runs before any model judgment. It only looks at
//! the text: no parsing of rows, no model call.

use serde::{Deserialize, Serialize};

/// Results that mean "nothing came back", compared after trimming and
/// lowercasing.
const EMPTY_MARKERS: &[&str] = &["", "[]", "{}", "()", "none"];

/// Substrings that mark a failed or empty execution, matched case-insensitively.
const ERROR_INDICATORS: &[&str] = &["error", "no results", "empty", "no rows"];

/// Heuristic label for a raw backend result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultClass {
    /// The result is an empty-collection marker.
    Empty,
    /// The result carries an error or no-data indicator.
    Error,
    /// The result has content worth showing to the evaluator model.
    NonTrivial,
}

impl ResultClass {
    /// Returns `true` for [`ResultClass::Empty`] and [`ResultClass::Error`].
    #[must_use]
    pub const fn is_unusable(self) -> bool {
        matches!(self, Self::Empty | Self::Error)
    }
}

/// Returns `true` when the result is one of the empty-result markers.
#[must_use]
pub fn is_result_empty(content: &str) -> bool {
    let normalized = content.trim().to_lowercase();
    EMPTY_MARKERS.contains(&normalized.as_str())
}

/// Returns `true` when the result contains an error indicator.
#[must_use]
pub fn has_error(content: &str) -> bool {
    let lowered = content.to_lowercase();
    ERROR_INDICATORS.iter().any(|needle| lowered.contains(needle))
}

/// Classifies a raw tool result.
#[must_use]
pub fn classify_result(content: &str) -> ResultClass {
    if is_result_empty(content) {
        ResultClass::Empty
    } else if has_error(content) {
        ResultClass::Error
    } else {
        ResultClass::NonTrivial
    }
}
