//! Core types of the routing state machine.
//!
//! The result classifier and the routing labels have no model dependency,
//! so the CLI and the backends can share them without pulling in the agent
//! layer. [`RunState`] ties them to a session's conversation.

pub mod classify;
pub mod labels;
pub mod state;

pub use classify::{ResultClass, classify_result, has_error, is_result_empty};
pub use labels::{EvaluationLabel, ExpertKind};
pub use state::{Node, RunState};
