//! LLM agents and the routing state machine.
//!
//! Every node that talks to a model implements [`Agent`] over a pluggable
//! [`LlmProvider`] backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! Question → Orchestrator
//!   ├── SourceRouter (picks one catalog source)
//!   ├── QueryExpert (SQL or document) → ToolExecutor → backend
//!   ├── ResultEvaluator (labels the latest attempt)
//!   │   └── retry the expert, or fall back to SemanticExpert
//!   └── SynthesizerAgent → final answer
//! ```

pub mod client;
pub mod config;
pub mod evaluator;
pub mod executor;
pub mod expert;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod router;
pub mod semantic;
pub mod synthesizer;
pub mod tool;
pub mod traits;

// Re-export key types
pub use client::create_provider;
pub use config::AgentConfig;
pub use evaluator::ResultEvaluator;
pub use executor::{DocumentTarget, SessionBackends, ToolExecutor};
pub use expert::{ExpertStep, QueryExpert};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Conversation, Role, TokenUsage};
pub use orchestrator::{Orchestrator, SessionOutcome};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use router::{RouteDecision, SourceRouter};
pub use semantic::SemanticExpert;
pub use synthesizer::{Evidence, SynthesizerAgent};
pub use tool::{ToolCall, ToolDefinition, ToolName, ToolResult, ToolSet};
pub use traits::{Agent, AgentResponse};
