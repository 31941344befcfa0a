//! # source-router
//!
//! Answers natural-language questions by routing each one to the data
//! source best able to answer it.
//!
//! A session runs a small state machine: a router picks one source from a
//! [`catalog::Catalog`], a SQL or document expert writes and runs a query,
//! an evaluator labels the result, and the session either retries, falls
//! back to a semantic search over a knowledge base, or hands everything to
//! a synthesizer for the final answer. Retries are bounded, so every
//! session terminates.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use source_router::agent::{AgentConfig, Orchestrator, create_provider};
//! use source_router::backend::{DefaultBackendFactory, InMemoryKnowledgeBase};
//! use source_router::catalog::Catalog;
//!
//! # async fn run() -> source_router::Result<()> {
//! let catalog = Catalog::load(std::path::Path::new("source-router.yaml"))?;
//! let config = AgentConfig::from_env()?;
//! let provider = create_provider(&config)?;
//! let orchestrator = Orchestrator::new(
//!     provider,
//!     config,
//!     Arc::new(catalog),
//!     Arc::new(DefaultBackendFactory),
//!     Arc::new(InMemoryKnowledgeBase::default()),
//! );
//! let outcome = orchestrator.answer("How much revenue came from Product A?").await?;
//! println!("{}", outcome.text());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod backend;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod error;

pub use agent::{Orchestrator, SessionOutcome};
pub use catalog::{Catalog, DataSourceDescriptor};
pub use crate::core::{EvaluationLabel, ExpertKind, Node, RunState};
pub use error::{Error, Result};
