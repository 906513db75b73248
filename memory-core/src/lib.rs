#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
//! Category-scoped long-term memory orchestration for conversational
//! agents.
//!
//! This crate implements the **Memory Orchestration Core**: given a
//! stream of conversation turns for a `(agent_id, user_id)` memory
//! space, it runs a dependency-ordered set of category agents (activity,
//! profile, events, reminders, interests, study, important events) that
//! each update their own stored artifact, then exposes that stored
//! memory back to callers through multi-modal recall and an iterative,
//! grounded response agent.
//!
//! # Quick start
//!
//! ```no_run
//! use memory_orchestrator_core::category::{register_default_templates, standard_categories, ActivityDerivedSpec, ActivitySpec, CategoryAgentSpec};
//! use memory_orchestrator_core::llm::MockLlmClient;
//! use memory_orchestrator_core::orchestrator::MemoryOrchestrationAgent;
//! use memory_orchestrator_core::storage::StorageBackend;
//! use memory_orchestrator_core::types::{ConversationInput, MemorySpace};
//!
//! # async fn run(storage: &dyn StorageBackend) -> memory_orchestrator_core::error::Result<()> {
//! let mut orchestrator = MemoryOrchestrationAgent::new();
//! for category in standard_categories() {
//!     let spec: Box<dyn CategoryAgentSpec> = if category.name == "activity" {
//!         Box::new(ActivitySpec(category.clone()))
//!     } else {
//!         Box::new(ActivityDerivedSpec(category.clone()))
//!     };
//!     orchestrator.register_agent(category, "template {input_content}", spec)?;
//! }
//!
//! let llm = MockLlmClient::with_text("generated content");
//! let space = MemorySpace::new("agent-1", "alice");
//! let conversation = vec![ConversationInput { role: "user".into(), content: "hi".into() }];
//! let report = orchestrator.ingest(&space, "Alice", "2026-08-01", &conversation, &llm, storage, None).await?;
//! assert!(!report.processed.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Module organization
//!
//! - [`category`] — category configuration, the registry, and the base
//!   category-agent contract.
//! - [`orchestrator`] — runs every registered category agent in
//!   dependency order for one ingestion call.
//! - [`recall`] — multi-modal search, similarity lookup, and document
//!   import over stored category artifacts.
//! - [`response`] — iterative, grounded question answering in both
//!   direct and tool-calling modes.
//! - [`storage`] — the storage backend trait concrete backends
//!   implement.
//! - [`embeddings`] — the embedding provider trait, a deterministic
//!   mock, and the bounded embedding cache.
//! - [`prompts`] — the prompt template store.
//! - [`llm`] — the LLM client trait and a deterministic mock.
//! - [`config`] — runtime configuration, loadable from the environment.
//! - [`error`] — the crate's error taxonomy.
//!
//! # Error handling
//!
//! Every fallible operation returns [`error::Result`]. Recoverable
//! failures (a transient storage or LLM error) can be distinguished from
//! non-recoverable ones (a misconfigured category graph) via
//! [`error::Error::is_recoverable`].

pub mod category;
pub mod config;
pub mod constants;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod recall;
pub mod response;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use orchestrator::{IngestionReport, MemoryOrchestrationAgent};
pub use recall::{CancellationSignal, ImportFileReport, RecallAgent, SimilarMatch};
pub use response::{ResponseAgent, ResponseOutcome, ToolCallRecord, ToolOutcome};
pub use storage::StorageBackend;
pub use types::{Category, CategoryArtifact, ConversationInput, MemorySpace, RetrievalResult, SearchMethod, WritePolicy};
