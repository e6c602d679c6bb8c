//! Pipeline stage implementations and the executor that sequences them.
//!
//! This crate provides the three prompt-driven stages (Coder, Reviewer,
//! Refactorer), the [`LlmGateway`] that wraps every LLM call with the
//! configured model, deadline, and empty-completion check, and the
//! [`PipelineExecutor`] that walks the fixed `Start → … → End` sequence.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Stages sequence calls between the domain types in
//! the [`pipeline`] crate and a [`pipeline::CompletionProvider`]. They contain
//! no transport code of their own.

pub mod executor;
pub mod gateway;
pub mod prompts;
pub mod stages;

pub use executor::PipelineExecutor;
pub use gateway::{GatewaySettings, LlmGateway};
pub use prompts::StageTemplates;
pub use stages::PromptStage;
