//! Core domain for the code-review pipeline.
//!
//! This crate contains the state record threaded through the three stages
//! (Coder, Reviewer, Refactorer), the prompt template language, the stage
//! contract, the completion-provider port, and the pipeline-level error type.
//! Infrastructure crates implement the traits defined here; they never add
//! domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; the `llm` crate defines *how* to reach a model
//! and the `nodes` crate sequences the stages.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`PipelineRunId`, `ModelName`) |
//! | [`types`] | Shared value types (`TokenCount`, `TokenUsage`, `Timestamp`) |
//! | [`state`] | `PipelineState` record and `PipelineRun` result |
//! | [`stage`] | `Stage` contract, `StageKind`, `StateField`, `RunPhase` |
//! | [`prompt`] | `PromptTemplate` and its placeholder syntax |
//! | [`completion`] | `CompletionProvider` port, request/response types, `CompletionError` |
//! | [`errors`] | Top-level `PipelineError` |

pub mod completion;
pub mod errors;
pub mod identifiers;
pub mod prompt;
pub mod stage;
pub mod state;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use completion::{
    ChatMessage, Completion, CompletionError, CompletionProvider, CompletionRequest, MessageRole,
};
pub use errors::PipelineError;
pub use identifiers::{ModelName, PipelineRunId};
pub use prompt::{PromptTemplate, TemplateError};
pub use stage::{RunPhase, Stage, StageKind, StageOutput, StateField};
pub use state::{PipelineRun, PipelineState, StageRecord};
pub use types::{Timestamp, TokenCount, TokenUsage};
