//! Top-level error type for the pipeline domain.
//!
//! [`PipelineError`] covers every condition that aborts a run. Component-level
//! errors ([`CompletionError`] for LLM calls, [`TemplateError`] for prompt
//! rendering) are defined in their respective modules and wrapped here with
//! the stage they occurred in.
//!
//! No variant is retried: the first error ends the run and no partial state
//! is returned.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CompletionError, StageKind, StateField, TemplateError};

/// Errors that abort a pipeline run.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The task description was empty.
    #[error("Task description must not be empty")]
    EmptyInput,

    /// A stage was invoked before one of its required fields was populated.
    #[error("Stage '{stage}' requires '{field}' to be populated")]
    MissingInput {
        /// The stage that could not run.
        stage: StageKind,
        /// The first missing field.
        field: StateField,
    },

    /// The stage's LLM call failed.
    #[error("Stage '{stage}' failed: {source}")]
    Completion {
        /// The stage whose call failed.
        stage: StageKind,
        /// The underlying completion failure.
        source: CompletionError,
    },

    /// A stage's prompt template is invalid or references a field the stage
    /// cannot see.
    #[error("Prompt template for stage '{stage}' is invalid: {source}")]
    Template {
        /// The stage owning the template.
        stage: StageKind,
        /// The template problem.
        source: TemplateError,
    },

    /// The pipeline or runtime configuration is invalid.
    ///
    /// Produced at load time; the pipeline never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

impl PipelineError {
    /// Returns the completion failure behind this error, if there is one.
    pub fn completion_error(&self) -> Option<&CompletionError> {
        match self {
            Self::Completion { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the stage this error is attributed to, if any.
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            Self::MissingInput { stage, .. }
            | Self::Completion { stage, .. }
            | Self::Template { stage, .. } => Some(*stage),
            Self::EmptyInput | Self::ConfigurationError { .. } => None,
        }
    }
}
