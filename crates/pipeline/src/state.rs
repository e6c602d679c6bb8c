//! The record threaded through the stages, and the result of a completed run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PipelineError, PipelineRunId, StageKind, StateField, Timestamp, TokenUsage};

/// Shared state for one pipeline run.
///
/// Fields are private: `input` is fixed at construction and the three output
/// fields can only be written through [`PipelineState::record`], one per stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    input: String,
    code: Option<String>,
    review: Option<String>,
    refactored_code: Option<String>,
}

impl PipelineState {
    /// Creates a record holding only the task description.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if `input` is empty or whitespace.
    pub fn new(input: impl Into<String>) -> Result<Self, PipelineError> {
        let input = input.into();
        if input.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        Ok(Self {
            input,
            code: None,
            review: None,
            refactored_code: None,
        })
    }

    /// The original task description.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Code written by the Coder stage.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Feedback written by the Reviewer stage.
    pub fn review(&self) -> Option<&str> {
        self.review.as_deref()
    }

    /// Final output written by the Refactorer stage.
    pub fn refactored_code(&self) -> Option<&str> {
        self.refactored_code.as_deref()
    }

    /// Looks up a field by tag; `None` while it is unpopulated.
    pub fn field(&self, field: StateField) -> Option<&str> {
        match field {
            StateField::Input => Some(&self.input),
            StateField::Code => self.code(),
            StateField::Review => self.review(),
            StateField::RefactoredCode => self.refactored_code(),
        }
    }

    /// Writes `text` into `stage`'s target field, overwriting any earlier value.
    pub fn record(&mut self, stage: StageKind, text: impl Into<String>) {
        let slot = match stage.target_field() {
            StateField::Code => &mut self.code,
            StateField::Review => &mut self.review,
            StateField::RefactoredCode => &mut self.refactored_code,
            // No stage targets the task description.
            StateField::Input => return,
        };
        *slot = Some(text.into());
    }

    /// Checks that every field `stage` requires is populated and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingInput`] naming the first missing field.
    pub fn ensure_ready_for(&self, stage: StageKind) -> Result<(), PipelineError> {
        match stage
            .required_fields()
            .iter()
            .find(|f| self.field(**f).map_or(true, |v| v.trim().is_empty()))
        {
            Some(field) => Err(PipelineError::MissingInput {
                stage,
                field: *field,
            }),
            None => Ok(()),
        }
    }

    /// `true` once `refactored_code` is populated.
    pub fn is_complete(&self) -> bool {
        self.refactored_code.is_some()
    }
}

// ---------------------------------------------------------------------------
// Run results
// ---------------------------------------------------------------------------

/// Timing and token accounting for one completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Which stage ran.
    pub stage: StageKind,
    /// Tokens consumed by the stage's call.
    pub usage: TokenUsage,
    /// Wall-clock time spent in the stage.
    pub elapsed: Duration,
}

/// A successfully completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Identifier attached to every span emitted by the run.
    pub run_id: PipelineRunId,
    /// Final record; `is_complete()` always holds.
    pub state: PipelineState,
    /// Token usage summed over all stages.
    pub usage: TokenUsage,
    /// Per-stage records in execution order.
    pub stages: Vec<StageRecord>,
    /// When the run entered `Start`.
    pub started_at: Timestamp,
    /// When the run reached `End`.
    pub finished_at: Timestamp,
}
