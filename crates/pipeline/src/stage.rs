//! The stage contract and the fixed run topology.
//!
//! A run moves through [`RunPhase`]s `Start → Coder → Reviewer → Refactorer →
//! End`. Every non-terminal phase has exactly one successor, taken
//! unconditionally. Each working phase is served by one [`Stage`], which reads
//! earlier [`StateField`]s and writes exactly one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{PipelineError, PipelineState, TokenUsage};

// ---------------------------------------------------------------------------
// State fields
// ---------------------------------------------------------------------------

/// Names one field of [`PipelineState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    /// The original task description.
    Input,
    /// Generated source code.
    Code,
    /// Review feedback on `code`.
    Review,
    /// Final refactored code.
    RefactoredCode,
}

impl StateField {
    /// Returns the field name as used in prompt placeholders.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Code => "code",
            Self::Review => "review",
            Self::RefactoredCode => "refactored_code",
        }
    }
}

impl std::fmt::Display for StateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage kinds
// ---------------------------------------------------------------------------

/// One of the three working stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Writes code from the task description.
    Coder,
    /// Reviews the generated code.
    Reviewer,
    /// Applies the review to the code.
    Refactorer,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [StageKind; 3] = [Self::Coder, Self::Reviewer, Self::Refactorer];

    /// Lowercase stage label used in logs and configuration keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coder => "coder",
            Self::Reviewer => "reviewer",
            Self::Refactorer => "refactorer",
        }
    }

    /// The single field this stage writes.
    pub fn target_field(self) -> StateField {
        match self {
            Self::Coder => StateField::Code,
            Self::Reviewer => StateField::Review,
            Self::Refactorer => StateField::RefactoredCode,
        }
    }

    /// Fields that must be non-empty before the stage may run.
    pub fn required_fields(self) -> &'static [StateField] {
        match self {
            Self::Coder => &[StateField::Input],
            Self::Reviewer => &[StateField::Code],
            Self::Refactorer => &[StateField::Code, StateField::Review],
        }
    }

    /// Fields a prompt template for this stage may reference.
    ///
    /// Every field written before the stage runs is available, even when the
    /// stage does not require it.
    pub fn available_fields(self) -> &'static [StateField] {
        match self {
            Self::Coder => &[StateField::Input],
            Self::Reviewer => &[StateField::Input, StateField::Code],
            Self::Refactorer => &[StateField::Input, StateField::Code, StateField::Review],
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Run phases
// ---------------------------------------------------------------------------

/// Position of a run in the fixed `Start → … → End` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Only `input` is populated.
    Start,
    /// Coder stage.
    Coder,
    /// Reviewer stage.
    Reviewer,
    /// Refactorer stage.
    Refactorer,
    /// `refactored_code` is populated; nothing left to do.
    End,
}

impl RunPhase {
    /// The unconditional successor, or `None` at [`RunPhase::End`].
    pub fn next(self) -> Option<RunPhase> {
        match self {
            Self::Start => Some(Self::Coder),
            Self::Coder => Some(Self::Reviewer),
            Self::Reviewer => Some(Self::Refactorer),
            Self::Refactorer => Some(Self::End),
            Self::End => None,
        }
    }

    /// The stage executed in this phase, if any.
    pub fn stage(self) -> Option<StageKind> {
        match self {
            Self::Coder => Some(StageKind::Coder),
            Self::Reviewer => Some(StageKind::Reviewer),
            Self::Refactorer => Some(StageKind::Refactorer),
            Self::Start | Self::End => None,
        }
    }

    /// Returns `true` for [`RunPhase::End`].
    pub fn is_terminal(self) -> bool {
        self == Self::End
    }
}

// ---------------------------------------------------------------------------
// Stage contract
// ---------------------------------------------------------------------------

/// What a stage hands back to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    /// The record with the stage's target field written.
    pub state: PipelineState,
    /// Tokens consumed by the stage's completion call.
    pub usage: TokenUsage,
}

/// One step of the pipeline: consume prior fields, produce one new field.
///
/// The record is taken by value and handed back on success; on failure it is
/// dropped, so a failed run never yields partial results.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Which stage this is.
    fn kind(&self) -> StageKind;

    /// Runs the stage against `state`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingInput`] if a required field is empty,
    /// and [`PipelineError::Completion`] if the LLM call fails.
    async fn run(&self, state: PipelineState) -> Result<StageOutput, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_walk_the_fixed_sequence() {
        let mut phase = RunPhase::Start;
        let mut stages = Vec::new();
        while let Some(next) = phase.next() {
            phase = next;
            stages.extend(phase.stage());
        }

        assert!(phase.is_terminal());
        assert_eq!(stages, StageKind::ALL.to_vec());
    }

    #[test]
    fn end_has_no_successor() {
        assert_eq!(RunPhase::End.next(), None);
        assert_eq!(RunPhase::Start.stage(), None);
    }

    #[test]
    fn each_stage_writes_a_distinct_field() {
        let targets: Vec<StateField> = StageKind::ALL.iter().map(|s| s.target_field()).collect();
        assert_eq!(
            targets,
            vec![StateField::Code, StateField::Review, StateField::RefactoredCode]
        );
    }

    #[test]
    fn required_fields_are_always_available() {
        for stage in StageKind::ALL {
            for field in stage.required_fields() {
                assert!(
                    stage.available_fields().contains(field),
                    "{stage} requires {field} but does not expose it"
                );
                assert_ne!(*field, stage.target_field());
            }
        }
    }
}
