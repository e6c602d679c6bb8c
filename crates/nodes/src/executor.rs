//! Drives one run through `Start → Coder → Reviewer → Refactorer → End`.
//!
//! The executor owns one [`Stage`] per working phase and steps through
//! [`RunPhase::next`] until the terminal phase. The state record is moved
//! into each stage and handed back on success. The first error ends the run:
//! no retry, no skip, and no partially filled record is returned.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, info_span, Instrument};

use pipeline::{
    CompletionProvider, PipelineError, PipelineRun, PipelineRunId, PipelineState, RunPhase, Stage,
    StageKind, StageRecord, Timestamp, TokenUsage,
};

use crate::{GatewaySettings, LlmGateway, PromptStage, StageTemplates};

/// Sequential runner for the three pipeline stages.
pub struct PipelineExecutor {
    coder: Box<dyn Stage>,
    reviewer: Box<dyn Stage>,
    refactorer: Box<dyn Stage>,
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor").finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    /// Builds the standard prompt-driven pipeline.
    ///
    /// All three stages share one [`LlmGateway`] over `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Template`] if any template is invalid for its
    /// stage. No LLM call is made in that case.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        settings: GatewaySettings,
        templates: StageTemplates,
    ) -> Result<Self, PipelineError> {
        let gateway = Arc::new(LlmGateway::new(provider, settings));
        let stage = |kind: StageKind| -> Result<Box<dyn Stage>, PipelineError> {
            Ok(Box::new(PromptStage::new(
                kind,
                templates.for_stage(kind).clone(),
                Arc::clone(&gateway),
            )?))
        };

        Ok(Self {
            coder: stage(StageKind::Coder)?,
            reviewer: stage(StageKind::Reviewer)?,
            refactorer: stage(StageKind::Refactorer)?,
        })
    }

    /// Builds an executor from custom stage implementations.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigurationError`] if a stage is supplied in
    /// the wrong slot (its [`Stage::kind`] does not match).
    pub fn from_stages(
        coder: Box<dyn Stage>,
        reviewer: Box<dyn Stage>,
        refactorer: Box<dyn Stage>,
    ) -> Result<Self, PipelineError> {
        for (expected, stage) in StageKind::ALL.iter().zip([&coder, &reviewer, &refactorer]) {
            if stage.kind() != *expected {
                return Err(PipelineError::ConfigurationError {
                    message: format!(
                        "stage in the {expected} slot reports kind '{}'",
                        stage.kind()
                    ),
                });
            }
        }

        Ok(Self {
            coder,
            reviewer,
            refactorer,
        })
    }

    fn stage(&self, kind: StageKind) -> &dyn Stage {
        match kind {
            StageKind::Coder => self.coder.as_ref(),
            StageKind::Reviewer => self.reviewer.as_ref(),
            StageKind::Refactorer => self.refactorer.as_ref(),
        }
    }

    /// Convenience wrapper: build the initial record from `task` and run it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] for a blank task, otherwise as
    /// [`PipelineExecutor::run`].
    pub async fn run_task(&self, task: impl Into<String>) -> Result<PipelineRun, PipelineError> {
        self.run(PipelineState::new(task)?).await
    }

    /// Runs every stage in order against `state`.
    ///
    /// # Errors
    ///
    /// Returns the first stage error unchanged; later stages are not invoked.
    pub async fn run(&self, state: PipelineState) -> Result<PipelineRun, PipelineError> {
        let run_id = PipelineRunId::new_random();
        let span = info_span!("pipeline_run", %run_id);

        async move {
            let started_at = Timestamp::now();
            info!(input_chars = state.input().len(), "Pipeline run started");

            let mut state = state;
            let mut phase = RunPhase::Start;
            let mut usage = TokenUsage::default();
            let mut stages = Vec::with_capacity(StageKind::ALL.len());

            while let Some(next) = phase.next() {
                phase = next;
                let Some(kind) = phase.stage() else {
                    continue;
                };

                let clock = Instant::now();
                let output = match self
                    .stage(kind)
                    .run(state)
                    .instrument(info_span!("stage", stage = %kind))
                    .await
                {
                    Ok(output) => output,
                    Err(err) => {
                        error!(stage = %kind, error = %err, "Pipeline run aborted");
                        return Err(err);
                    }
                };
                let elapsed = clock.elapsed();

                info!(
                    stage = %kind,
                    elapsed_ms = elapsed.as_millis() as u64,
                    tokens = output.usage.total().as_u64(),
                    "Stage completed"
                );
                usage += output.usage;
                stages.push(StageRecord {
                    stage: kind,
                    usage: output.usage,
                    elapsed,
                });
                state = output.state;
            }

            debug_assert!(phase.is_terminal() && state.is_complete());
            info!(total_tokens = usage.total().as_u64(), "Pipeline run finished");

            Ok(PipelineRun {
                run_id,
                state,
                usage,
                stages,
                started_at,
                finished_at: Timestamp::now(),
            })
        }
        .instrument(span)
        .await
    }
}
