//! Prompt-driven implementation of the [`Stage`] contract.
//!
//! All three stages share one shape: check required fields, render the stage
//! template from the state, make one gateway call, write the target field.
//! What differs per stage (required fields, exposed variables, target field)
//! is encoded in [`StageKind`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use pipeline::{
    PipelineError, PipelineState, PromptTemplate, Stage, StageKind, StageOutput,
};

use crate::LlmGateway;

/// A stage that turns one prompt template into one state field.
pub struct PromptStage {
    kind: StageKind,
    template: PromptTemplate,
    gateway: Arc<LlmGateway>,
}

impl PromptStage {
    /// Creates a stage after checking that `template` only references fields
    /// available to `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Template`] if the template fails to parse or
    /// references an unavailable field.
    pub fn new(
        kind: StageKind,
        template: PromptTemplate,
        gateway: Arc<LlmGateway>,
    ) -> Result<Self, PipelineError> {
        let available: Vec<&str> = kind.available_fields().iter().map(|f| f.as_str()).collect();
        template
            .validate(&available)
            .map_err(|source| PipelineError::Template { stage: kind, source })?;

        Ok(Self {
            kind,
            template,
            gateway,
        })
    }
}

#[async_trait]
impl Stage for PromptStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn run(&self, mut state: PipelineState) -> Result<StageOutput, PipelineError> {
        state.ensure_ready_for(self.kind)?;

        let vars: Vec<(&str, &str)> = self
            .kind
            .available_fields()
            .iter()
            .filter_map(|field| state.field(*field).map(|value| (field.as_str(), value)))
            .collect();
        let messages = self
            .template
            .render(&vars)
            .map_err(|source| PipelineError::Template {
                stage: self.kind,
                source,
            })?;
        debug!(stage = %self.kind, messages = messages.len(), "Rendered stage prompt");

        let completion = self
            .gateway
            .complete(self.kind, messages)
            .await
            .map_err(|source| PipelineError::Completion {
                stage: self.kind,
                source,
            })?;

        state.record(self.kind, completion.text);
        Ok(StageOutput {
            state,
            usage: completion.usage,
        })
    }
}
