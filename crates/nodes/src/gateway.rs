//! Single choke point for every LLM call made by the stages.
//!
//! The gateway owns the model selection and sampling parameters, applies the
//! optional per-call deadline, and rejects completions that contain no text.
//! Providers therefore only need to report what the wire returned.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, info_span, warn, Instrument};

use pipeline::{
    ChatMessage, Completion, CompletionError, CompletionProvider, CompletionRequest, ModelName,
    StageKind,
};

/// Model and call parameters shared by all stages.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    /// Model requested for every call.
    pub model: ModelName,
    /// Sampling temperature; `None` uses the provider default.
    pub temperature: Option<f32>,
    /// Completion length cap; `None` uses the provider default.
    pub max_tokens: Option<u32>,
    /// Deadline for each call; `None` waits for the provider.
    pub timeout: Option<Duration>,
}

impl GatewaySettings {
    /// Settings with only a model and no overrides.
    pub fn new(model: ModelName) -> Self {
        Self {
            model,
            temperature: None,
            max_tokens: None,
            timeout: None,
        }
    }
}

/// Wraps a [`CompletionProvider`] with the run-wide call policy.
pub struct LlmGateway {
    provider: Arc<dyn CompletionProvider>,
    settings: GatewaySettings,
}

impl LlmGateway {
    /// Creates a gateway over `provider`.
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: GatewaySettings) -> Self {
        Self { provider, settings }
    }

    /// Sends `messages` on behalf of `stage` and returns the completion.
    ///
    /// # Errors
    ///
    /// Propagates the provider's [`CompletionError`], returns
    /// [`CompletionError::Timeout`] when the deadline elapses, and
    /// [`CompletionError::EmptyCompletion`] when the text is blank.
    pub async fn complete(
        &self,
        stage: StageKind,
        messages: Vec<ChatMessage>,
    ) -> Result<Completion, CompletionError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let span = info_span!(
            "llm_call",
            provider = self.provider.name(),
            model = %self.settings.model,
            %stage
        );

        async move {
            let call = self.provider.complete(request);
            let result = match self.settings.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| CompletionError::Timeout { after: Some(limit) })
                    .and_then(|inner| inner),
                None => call.await,
            };

            let completion = match result {
                Ok(completion) => completion,
                Err(error) => {
                    warn!(%error, "LLM call failed");
                    return Err(error);
                }
            };

            if completion.text.trim().is_empty() {
                warn!("LLM returned an empty completion");
                return Err(CompletionError::EmptyCompletion);
            }

            info!(
                prompt_tokens = completion.usage.prompt.as_u64(),
                completion_tokens = completion.usage.completion.as_u64(),
                chars = completion.text.len(),
                "LLM call completed"
            );
            Ok(completion)
        }
        .instrument(span)
        .await
    }
}
