//! Completion-provider port: the only way the pipeline reaches an LLM.
//!
//! A [`CompletionProvider`] receives an ordered list of role-tagged messages
//! and returns a single text completion. Transport, authentication, and wire
//! formats are the adapter's concern (see the `llm` crate); the pipeline only
//! sees [`CompletionRequest`], [`Completion`], and [`CompletionError`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ModelName, TokenUsage};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Author of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Fixed instruction that establishes the stage persona.
    System,
    /// Message interpolated from prior pipeline state.
    Human,
}

impl MessageRole {
    /// Returns the lowercase role tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Human => "human",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: MessageRole,
    /// Fully rendered message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a `system` message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Creates a `human` message.
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Human,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A single completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model the provider should use.
    pub model: ModelName,
    /// Messages in prompt order (system first).
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature. `None` uses the provider default.
    pub temperature: Option<f32>,
    /// Upper bound on completion length. `None` uses the provider default.
    pub max_tokens: Option<u32>,
}

/// The text returned by a provider together with its token accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Completion text, exactly as returned by the model.
    pub text: String,
    /// Tokens consumed by the call (zero when the provider does not report usage).
    pub usage: TokenUsage,
}

impl Completion {
    /// Creates a completion with no usage information.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Any failure of an LLM call to produce a usable text completion.
///
/// Every variant is fatal for the run that produced it: the executor never
/// retries or substitutes default text.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum CompletionError {
    /// The provider could not be reached (DNS, connect, TLS, broken stream).
    #[error("Completion transport failure: {message}")]
    Transport {
        /// Description of the underlying transport error.
        message: String,
    },

    /// The provider rejected the credential (HTTP 401 / 403).
    #[error("Completion request was not authorised: {message}")]
    Authentication {
        /// Provider-supplied reason, if any.
        message: String,
    },

    /// The provider refused the call because of rate limiting (HTTP 429).
    #[error("Completion request was rate limited: {message}")]
    RateLimited {
        /// Delay suggested by the provider's `Retry-After` header.
        retry_after: Option<Duration>,
        /// Provider-supplied reason, if any.
        message: String,
    },

    /// Any other non-success status returned by the provider.
    #[error("Completion API returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider-supplied error message or raw body.
        message: String,
    },

    /// The response could not be decoded into a completion.
    #[error("Malformed completion response: {message}")]
    MalformedResponse {
        /// What was wrong with the response.
        message: String,
    },

    /// The provider answered successfully but the completion contained no text.
    #[error("Completion was empty")]
    EmptyCompletion,

    /// The call did not finish within the configured deadline.
    #[error("Completion call timed out")]
    Timeout {
        /// Deadline that elapsed, when known.
        after: Option<Duration>,
    },
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// Capability to turn a role-structured prompt into one text completion.
///
/// Implemented by infrastructure adapters (e.g. the OpenAI-compatible client
/// in the `llm` crate) and by test doubles.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider label used in logs and spans (e.g. `"openai"`).
    fn name(&self) -> &str;

    /// Performs exactly one completion call.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError`] when the provider is unreachable, rejects
    /// the request, or returns a response that is not a usable completion.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;
}
