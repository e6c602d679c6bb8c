//! OpenAI-compatible Chat Completions provider.
//!
//! Sends `POST {base_url}/chat/completions` with Bearer auth and maps the
//! HTTP outcome onto [`CompletionError`]. Any server speaking the same wire
//! format (Azure OpenAI proxies, local inference servers) works by pointing
//! `base_url` at it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use pipeline::{
    Completion, CompletionError, CompletionProvider, CompletionRequest, MessageRole, TokenUsage,
};

/// Public OpenAI API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Longest error body excerpt carried into a [`CompletionError`].
const MAX_ERROR_BODY_CHARS: usize = 512;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for [`OpenAiProvider`].
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Secret API key sent as a Bearer token.
    pub api_key: String,
    /// API root without a trailing `/chat/completions`.
    pub base_url: String,
}

impl OpenAiConfig {
    /// Config for the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn wire_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::Human => "user",
    }
}

fn transport_error(err: reqwest::Error) -> CompletionError {
    if err.is_timeout() {
        CompletionError::Timeout { after: None }
    } else {
        CompletionError::Transport {
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// [`CompletionProvider`] backed by an OpenAI-compatible HTTP API.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a provider with its own HTTP client.
    #[must_use]
    pub fn new(config: OpenAiConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Creates a provider with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: OpenAiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn build_body(request: &CompletionRequest) -> ChatRequest<'_> {
        ChatRequest {
            model: request.model.as_str(),
            messages: request
                .messages
                .iter()
                .map(|m| ChatRequestMessage {
                    role: wire_role(m.role),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    async fn error_from_status(response: reqwest::Response) -> CompletionError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.chars().take(MAX_ERROR_BODY_CHARS).collect());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                CompletionError::Authentication { message }
            }
            StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited {
                retry_after,
                message,
            },
            _ => CompletionError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Performs the HTTP round trip and decodes the first choice.
    #[instrument(skip_all, fields(model = %request.model))]
    async fn send(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let body = Self::build_body(request);
        debug!(
            messages = body.messages.len(),
            endpoint = %self.config.endpoint(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_status(response).await);
        }

        let raw = response.text().await.map_err(transport_error)?;
        let parsed: ChatResponse =
            serde_json::from_str(&raw).map_err(|e| CompletionError::MalformedResponse {
                message: e.to_string(),
            })?;

        let choice =
            parsed
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| CompletionError::MalformedResponse {
                    message: "response contained no choices".to_string(),
                })?;
        let text = choice
            .message
            .content
            .ok_or(CompletionError::EmptyCompletion)?;
        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(Completion { text, usage })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        self.send(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{ChatMessage, ModelName};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: ModelName::new("gpt-4").unwrap(),
            messages: vec![
                ChatMessage::system("You are a Coder."),
                ChatMessage::human("palindrome checker"),
            ],
            temperature: None,
            max_tokens: Some(100),
        }
    }

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig::new("sk-test").with_base_url(server.uri()))
    }

    async fn respond_with(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn successful_completion_returns_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4",
                "max_tokens": 100,
                "messages": [
                    {"role": "system", "content": "You are a Coder."},
                    {"role": "user", "content": "palindrome checker"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "def is_pal(s): ..."}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = provider(&server).complete(request()).await.unwrap();

        assert_eq!(completion.text, "def is_pal(s): ...");
        assert_eq!(completion.usage, TokenUsage::new(12, 7));
    }

    #[test]
    fn temperature_is_omitted_when_unset() {
        let body = serde_json::to_value(OpenAiProvider::build_body(&request())).unwrap();
        assert!(body.get("temperature").is_none());
        assert_eq!(body["max_tokens"], 100);
    }

    #[tokio::test]
    async fn missing_usage_defaults_to_zero() {
        let server = respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .await;

        let completion = provider(&server).complete(request()).await.unwrap();
        assert_eq!(completion.usage, TokenUsage::default());
    }

    #[tokio::test]
    async fn unauthorised_maps_to_authentication_error() {
        let server = respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .await;

        let err = provider(&server).complete(request()).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::Authentication {
                message: "Incorrect API key provided".to_string()
            }
        );
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let server = respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "20")
                .set_body_string("Too many requests"),
        )
        .await;

        let err = provider(&server).complete(request()).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::RateLimited {
                retry_after: Some(Duration::from_secs(20)),
                message: "Too many requests".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error_with_status() {
        let server = respond_with(ResponseTemplate::new(503).set_body_string("overloaded")).await;

        let err = provider(&server).complete(request()).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::Api {
                status: 503,
                message: "overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let server = respond_with(ResponseTemplate::new(200).set_body_string("<html>")).await;

        let err = provider(&server).complete(request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn no_choices_is_malformed() {
        let server =
            respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []}))).await;

        let err = provider(&server).complete(request()).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::MalformedResponse {
                message: "response contained no choices".to_string()
            }
        );
    }

    #[tokio::test]
    async fn null_content_is_an_empty_completion() {
        let server = respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        })))
        .await;

        let err = provider(&server).complete(request()).await.unwrap_err();
        assert_eq!(err, CompletionError::EmptyCompletion);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let provider = OpenAiProvider::new(
            OpenAiConfig::new("sk-test").with_base_url(format!("http://127.0.0.1:{port}")),
        );
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport { .. }));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let config = OpenAiConfig::new("k").with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let rendered = format!("{:?}", OpenAiConfig::new("sk-secret"));
        assert!(!rendered.contains("sk-secret"));
    }
}
