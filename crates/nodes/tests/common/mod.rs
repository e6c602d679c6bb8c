//! Stub completion providers and stage probes shared by the executor tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nodes::{GatewaySettings, LlmGateway, PipelineExecutor, PromptStage, StageTemplates};
use pipeline::{
    ChatMessage, Completion, CompletionError, CompletionProvider, CompletionRequest, MessageRole,
    ModelName, PipelineError, PipelineState, Stage, StageKind, StageOutput, TokenUsage,
};

pub fn settings() -> GatewaySettings {
    GatewaySettings::new(ModelName::new("stub-model").unwrap())
}

/// Identifies which persona a request was built for from its system message.
pub fn persona(messages: &[ChatMessage]) -> Option<StageKind> {
    let system = messages.iter().find(|m| m.role == MessageRole::System)?;
    StageKind::ALL
        .into_iter()
        .find(|kind| system.content.to_lowercase().contains(kind.as_str()))
}

fn human(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .filter(|m| m.role == MessageRole::Human)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------

/// Echoes the rendered prompt back and records every request in order.
#[derive(Default)]
pub struct EchoProvider {
    pub calls: Mutex<Vec<CompletionRequest>>,
}

impl EchoProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn personas(&self) -> Vec<Option<StageKind>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| persona(&r.messages))
            .collect()
    }
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let text = format!("[echo] {}", human(&request.messages));
        self.calls.lock().unwrap().push(request);
        Ok(Completion {
            text,
            usage: TokenUsage::new(10, 5),
        })
    }
}

// ---------------------------------------------------------------------------

/// Answers like [`EchoProvider`] but fails the call made for one persona.
pub struct FailingProvider {
    pub fail_on: StageKind,
    pub error: CompletionError,
    pub calls: Mutex<Vec<StageKind>>,
}

impl FailingProvider {
    pub fn new(fail_on: StageKind, error: CompletionError) -> Arc<Self> {
        Arc::new(Self {
            fail_on,
            error,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<StageKind> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let kind = persona(&request.messages).expect("request without a persona");
        self.calls.lock().unwrap().push(kind);
        if kind == self.fail_on {
            return Err(self.error.clone());
        }
        Ok(Completion::from_text(format!(
            "[{kind}] {}",
            human(&request.messages)
        )))
    }
}

// ---------------------------------------------------------------------------

/// Wraps a stage and records the state it saw going in and coming out.
pub struct Probe {
    inner: Box<dyn Stage>,
    pub log: Arc<Mutex<Vec<(StageKind, PipelineState, Option<PipelineState>)>>>,
}

#[async_trait]
impl Stage for Probe {
    fn kind(&self) -> StageKind {
        self.inner.kind()
    }

    async fn run(&self, state: PipelineState) -> Result<StageOutput, PipelineError> {
        let before = state.clone();
        let result = self.inner.run(state).await;
        self.log.lock().unwrap().push((
            self.kind(),
            before,
            result.as_ref().ok().map(|o| o.state.clone()),
        ));
        result
    }
}

pub type ProbeLog = Arc<Mutex<Vec<(StageKind, PipelineState, Option<PipelineState>)>>>;

/// Builds the standard pipeline with every stage wrapped in a [`Probe`].
pub fn probed_executor(provider: Arc<dyn CompletionProvider>) -> (PipelineExecutor, ProbeLog) {
    let gateway = Arc::new(LlmGateway::new(provider, settings()));
    let templates = StageTemplates::default();
    let log: ProbeLog = Arc::new(Mutex::new(Vec::new()));

    let probe = |kind: StageKind| -> Box<dyn Stage> {
        let inner =
            PromptStage::new(kind, templates.for_stage(kind).clone(), gateway.clone()).unwrap();
        Box::new(Probe {
            inner: Box::new(inner),
            log: log.clone(),
        })
    };

    let executor = PipelineExecutor::from_stages(
        probe(StageKind::Coder),
        probe(StageKind::Reviewer),
        probe(StageKind::Refactorer),
    )
    .unwrap();
    (executor, log)
}
