//! Configuration loading for the CLI.
//!
//! Values are layered, highest precedence first: command-line flags,
//! environment variables, the TOML config file, built-in defaults. The API
//! key is only ever read from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use llm::{OpenAiConfig, DEFAULT_BASE_URL};
use nodes::{GatewaySettings, StageTemplates};
use pipeline::{ModelName, PipelineError};

/// Config file read when `--config` is not given. Missing is not an error.
pub const DEFAULT_CONFIG_PATH: &str = ".code-review/config.toml";

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Environment variable holding the provider API key.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable overriding the configured model.
pub const ENV_MODEL: &str = "CODE_REVIEW_MODEL";
/// Environment variable overriding the provider base URL.
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";

/// Contents of the TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Model identifier.
    pub model: Option<String>,
    /// Root of the OpenAI-compatible API, e.g. `https://api.openai.com/v1`.
    pub base_url: Option<String>,
    /// Per-call deadline in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Sampling temperature in `[0, 2]`.
    pub temperature: Option<f32>,
    /// Completion length cap.
    pub max_tokens: Option<u32>,
    /// `[prompts.<stage>]` sections; each `system` or `human` key replaces
    /// only that message of the built-in prompt.
    pub prompts: Option<StageTemplates>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigurationError`] on a syntax error or an
    /// unknown key.
    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        toml::from_str(text).map_err(|e| PipelineError::ConfigurationError {
            message: format!("invalid config file: {e}"),
        })
    }
}

/// Values supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// `--model`
    pub model: Option<String>,
    /// `--timeout`
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug)]
pub struct RunConfig {
    /// Provider credentials and endpoint.
    pub openai: OpenAiConfig,
    /// Model and per-call parameters.
    pub gateway: GatewaySettings,
    /// Prompt for each stage.
    pub templates: StageTemplates,
}

/// Reads the config file at `path`, or the default location when `None`.
///
/// # Errors
///
/// Fails if an explicitly named file cannot be read, or if any file that is
/// present does not parse.
pub fn load_file(path: Option<&Path>) -> Result<FileConfig, PipelineError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    match std::fs::read_to_string(&path) {
        Ok(text) => FileConfig::from_toml_str(&text),
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            Ok(FileConfig::default())
        }
        Err(e) => Err(PipelineError::ConfigurationError {
            message: format!("cannot read {}: {e}", path.display()),
        }),
    }
}

/// Layers `overrides`, environment (via `env`), and `file` into a [`RunConfig`].
///
/// Blank environment values count as unset.
///
/// # Errors
///
/// Returns [`PipelineError::ConfigurationError`] if the API key is missing or
/// any value is out of range.
pub fn resolve(
    file: FileConfig,
    overrides: &Overrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<RunConfig, PipelineError> {
    let invalid = |message: String| PipelineError::ConfigurationError { message };
    let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    let api_key = var(ENV_API_KEY).ok_or_else(|| invalid(format!("{ENV_API_KEY} is not set")))?;

    let model = overrides
        .model
        .clone()
        .or_else(|| var(ENV_MODEL))
        .or(file.model)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let model = ModelName::new(model).ok_or_else(|| invalid("model must not be empty".into()))?;

    let base_url = var(ENV_BASE_URL)
        .or(file.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(format!("base_url '{base_url}' must be an http(s) URL")));
    }

    let timeout = match overrides.timeout_secs.or(file.request_timeout_secs) {
        Some(0) => return Err(invalid("request timeout must be at least one second".into())),
        Some(secs) => Some(Duration::from_secs(secs)),
        None => None,
    };

    if let Some(t) = file.temperature {
        if !(t.is_finite() && (0.0..=2.0).contains(&t)) {
            return Err(invalid(format!("temperature {t} is outside [0, 2]")));
        }
    }
    if file.max_tokens == Some(0) {
        return Err(invalid("max_tokens must be positive".into()));
    }

    Ok(RunConfig {
        openai: OpenAiConfig::new(api_key).with_base_url(base_url),
        gateway: GatewaySettings {
            model,
            temperature: file.temperature,
            max_tokens: file.max_tokens,
            timeout,
        },
        templates: file.prompts.unwrap_or_default(),
    })
}
