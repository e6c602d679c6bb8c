//! Code-review pipeline CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: layer command-line flags, environment variables,
//!    and `.code-review/config.toml` into a validated [`config::RunConfig`].
//! 2. **Wire observability**: install `tracing-subscriber` with a pretty or
//!    JSON layer on stderr and, when configured, an OpenTelemetry OTLP
//!    exporter. All `tracing` spans emitted by every crate flow through it.
//! 3. **Construct infrastructure**: create the concrete
//!    [`llm::OpenAiProvider`] and inject it into [`nodes::PipelineExecutor`].
//! 4. **Run once**: execute Coder, Reviewer, and Refactorer for the task and
//!    print the result on stdout. Any failure exits non-zero with nothing
//!    printed on stdout.

mod config;
mod output;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use llm::OpenAiProvider;
use nodes::PipelineExecutor;

use crate::config::Overrides;
use crate::output::OutputFormat;
use crate::telemetry::LogFormat;

const DEFAULT_TASK: &str = "Write a function that checks if a string is a palindrome";

/// Generate code for a task, review it, and refactor it with an LLM.
#[derive(Debug, Parser)]
#[command(name = "code-review", version, about)]
struct Cli {
    /// Natural-language description of the code to write.
    #[arg(default_value = DEFAULT_TASK)]
    task: String,

    /// Path to a TOML config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Model identifier; overrides CODE_REVIEW_MODEL and the config file.
    #[arg(long)]
    model: Option<String>,

    /// Per-call timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Output format on stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let guard = match telemetry::init(cli.log_format) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(cli).await;
    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "code review pipeline failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    };

    guard.shutdown();
    code
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file = config::load_file(cli.config.as_deref())?;
    let overrides = Overrides {
        model: cli.model,
        timeout_secs: cli.timeout,
    };
    let config = config::resolve(file, &overrides, |key| std::env::var(key).ok())?;

    info!(
        model = %config.gateway.model,
        base_url = %config.openai.base_url,
        "starting code review pipeline"
    );

    let provider = Arc::new(OpenAiProvider::new(config.openai));
    let executor = PipelineExecutor::new(provider, config.gateway, config.templates)?;

    let run = executor.run_task(cli.task).await?;
    let rendered = output::render(&run, cli.format).context("failed to render output")?;
    print!("{rendered}");
    Ok(())
}
