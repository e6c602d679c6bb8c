//! Rendering of a completed run on stdout.

use clap::ValueEnum;

use pipeline::{PipelineRun, PipelineState};

/// How the result is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The three outputs under labelled headings.
    Text,
    /// The full run record, including usage and timings.
    Json,
}

/// Renders `code`, `review`, and `refactored_code`, in that order.
pub fn render_text(state: &PipelineState) -> String {
    format!(
        "Initial Code:\n{}\n\nReview Feedback:\n{}\n\nRefactored Code:\n{}\n",
        state.code().unwrap_or_default(),
        state.review().unwrap_or_default(),
        state.refactored_code().unwrap_or_default(),
    )
}

/// Renders the whole run as pretty-printed JSON.
///
/// # Errors
///
/// Propagates serialisation failures.
pub fn render_json(run: &PipelineRun) -> serde_json::Result<String> {
    let mut out = serde_json::to_string_pretty(run)?;
    out.push('\n');
    Ok(out)
}

/// Renders `run` in `format`.
///
/// # Errors
///
/// Propagates serialisation failures.
pub fn render(run: &PipelineRun, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(&run.state)),
        OutputFormat::Json => render_json(run),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{PipelineRunId, StageKind, Timestamp, TokenUsage};

    fn completed_run() -> PipelineRun {
        let mut state = PipelineState::new("palindrome checker").unwrap();
        state.record(StageKind::Coder, "def f(s): return s == s[::-1]");
        state.record(StageKind::Reviewer, "Normalise case first.");
        state.record(StageKind::Refactorer, "def f(s): s = s.lower(); return s == s[::-1]");
        PipelineRun {
            run_id: PipelineRunId::new_random(),
            state,
            usage: TokenUsage::new(30, 20),
            stages: Vec::new(),
            started_at: Timestamp::now(),
            finished_at: Timestamp::now(),
        }
    }

    #[test]
    fn text_output_lists_sections_in_order() {
        let text = render(&completed_run(), OutputFormat::Text).unwrap();

        let code = text.find("Initial Code:\ndef f(s)").unwrap();
        let review = text.find("Review Feedback:\nNormalise").unwrap();
        let refactored = text.find("Refactored Code:\ndef f(s): s = s.lower()").unwrap();
        assert!(code < review && review < refactored);
    }

    #[test]
    fn json_output_contains_state_and_usage() {
        let json = render(&completed_run(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["state"]["input"], "palindrome checker");
        assert_eq!(value["state"]["review"], "Normalise case first.");
        assert_eq!(value["usage"]["prompt"], 30);
    }
}
