//! Built-in persona prompts for the three stages.

use serde::{Deserialize, Serialize};

use pipeline::{PromptTemplate, StageKind};

const CODER_SYSTEM: &str = "You are a Coder. Write Python code based on the given requirements.";
const CODER_HUMAN: &str = "{input}";

const REVIEWER_SYSTEM: &str = "You are a Reviewer. Review the given code and suggest improvements.";
const REVIEWER_HUMAN: &str = "{code}";

const REFACTORER_SYSTEM: &str =
    "You are a Refactorer. Implement the suggested improvements in the code.";
const REFACTORER_HUMAN: &str = "Code:\n{code}\n\nReview:\n{review}";

/// One prompt template per stage.
///
/// When deserialised, each stage section and each message within it is
/// optional and overrides only that part of the built-in prompt. Unknown
/// stage or message keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StageOverrides")]
pub struct StageTemplates {
    /// Prompt for the Coder stage.
    pub coder: PromptTemplate,
    /// Prompt for the Reviewer stage.
    pub reviewer: PromptTemplate,
    /// Prompt for the Refactorer stage.
    pub refactorer: PromptTemplate,
}

impl StageTemplates {
    /// Returns the template for `stage`.
    pub fn for_stage(&self, stage: StageKind) -> &PromptTemplate {
        match stage {
            StageKind::Coder => &self.coder,
            StageKind::Reviewer => &self.reviewer,
            StageKind::Refactorer => &self.refactorer,
        }
    }
}

impl Default for StageTemplates {
    fn default() -> Self {
        Self {
            coder: PromptTemplate::new(CODER_SYSTEM, CODER_HUMAN),
            reviewer: PromptTemplate::new(REVIEWER_SYSTEM, REVIEWER_HUMAN),
            refactorer: PromptTemplate::new(REFACTORER_SYSTEM, REFACTORER_HUMAN),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StageOverrides {
    coder: TemplateOverride,
    reviewer: TemplateOverride,
    refactorer: TemplateOverride,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateOverride {
    system: Option<String>,
    human: Option<String>,
}

impl TemplateOverride {
    fn apply(self, base: &mut PromptTemplate) {
        if let Some(system) = self.system {
            base.system = system;
        }
        if let Some(human) = self.human {
            base.human = human;
        }
    }
}

impl From<StageOverrides> for StageTemplates {
    fn from(overrides: StageOverrides) -> Self {
        let mut templates = Self::default();
        overrides.coder.apply(&mut templates.coder);
        overrides.reviewer.apply(&mut templates.reviewer);
        overrides.refactorer.apply(&mut templates.refactorer);
        templates
    }
}
