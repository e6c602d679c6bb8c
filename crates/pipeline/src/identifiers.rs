//! Newtype domain identifiers.
//!
//! Values that carry identity are wrapped in distinct newtypes so a model name
//! can never be passed where, say, a run identifier is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// UUID-backed identifiers (generated per run)
// ---------------------------------------------------------------------------

/// Identifies a single pipeline execution run.
///
/// Generated fresh for every call to the executor; attached to the run span so
/// all activity from a single run (three LLM calls) can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineRunId(Uuid);

impl PipelineRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PipelineRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// String-backed identifiers (from configuration)
// ---------------------------------------------------------------------------

/// Identifies the model a completion provider is asked to use (e.g. `"gpt-4"`).
///
/// The value is opaque to the pipeline; only the provider adapter interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    /// Creates a new model name, returning `None` if the value is empty or
    /// only whitespace.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.trim().is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Returns the model name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ModelName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "model name must not be empty".to_string())
    }
}

impl From<ModelName> for String {
    fn from(value: ModelName) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_rejects_blank_values() {
        assert!(ModelName::new("").is_none());
        assert!(ModelName::new("   ").is_none());
        assert_eq!(ModelName::new("gpt-4").unwrap().as_str(), "gpt-4");
    }

    #[test]
    fn model_name_deserialisation_enforces_non_empty() {
        let ok: ModelName = serde_json::from_str("\"gpt-4o\"").unwrap();
        assert_eq!(ok.to_string(), "gpt-4o");

        let err = serde_json::from_str::<ModelName>("\"\"");
        assert!(err.is_err());
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(PipelineRunId::new_random(), PipelineRunId::new_random());
    }
}
