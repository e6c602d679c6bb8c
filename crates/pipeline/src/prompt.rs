//! Role-structured prompt templates.
//!
//! A [`PromptTemplate`] pairs a fixed `system` instruction with a `human`
//! message. Both strings may reference pipeline state through `{name}`
//! placeholders; `{{` and `}}` produce literal braces. Rendering fails rather
//! than leaving a placeholder unsubstituted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ChatMessage;

/// Failure to parse or render a [`PromptTemplate`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TemplateError {
    /// A placeholder names a variable that was not supplied.
    #[error("Template references unknown variable '{name}'")]
    UnknownVariable {
        /// The placeholder name.
        name: String,
    },

    /// A `{` without a matching `}` (or a lone `}`) at the given byte offset.
    #[error("Unbalanced brace at byte {position}")]
    Unbalanced {
        /// Byte offset of the offending brace.
        position: usize,
    },

    /// Text between braces is not a valid variable name.
    #[error("Invalid placeholder '{{{name}}}' at byte {position}")]
    InvalidPlaceholder {
        /// Byte offset of the opening brace.
        position: usize,
        /// The text found between the braces.
        name: String,
    },
}

/// Two-message prompt: a persona instruction and a state-derived request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptTemplate {
    /// Template for the `system` message.
    pub system: String,
    /// Template for the `human` message.
    pub human: String,
}

impl PromptTemplate {
    /// Creates a template from its two message strings.
    pub fn new(system: impl Into<String>, human: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            human: human.into(),
        }
    }

    /// Returns every placeholder name used by either message.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if either message is syntactically invalid.
    pub fn variables(&self) -> Result<BTreeSet<String>, TemplateError> {
        let mut names = BTreeSet::new();
        for text in [&self.system, &self.human] {
            for piece in parse(text)? {
                if let Piece::Variable(name) = piece {
                    names.insert(name.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Checks that the template parses and only references `available` names.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error, or [`TemplateError::UnknownVariable`]
    /// for the first (alphabetical) name that is not available.
    pub fn validate(&self, available: &[&str]) -> Result<(), TemplateError> {
        match self
            .variables()?
            .into_iter()
            .find(|name| !available.contains(&name.as_str()))
        {
            Some(name) => Err(TemplateError::UnknownVariable { name }),
            None => Ok(()),
        }
    }

    /// Renders `[system, human]` messages, substituting `vars`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] on a syntax error or a placeholder with no
    /// entry in `vars`.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<Vec<ChatMessage>, TemplateError> {
        Ok(vec![
            ChatMessage::system(render_text(&self.system, vars)?),
            ChatMessage::human(render_text(&self.human, vars)?),
        ])
    }
}

// ---------------------------------------------------------------------------
// Placeholder parsing
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Piece<'a> {
    Text(&'a str),
    Variable(&'a str),
}

// Braces are ASCII, so byte offsets of '{' / '}' are always char boundaries.
fn parse(template: &str) -> Result<Vec<Piece<'_>>, TemplateError> {
    let bytes = template.as_bytes();
    let mut pieces = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                push_text(&mut pieces, template, literal_start, i);
                pieces.push(Piece::Text("{"));
                i += 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                push_text(&mut pieces, template, literal_start, i);
                pieces.push(Piece::Text("}"));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                let close = template[i + 1..]
                    .find('}')
                    .map(|offset| i + 1 + offset)
                    .ok_or(TemplateError::Unbalanced { position: i })?;
                let name = &template[i + 1..close];
                if !is_variable_name(name) {
                    return Err(TemplateError::InvalidPlaceholder {
                        position: i,
                        name: name.to_string(),
                    });
                }
                push_text(&mut pieces, template, literal_start, i);
                pieces.push(Piece::Variable(name));
                i = close + 1;
                literal_start = i;
            }
            b'}' => return Err(TemplateError::Unbalanced { position: i }),
            _ => i += 1,
        }
    }
    push_text(&mut pieces, template, literal_start, bytes.len());

    Ok(pieces)
}

fn push_text<'a>(pieces: &mut Vec<Piece<'a>>, template: &'a str, start: usize, end: usize) {
    if end > start {
        pieces.push(Piece::Text(&template[start..end]));
    }
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn render_text(template: &str, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    for piece in parse(template)? {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Variable(name) => {
                let value = vars
                    .iter()
                    .find_map(|(key, value)| (*key == name).then_some(*value))
                    .ok_or_else(|| TemplateError::UnknownVariable {
                        name: name.to_string(),
                    })?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}
