//! Schema checks for question candidates.
//!
//! Candidates arrive as loosely shaped JSON, either from the generator or from
//! the bundled bank. Rules are applied in a fixed order and the first failure
//! is reported.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::{Question, OPTION_COUNT};

/// Field names the correct option index has been seen under.
const CORRECT_INDEX_FIELDS: [&str; 3] = ["correctAnswer", "correctIndex", "correct_answer"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("candidate is not a JSON object")]
    NotAnObject,
    #[error("missing/invalid question text")]
    Text,
    #[error("must have exactly {OPTION_COUNT} options, got {found}")]
    OptionCount { found: usize },
    #[error("must have exactly {OPTION_COUNT} options, option {index} is not a string")]
    OptionType { index: usize },
    #[error("option {index} is empty")]
    EmptyOption { index: usize },
    #[error("options {first} and {second} are identical")]
    DuplicateOption { first: usize, second: usize },
    #[error("correctAnswer must be 0-3")]
    CorrectAnswer,
    #[error("missing/invalid explanation")]
    Explanation,
}

impl ValidationError {
    /// Name of the offending field in the wire format.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::NotAnObject => "candidate",
            ValidationError::Text => "question",
            ValidationError::OptionCount { .. }
            | ValidationError::OptionType { .. }
            | ValidationError::EmptyOption { .. }
            | ValidationError::DuplicateOption { .. } => "options",
            ValidationError::CorrectAnswer => "correctAnswer",
            ValidationError::Explanation => "explanation",
        }
    }
}

pub fn validate(candidate: &Value) -> Result<Question, ValidationError> {
    let object = candidate.as_object().ok_or(ValidationError::NotAnObject)?;

    let text = non_empty_str(object.get("question")).ok_or(ValidationError::Text)?;
    let options = options(object.get("options"))?;
    let correct_index = correct_index(object)?;
    let explanation = non_empty_str(object.get("explanation")).ok_or(ValidationError::Explanation)?;

    Ok(Question::from_parts(
        text.to_string(),
        options,
        correct_index,
        explanation.to_string(),
    ))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn options(value: Option<&Value>) -> Result<[String; OPTION_COUNT], ValidationError> {
    let entries = match value {
        Some(Value::Array(entries)) => entries,
        _ => return Err(ValidationError::OptionCount { found: 0 }),
    };
    if entries.len() != OPTION_COUNT {
        return Err(ValidationError::OptionCount {
            found: entries.len(),
        });
    }

    let mut trimmed: [String; OPTION_COUNT] = Default::default();
    for (index, entry) in entries.iter().enumerate() {
        let option = entry.as_str().ok_or(ValidationError::OptionType { index })?.trim();
        if option.is_empty() {
            return Err(ValidationError::EmptyOption { index });
        }
        trimmed[index] = option.to_string();
    }

    let mut seen = HashSet::new();
    for (index, option) in trimmed.iter().enumerate() {
        if !seen.insert(option.as_str()) {
            let first = trimmed.iter().position(|o| o == option).unwrap_or(index);
            return Err(ValidationError::DuplicateOption {
                first,
                second: index,
            });
        }
    }

    Ok(trimmed)
}

fn correct_index(object: &Map<String, Value>) -> Result<usize, ValidationError> {
    CORRECT_INDEX_FIELDS
        .iter()
        .find_map(|field| object.get(*field))
        .and_then(Value::as_u64)
        .filter(|index| *index < OPTION_COUNT as u64)
        .map(|index| index as usize)
        .ok_or(ValidationError::CorrectAnswer)
}
