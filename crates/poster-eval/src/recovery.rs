//! Prediction payload recovery
//!
//! Model outputs are often wrapped in Markdown fences or surrounded by
//! commentary. Recovery is a two-stage parse: a strict parse of the whole
//! (unfenced) text, then a fallback that parses the outermost bracketed
//! span. A recovered payload is weaker evidence than a strict one and is
//! reported as such.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use poster_core::StructuredRecord;

/// Errors from recovering a JSON payload
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("payload is empty")]
    Empty,

    #[error("no JSON object or array found in payload")]
    NoJsonFound,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

/// How a payload was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStrength {
    /// The whole text (minus a code fence) parsed as JSON
    Strict,
    /// Only a bracketed substring parsed as JSON
    Recovered,
}

/// A parsed JSON payload and how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPayload {
    pub value: Value,
    pub strength: ParseStrength,
}

/// Parse a model output, falling back to the outermost bracketed span
pub fn recover_json(text: &str) -> Result<ParsedPayload, ParseError> {
    let cleaned = strip_code_fence(text.trim());
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Ok(ParsedPayload {
            value,
            strength: ParseStrength::Strict,
        });
    }

    let start = cleaned.find(['{', '[']);
    let end = cleaned.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if end > start => {
            let snippet = &cleaned[start..=end];
            debug!(start, end, "falling back to bracketed JSON span");
            serde_json::from_str(snippet)
                .map(|value| ParsedPayload {
                    value,
                    strength: ParseStrength::Recovered,
                })
                .map_err(ParseError::InvalidJson)
        }
        _ => Err(ParseError::NoJsonFound),
    }
}

fn strip_code_fence(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }

    let body = match text.find('\n') {
        Some(newline) => &text[newline + 1..],
        None => "",
    };
    let body = body.trim_end();
    let body = match body.rfind('\n') {
        Some(newline) if body[newline + 1..].starts_with("```") => &body[..newline],
        None if body.starts_with("```") => "",
        _ => body,
    };
    body.trim()
}

// ============================================================================
// Prediction
// ============================================================================

/// A pipeline's output for one poster, as seen by the scorer
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    value: Option<Value>,
    record: Option<StructuredRecord>,
    strength: Option<ParseStrength>,
}

impl Prediction {
    /// No output was produced for this poster
    pub fn missing() -> Self {
        Self::default()
    }

    /// An already-parsed JSON value
    pub fn from_value(value: Value) -> Self {
        Self::with_strength(value, ParseStrength::Strict)
    }

    /// Raw model output text; unparseable text yields a missing prediction
    pub fn from_text(text: &str) -> Self {
        match recover_json(text) {
            Ok(payload) => Self::with_strength(payload.value, payload.strength),
            Err(err) => {
                warn!(error = %err, "prediction could not be parsed");
                Self::missing()
            }
        }
    }

    /// A conforming record, serialized with every schema key
    pub fn from_record(record: &StructuredRecord) -> Self {
        match record.to_value() {
            Ok(value) => Self::from_value(value),
            Err(err) => {
                warn!(error = %err, "record could not be serialized");
                Self::missing()
            }
        }
    }

    fn with_strength(value: Value, strength: ParseStrength) -> Self {
        let record = StructuredRecord::from_value_lenient(&value);
        Self {
            value: Some(value),
            record,
            strength: Some(strength),
        }
    }

    /// The parsed JSON value, if any
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Typed view of the prediction; present iff the value is a JSON object
    pub fn record(&self) -> Option<&StructuredRecord> {
        self.record.as_ref()
    }

    /// How the payload was parsed, `None` when missing
    pub fn strength(&self) -> Option<ParseStrength> {
        self.strength
    }

    /// Whether any JSON value was obtained
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// Whether the payload parsed to a JSON object
    pub fn is_parseable_object(&self) -> bool {
        self.record.is_some()
    }
}
