//! Schema validation for poster records
//!
//! Checks an arbitrary JSON value against the poster extraction schema.
//! Every check is local to its field: a malformed field records one
//! violation and validation carries on, so the report lists everything that
//! failed instead of stopping at the first problem.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use poster_core::EventStatus;

pub(crate) static MONTH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("valid month pattern"));
pub(crate) static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));
pub(crate) static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid time pattern"));

/// Keys of a poster object
pub const RECORD_KEYS: [&str; 7] = [
    "artist_name",
    "instagram_handle",
    "tour_name",
    "contact_info",
    "source_month",
    "poster_confidence",
    "events",
];

/// Keys of an event object
pub const EVENT_KEYS: [&str; 10] = [
    "date",
    "event_name",
    "venue",
    "city",
    "province",
    "country",
    "time",
    "ticket_info",
    "status",
    "confidence",
];

// ============================================================================
// Validation Types
// ============================================================================

/// How strictly key sets are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    /// Required keys must be present; extra keys are tolerated
    Loose,
    /// Key sets must match exactly, for the record and every event
    Strict,
}

/// A single failed check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaIssue {
    NotAnObject,
    MissingKey { key: String },
    UnexpectedKey { key: String },
    WrongType { expected: String },
    PatternMismatch { pattern: String },
    OutOfRange,
    InvalidStatus { value: String },
}

/// A failed check and where it happened (e.g. `events[2].date`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaViolation {
    pub path: String,
    pub issue: SchemaIssue,
}

/// Outcome of validating one value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub mode: SchemaMode,
    pub violations: Vec<SchemaViolation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether any violation was recorded at `path`
    pub fn failed_at(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }

    fn push(&mut self, path: impl Into<String>, issue: SchemaIssue) {
        self.violations.push(SchemaViolation {
            path: path.into(),
            issue,
        });
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Check a value against the poster schema
pub fn validate(value: &Value, mode: SchemaMode) -> bool {
    validate_report(value, mode).is_valid()
}

/// Check a value against the poster schema, collecting every failed check
pub fn validate_report(value: &Value, mode: SchemaMode) -> ValidationReport {
    let mut report = ValidationReport {
        mode,
        violations: Vec::new(),
    };

    let Some(object) = value.as_object() else {
        report.push("$", SchemaIssue::NotAnObject);
        return report;
    };

    check_keys(&mut report, "", object, &RECORD_KEYS, mode);

    require_string(&mut report, "artist_name", object.get("artist_name"));
    for key in ["instagram_handle", "tour_name", "contact_info"] {
        nullable_string(&mut report, key, object.get(key));
    }
    matching_string(
        &mut report,
        "source_month",
        object.get("source_month"),
        &MONTH_PATTERN,
    );
    unit_interval(
        &mut report,
        "poster_confidence",
        object.get("poster_confidence"),
    );

    match object.get("events") {
        Some(Value::Array(events)) => {
            for (index, event) in events.iter().enumerate() {
                validate_event(&mut report, index, event, mode);
            }
        }
        // A missing key is already reported by the key check
        None => {}
        Some(_) => report.push(
            "events",
            SchemaIssue::WrongType {
                expected: "array".to_string(),
            },
        ),
    }

    report
}

fn validate_event(report: &mut ValidationReport, index: usize, event: &Value, mode: SchemaMode) {
    let prefix = format!("events[{index}]");
    let Some(object) = event.as_object() else {
        report.push(prefix, SchemaIssue::NotAnObject);
        return;
    };
    let path = |key: &str| format!("{prefix}.{key}");

    check_keys(report, &prefix, object, &EVENT_KEYS, mode);

    matching_string(report, &path("date"), object.get("date"), &DATE_PATTERN);
    require_string(report, &path("country"), object.get("country"));

    match object.get("status") {
        Some(Value::String(status)) => {
            if !EventStatus::ALL.iter().any(|s| s.as_str() == status) {
                report.push(
                    path("status"),
                    SchemaIssue::InvalidStatus {
                        value: status.clone(),
                    },
                );
            }
        }
        _ => report.push(
            path("status"),
            SchemaIssue::WrongType {
                expected: "string".to_string(),
            },
        ),
    }

    match object.get("time") {
        None | Some(Value::Null) => {}
        Some(Value::String(time)) => {
            if !TIME_PATTERN.is_match(time) {
                report.push(
                    path("time"),
                    SchemaIssue::PatternMismatch {
                        pattern: TIME_PATTERN.as_str().to_string(),
                    },
                );
            }
        }
        Some(_) => report.push(
            path("time"),
            SchemaIssue::WrongType {
                expected: "string or null".to_string(),
            },
        ),
    }

    for key in ["event_name", "venue", "city", "province", "ticket_info"] {
        nullable_string(report, &path(key), object.get(key));
    }
    unit_interval(report, &path("confidence"), object.get("confidence"));
}

fn check_keys(
    report: &mut ValidationReport,
    prefix: &str,
    object: &Map<String, Value>,
    expected: &[&str],
    mode: SchemaMode,
) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    for key in expected {
        if !object.contains_key(*key) {
            report.push(
                join(key),
                SchemaIssue::MissingKey {
                    key: key.to_string(),
                },
            );
        }
    }

    if mode == SchemaMode::Strict {
        let expected: BTreeSet<&str> = expected.iter().copied().collect();
        for key in object.keys() {
            if !expected.contains(key.as_str()) {
                report.push(join(key), SchemaIssue::UnexpectedKey { key: key.clone() });
            }
        }
    }
}

fn require_string(report: &mut ValidationReport, path: &str, value: Option<&Value>) {
    if !matches!(value, Some(Value::String(_))) {
        report.push(
            path,
            SchemaIssue::WrongType {
                expected: "string".to_string(),
            },
        );
    }
}

fn nullable_string(report: &mut ValidationReport, path: &str, value: Option<&Value>) {
    if !matches!(value, None | Some(Value::Null) | Some(Value::String(_))) {
        report.push(
            path,
            SchemaIssue::WrongType {
                expected: "string or null".to_string(),
            },
        );
    }
}

fn matching_string(
    report: &mut ValidationReport,
    path: &str,
    value: Option<&Value>,
    pattern: &Regex,
) {
    match value {
        Some(Value::String(text)) if pattern.is_match(text) => {}
        Some(Value::String(_)) => report.push(
            path,
            SchemaIssue::PatternMismatch {
                pattern: pattern.as_str().to_string(),
            },
        ),
        _ => report.push(
            path,
            SchemaIssue::WrongType {
                expected: "string".to_string(),
            },
        ),
    }
}

fn unit_interval(report: &mut ValidationReport, path: &str, value: Option<&Value>) {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Number(number)) => {
            let in_range = number.as_f64().is_some_and(|n| (0.0..=1.0).contains(&n));
            if !in_range {
                report.push(path, SchemaIssue::OutOfRange);
            }
        }
        Some(_) => report.push(
            path,
            SchemaIssue::WrongType {
                expected: "number".to_string(),
            },
        ),
    }
}
