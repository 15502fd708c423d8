//! Benchmark Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! defaults matching the published benchmark weights. A `BenchConfig` is
//! built once per report run and passed by reference into the scorer and
//! the bootstrap engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::record::{EventField, TopLevelField};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Main benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct BenchConfig {
    /// Field weights and quality formula
    pub scoring: ScoringConfig,

    /// Bootstrap resampling settings
    pub bootstrap: BootstrapConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl BenchConfig {
    /// Load the run configuration: the TOML file if given (else defaults),
    /// then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?.with_env_override()?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    /// Parse from TOML text; missing sections and keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(samples) = parse_override(&lookup, "BENCH_BOOTSTRAP_SAMPLES")? {
            self.bootstrap.samples = samples;
        }
        if let Some(seed) = parse_override(&lookup, "BENCH_BOOTSTRAP_SEED")? {
            self.bootstrap.seed = seed;
        }
        if let Some(alpha) = parse_override(&lookup, "BENCH_BOOTSTRAP_ALPHA")? {
            self.bootstrap.alpha = alpha;
        }
        if let Some(penalty) = parse_override(&lookup, "BENCH_MISSING_FIELD_PENALTY")? {
            self.scoring.missing_field_penalty = penalty;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = matches!(json.trim(), "1" | "true" | "TRUE" | "yes");
        }

        Ok(())
    }

    /// Check that weights and bootstrap settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        self.bootstrap.validate()
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}

// ============================================================================
// Scoring Weights
// ============================================================================

/// Scoring configuration: every weight used by the quality score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weights for top-level poster metadata
    pub top_level: TopLevelWeights,

    /// Weights for full event similarity
    pub event: EventWeights,

    /// Weights for core (identity-only) event similarity
    pub core_event: EventWeights,

    /// Weights combining the component scores into the overall score
    pub quality: QualityWeights,

    /// Weights for the structural validity score
    pub structured: StructuredWeights,

    /// Points subtracted per unit of missing-field rate
    pub missing_field_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            top_level: TopLevelWeights::default(),
            event: EventWeights::full(),
            core_event: EventWeights::core(),
            quality: QualityWeights::default(),
            structured: StructuredWeights::default(),
            missing_field_penalty: 10.0,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let top_level: Vec<f64> = self.top_level.iter().map(|(_, w)| w).collect();
        check_non_negative("top_level", &top_level)?;
        if top_level.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::InvalidWeights {
                section: "top_level".to_string(),
                reason: "weights must have a positive sum".to_string(),
            });
        }

        let event: Vec<f64> = self.event.iter().map(|(_, w)| w).collect();
        check_unit_sum("event", &event)?;

        let core_event: Vec<f64> = self.core_event.iter().map(|(_, w)| w).collect();
        check_unit_sum("core_event", &core_event)?;

        let quality = [
            self.quality.structured,
            self.quality.top_level,
            self.quality.event_match,
            self.quality.event_count,
        ];
        check_unit_sum("quality", &quality)?;

        check_non_negative(
            "structured",
            &[self.structured.strict_schema, self.structured.parseable],
        )?;

        if !self.missing_field_penalty.is_finite() || self.missing_field_penalty < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "missing_field_penalty".to_string(),
                value: self.missing_field_penalty.to_string(),
            });
        }

        Ok(())
    }
}

fn check_non_negative(section: &str, weights: &[f64]) -> Result<(), ConfigError> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ConfigError::InvalidWeights {
            section: section.to_string(),
            reason: "weights must be finite and non-negative".to_string(),
        });
    }
    Ok(())
}

fn check_unit_sum(section: &str, weights: &[f64]) -> Result<(), ConfigError> {
    check_non_negative(section, weights)?;
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ConfigError::InvalidWeights {
            section: section.to_string(),
            reason: format!("weights must sum to 1.0, got {sum}"),
        });
    }
    Ok(())
}

/// Top-level metadata weights (normalized by their sum when applied)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TopLevelWeights {
    pub artist_name: f64,
    pub instagram_handle: f64,
    pub tour_name: f64,
    pub contact_info: f64,
    pub source_month: f64,
}

impl Default for TopLevelWeights {
    fn default() -> Self {
        Self {
            artist_name: 0.35,
            instagram_handle: 0.15,
            tour_name: 0.2,
            contact_info: 0.1,
            source_month: 0.2,
        }
    }
}

impl TopLevelWeights {
    pub fn weight(&self, field: TopLevelField) -> f64 {
        match field {
            TopLevelField::ArtistName => self.artist_name,
            TopLevelField::InstagramHandle => self.instagram_handle,
            TopLevelField::TourName => self.tour_name,
            TopLevelField::ContactInfo => self.contact_info,
            TopLevelField::SourceMonth => self.source_month,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TopLevelField, f64)> + '_ {
        TopLevelField::ALL
            .into_iter()
            .map(move |field| (field, self.weight(field)))
    }
}

/// Per-field weights for event similarity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventWeights {
    pub date: f64,
    pub time: f64,
    pub venue: f64,
    pub city: f64,
    pub province: f64,
    pub country: f64,
    pub event_name: f64,
    pub ticket_info: f64,
    pub status: f64,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self::full()
    }
}

impl EventWeights {
    /// Weights over every event field
    pub fn full() -> Self {
        Self {
            date: 0.30,
            time: 0.05,
            venue: 0.20,
            city: 0.15,
            province: 0.10,
            country: 0.05,
            event_name: 0.05,
            ticket_info: 0.05,
            status: 0.05,
        }
    }

    /// Weights restricted to the fields that identify a real-world event
    pub fn core() -> Self {
        Self {
            date: 0.375,
            time: 0.0,
            venue: 0.25,
            city: 0.1875,
            province: 0.125,
            country: 0.0625,
            event_name: 0.0,
            ticket_info: 0.0,
            status: 0.0,
        }
    }

    pub fn weight(&self, field: EventField) -> f64 {
        match field {
            EventField::Date => self.date,
            EventField::Time => self.time,
            EventField::Venue => self.venue,
            EventField::City => self.city,
            EventField::Province => self.province,
            EventField::Country => self.country,
            EventField::EventName => self.event_name,
            EventField::TicketInfo => self.ticket_info,
            EventField::Status => self.status,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventField, f64)> + '_ {
        EventField::ALL
            .into_iter()
            .map(move |field| (field, self.weight(field)))
    }
}

/// Weights of the component scores in the overall quality score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityWeights {
    pub structured: f64,
    pub top_level: f64,
    pub event_match: f64,
    pub event_count: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            structured: 0.4,
            top_level: 0.15,
            event_match: 0.35,
            event_count: 0.1,
        }
    }
}

/// Credit for strict schema conformance versus bare parseability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StructuredWeights {
    pub strict_schema: f64,
    pub parseable: f64,
}

impl Default for StructuredWeights {
    fn default() -> Self {
        Self {
            strict_schema: 0.7,
            parseable: 0.3,
        }
    }
}

// ============================================================================
// Bootstrap and Logging
// ============================================================================

/// Bootstrap resampling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of resamples
    pub samples: usize,

    /// RNG seed shared by every resampling in a report run
    pub seed: u64,

    /// Two-sided significance level (0.05 gives a 95% interval)
    pub alpha: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            seed: 23,
            alpha: 0.05,
        }
    }
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::InvalidValue {
                key: "bootstrap.samples".to_string(),
                value: self.samples.to_string(),
            });
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::InvalidValue {
                key: "bootstrap.alpha".to_string(),
                value: self.alpha.to_string(),
            });
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid {section} weights: {reason}")]
    InvalidWeights { section: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.bootstrap.samples, 1000);
        assert_eq!(config.bootstrap.seed, 23);
        assert_eq!(config.scoring.missing_field_penalty, 10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let full: f64 = EventWeights::full().iter().map(|(_, w)| w).sum();
        let core: f64 = EventWeights::core().iter().map(|(_, w)| w).sum();
        let top: f64 = TopLevelWeights::default().iter().map(|(_, w)| w).sum();
        assert!((full - 1.0).abs() < 1e-9);
        assert!((core - 1.0).abs() < 1e-9);
        assert!((top - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_core_weights_ignore_descriptive_fields() {
        let core = EventWeights::core();
        assert_eq!(core.weight(EventField::EventName), 0.0);
        assert_eq!(core.weight(EventField::Time), 0.0);
        assert_eq!(core.weight(EventField::TicketInfo), 0.0);
        assert_eq!(core.weight(EventField::Status), 0.0);
    }

    #[test]
    fn test_partial_toml() {
        let config = BenchConfig::from_toml_str(
            r#"
            [bootstrap]
            samples = 200

            [scoring]
            missing_field_penalty = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(config.bootstrap.samples, 200);
        assert_eq!(config.bootstrap.seed, 23);
        assert_eq!(config.scoring.missing_field_penalty, 5.0);
        assert_eq!(config.scoring.event, EventWeights::full());
    }

    #[test]
    fn test_invalid_toml() {
        let err = BenchConfig::from_toml_str("[bootstrap\nsamples = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("BENCH_BOOTSTRAP_SEED", "7"),
            ("BENCH_BOOTSTRAP_ALPHA", "0.1"),
            ("LOG_JSON", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = BenchConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bootstrap.seed, 7);
        assert!((config.bootstrap.alpha - 0.1).abs() < 1e-12);
        assert_eq!(config.bootstrap.samples, 1000);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_override_invalid_value() {
        let mut config = BenchConfig::default();
        let err = config
            .apply_overrides(|key| {
                (key == "BENCH_BOOTSTRAP_SAMPLES").then(|| "many".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_weights() {
        let mut config = BenchConfig::default();
        config.scoring.event.date = 0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeights { .. })
        ));

        let mut config = BenchConfig::default();
        config.bootstrap.alpha = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = BenchConfig::load(Some(Path::new("/nonexistent/poster-bench.toml"))).unwrap_err();
        assert!(matches!(
            err,
            crate::BenchError::Config(ConfigError::FileReadError { .. })
        ));
    }
}
