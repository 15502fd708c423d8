//! Poster Core - Record types, error types, and scoring configuration
//!
//! This crate defines the shared abstractions used by the benchmark:
//! - Poster records (artist/tour metadata plus a list of events)
//! - Field identifiers used by the similarity weights
//! - Common error types
//! - Configuration management (weights, bootstrap, logging)

pub mod config;
pub mod record;

pub use config::{
    BenchConfig, BootstrapConfig, ConfigError, EventWeights, LoggingConfig, QualityWeights,
    ScoringConfig, StructuredWeights, TopLevelWeights,
};
pub use record::{EventField, EventRecord, EventStatus, StructuredRecord, TopLevelField};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for benchmark operations
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BenchError::InvalidRecord("events must be a list".to_string());
        assert_eq!(err.to_string(), "Invalid record: events must be a list");

        let err: BenchError = ConfigError::InvalidValue {
            key: "bootstrap.samples".to_string(),
            value: "0".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("Configuration error:"));
    }
}
