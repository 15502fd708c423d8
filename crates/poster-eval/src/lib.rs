//! Poster Eval - Scoring engine for poster extraction pipelines
//!
//! Scores a pipeline's structured output for one poster against its ground
//! truth, then aggregates per-poster scores with bootstrap statistics:
//! - Schema validation (loose and strict)
//! - Field similarity and optimal event matching
//! - Per-poster quality scores (full and core)
//! - Confidence intervals and pairwise model comparisons
//!
//! Everything here is pure and deterministic given its inputs and the
//! configured bootstrap seed.

pub mod matcher;
pub mod quality;
pub mod recovery;
pub mod schema;
pub mod similarity;
pub mod stats;
pub mod summary;

pub use matcher::{
    match_events, solve_assignment, summarize_matches, CostMatrix, MatchResult, MatchSummary,
    MatrixError,
};
pub use quality::{
    date_metrics, event_count_score, missing_field_rate, overall_score, score_poster,
    structured_score, top_level_score, DateMetrics, PosterScorer, PosterScores, QualityScore,
};
pub use recovery::{recover_json, ParseError, ParseStrength, ParsedPayload, Prediction};
pub use schema::{
    validate, validate_report, SchemaIssue, SchemaMode, SchemaViolation, ValidationReport,
};
pub use similarity::{
    event_similarity, event_similarity_core, event_similarity_full, exact_score, field_score,
    handle_score, location_score, normalize_handle, normalize_text, sequence_ratio, string_score,
};
pub use stats::{
    bootstrap_ci, bootstrap_diff, Bootstrap, BootstrapDiff, BootstrapStat, ComparisonResult,
};
pub use summary::{pairwise_comparisons, ModelScores, ModelSummary};
