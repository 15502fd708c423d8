//! Quality aggregation
//!
//! Combines structural validity, top-level metadata accuracy, and optimal
//! event matching into a single 0-100 quality score per poster. Two variants
//! are produced: the full score uses every event field, the core score only
//! the fields that identify a real-world event.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use poster_core::{
    EventField, EventRecord, QualityWeights, ScoringConfig, StructuredRecord, StructuredWeights,
    TopLevelField, TopLevelWeights,
};

use crate::matcher::{summarize_matches, MatchSummary};
use crate::recovery::{ParseStrength, Prediction};
use crate::schema::{validate, SchemaMode, DATE_PATTERN};
use crate::similarity::{event_similarity, exact_score, handle_score, string_score};

// ============================================================================
// Component Scores
// ============================================================================

/// `1 - |n - m| / max(n, m, 1)`, which is 1 exactly when the counts agree
pub fn event_count_score(gold_count: usize, pred_count: usize) -> f64 {
    let denom = gold_count.max(pred_count).max(1) as f64;
    let diff = gold_count.abs_diff(pred_count) as f64;
    (1.0 - diff / denom).clamp(0.0, 1.0)
}

/// Weighted average of top-level field similarities; 0 when there is no
/// parseable prediction object
pub fn top_level_score(
    gold: &StructuredRecord,
    pred: Option<&StructuredRecord>,
    weights: &TopLevelWeights,
) -> f64 {
    let Some(pred) = pred else {
        return 0.0;
    };

    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for (field, weight) in weights.iter() {
        let score = match field {
            TopLevelField::InstagramHandle => handle_score(gold.text(field), pred.text(field)),
            TopLevelField::SourceMonth => exact_score(gold.text(field), pred.text(field)),
            _ => string_score(gold.text(field), pred.text(field)),
        };
        total += weight * score;
        weight_sum += weight;
    }

    if weight_sum > 0.0 {
        total / weight_sum
    } else {
        0.0
    }
}

/// Share of blank essential fields (date, venue, city, province) across the
/// predicted events.
///
/// 0 when no events are expected; 1 when events are expected but none were
/// predicted.
pub fn missing_field_rate(pred_events: &[EventRecord], expected_events: usize) -> f64 {
    if expected_events == 0 {
        return 0.0;
    }
    if pred_events.is_empty() {
        return 1.0;
    }

    let total = pred_events.len() * EventField::ESSENTIAL.len();
    let missing = pred_events
        .iter()
        .flat_map(|event| EventField::ESSENTIAL.iter().map(move |f| event.is_blank(*f)))
        .filter(|blank| *blank)
        .count();
    missing as f64 / total as f64
}

/// Credit for strict schema conformance plus credit for bare parseability
pub fn structured_score(parseable: bool, strict_valid: bool, weights: &StructuredWeights) -> f64 {
    let strict = if strict_valid { 1.0 } else { 0.0 };
    let parsed = if parseable { 1.0 } else { 0.0 };
    weights.strict_schema * strict + weights.parseable * parsed
}

/// Overall 0-100 score.
///
/// The missing-field penalty is subtracted after weighting and before the
/// final clamp, so the unclamped value can go negative.
pub fn overall_score(
    structured: f64,
    top_level: f64,
    event_match: f64,
    event_count: f64,
    missing_field_rate: f64,
    weights: &QualityWeights,
    missing_field_penalty: f64,
) -> f64 {
    let base = weights.structured * structured
        + weights.top_level * top_level
        + weights.event_match * event_match
        + weights.event_count * event_count;
    let score = base * 100.0 - missing_field_penalty * missing_field_rate;
    score.clamp(0.0, 100.0)
}

// ============================================================================
// Date Metrics
// ============================================================================

/// Precision/recall/F1 of well-formed event dates, counted as multisets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Compare the dates of gold and predicted events.
///
/// Returns `None` when there is no prediction object or when neither side
/// lists a well-formed date.
pub fn date_metrics(
    gold: &StructuredRecord,
    pred: Option<&StructuredRecord>,
) -> Option<DateMetrics> {
    let pred = pred?;
    let gold_dates = date_counts(&gold.events);
    let pred_dates = date_counts(&pred.events);

    let gold_total: usize = gold_dates.values().sum();
    let pred_total: usize = pred_dates.values().sum();
    if gold_total == 0 && pred_total == 0 {
        return None;
    }

    let matched: usize = gold_dates
        .iter()
        .map(|(date, count)| (*count).min(pred_dates.get(date).copied().unwrap_or(0)))
        .sum();

    let precision = if pred_total > 0 {
        matched as f64 / pred_total as f64
    } else {
        0.0
    };
    let recall = if gold_total > 0 {
        matched as f64 / gold_total as f64
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Some(DateMetrics {
        precision,
        recall,
        f1,
    })
}

fn date_counts(events: &[EventRecord]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for event in events {
        if DATE_PATTERN.is_match(&event.date) {
            *counts.entry(event.date.as_str()).or_insert(0) += 1;
        }
    }
    counts
}

// ============================================================================
// Poster Scoring
// ============================================================================

/// Component scores and the two overall scores for one poster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub structured_score: f64,
    pub top_level_score: f64,
    pub event_match_score: f64,
    pub core_event_match_score: f64,
    pub event_count_score: f64,
    pub missing_field_rate: f64,
    /// Overall score using full event similarity
    pub overall: f64,
    /// Overall score using core event similarity
    pub overall_core: f64,
}

/// Everything measured for one (gold, prediction) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosterScores {
    pub quality: QualityScore,
    pub venue_score: f64,
    pub location_score: f64,
    pub date_metrics: Option<DateMetrics>,
    pub event_count_diff: usize,
    pub schema_loose_valid: bool,
    pub schema_strict_valid: bool,
    pub prediction_present: bool,
    pub parseable_object: bool,
    pub parse_strength: Option<ParseStrength>,
}

/// Scores predictions against ground truth with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct PosterScorer {
    config: ScoringConfig,
}

impl PosterScorer {
    /// Create a scorer with the default weights
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer with custom weights
    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one prediction against its ground truth
    pub fn score(&self, gold: &StructuredRecord, pred: &Prediction) -> PosterScores {
        let config = &self.config;
        let pred_record = pred.record();
        let parseable = pred.is_parseable_object();
        let conforms = |mode| parseable && pred.value().is_some_and(|v| validate(v, mode));
        let strict_valid = conforms(SchemaMode::Strict);
        let loose_valid = conforms(SchemaMode::Loose);

        let gold_events = gold.events.as_slice();
        let pred_events: &[EventRecord] = pred_record
            .map(|r| r.events.as_slice())
            .unwrap_or_default();

        let full: MatchSummary = summarize_matches(gold_events, pred_events, |g, p| {
            event_similarity(g, p, &config.event)
        });
        let core = summarize_matches(gold_events, pred_events, |g, p| {
            event_similarity(g, p, &config.core_event)
        });

        let structured = structured_score(parseable, strict_valid, &config.structured);
        let top_level = top_level_score(gold, pred_record, &config.top_level);
        let event_count = event_count_score(gold_events.len(), pred_events.len());
        let missing = missing_field_rate(pred_events, gold_events.len());

        let overall_with = |event_match: f64| {
            overall_score(
                structured,
                top_level,
                event_match,
                event_count,
                missing,
                &config.quality,
                config.missing_field_penalty,
            )
        };

        let quality = QualityScore {
            structured_score: structured,
            top_level_score: top_level,
            event_match_score: full.match_score,
            core_event_match_score: core.match_score,
            event_count_score: event_count,
            missing_field_rate: missing,
            overall: overall_with(full.match_score),
            overall_core: overall_with(core.match_score),
        };

        debug!(
            gold_events = gold_events.len(),
            pred_events = pred_events.len(),
            overall = quality.overall,
            overall_core = quality.overall_core,
            "scored poster"
        );

        PosterScores {
            quality,
            venue_score: full.venue_score,
            location_score: full.location_score,
            date_metrics: date_metrics(gold, pred_record),
            event_count_diff: gold_events.len().abs_diff(pred_events.len()),
            schema_loose_valid: loose_valid,
            schema_strict_valid: strict_valid,
            prediction_present: pred.is_present(),
            parseable_object: parseable,
            parse_strength: pred.strength(),
        }
    }
}

/// Score one prediction with the default weights
pub fn score_poster(gold: &StructuredRecord, pred: &Prediction) -> PosterScores {
    PosterScorer::new().score(gold, pred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gold_record() -> StructuredRecord {
        let mut record = StructuredRecord::new("Slot Machine", "2024-11");
        record.instagram_handle = Some("@slotmachine".to_string());
        record.tour_name = Some("Asia Tour".to_string());
        record.contact_info = Some("tickets@example.com".to_string());
        record.events = vec![
            EventRecord::new("2024-12-01", "Thailand")
                .with_venue("Lido Connect")
                .with_location("Bangkok", "Bangkok"),
            EventRecord::new("2024-12-07", "Thailand")
                .with_venue("Central Festival")
                .with_location("Mueang", "Chiang Mai"),
        ];
        record
    }

    #[test]
    fn test_event_count_score() {
        assert_eq!(event_count_score(0, 0), 1.0);
        assert_eq!(event_count_score(3, 3), 1.0);
        assert_eq!(event_count_score(2, 0), 0.0);
        assert_eq!(event_count_score(0, 4), 0.0);
        assert!((event_count_score(4, 3) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_top_level_score_handle_normalized() {
        let gold = gold_record();
        let mut pred = gold.clone();
        pred.instagram_handle = Some("SlotMachine".to_string());
        let score = top_level_score(&gold, Some(&pred), &TopLevelWeights::default());
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_top_level_score_without_prediction() {
        let gold = gold_record();
        assert_eq!(top_level_score(&gold, None, &TopLevelWeights::default()), 0.0);
    }

    #[test]
    fn test_top_level_score_wrong_month() {
        let gold = gold_record();
        let mut pred = gold.clone();
        pred.source_month = "2024-10".to_string();
        let score = top_level_score(&gold, Some(&pred), &TopLevelWeights::default());
        assert!((score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_missing_field_rate() {
        let complete = EventRecord::new("2024-12-01", "Thailand")
            .with_venue("Lido")
            .with_location("Bangkok", "Bangkok");
        let sparse = EventRecord::new("2024-12-02", "Thailand").with_venue("  ");

        assert_eq!(missing_field_rate(&[], 0), 0.0);
        assert_eq!(missing_field_rate(&[complete.clone()], 0), 0.0);
        assert_eq!(missing_field_rate(&[], 2), 1.0);
        assert_eq!(missing_field_rate(&[complete.clone()], 1), 0.0);
        // sparse: venue, city, province blank -> 3 of 8
        assert!((missing_field_rate(&[complete, sparse], 2) - 3.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_structured_score() {
        let weights = StructuredWeights::default();
        assert_eq!(structured_score(false, false, &weights), 0.0);
        assert!((structured_score(true, false, &weights) - 0.3).abs() < 1e-12);
        assert!((structured_score(true, true, &weights) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_overall_penalty_before_clamp() {
        let weights = QualityWeights::default();
        // base 0.3 * 0.4 = 12 points, penalty 10 -> 2
        let score = overall_score(0.3, 0.0, 0.0, 0.0, 1.0, &weights, 10.0);
        assert!((score - 2.0).abs() < 1e-9);

        // base 5 points, penalty 10 -> clamped to 0
        let score = overall_score(0.0, 0.0, 0.0, 0.5, 1.0, &weights, 10.0);
        assert_eq!(score, 0.0);

        let score = overall_score(1.0, 1.0, 1.0, 1.0, 0.0, &weights, 10.0);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_date_metrics() {
        let gold = gold_record();
        let mut pred = gold.clone();
        pred.events[1].date = "Dec 7".to_string();
        pred.events.push(EventRecord::new("2024-12-01", "Thailand"));

        let metrics = date_metrics(&gold, Some(&pred)).unwrap();
        // pred dates: 12-01 twice (one well-formed extra); gold: 12-01, 12-07
        assert!((metrics.precision - 0.5).abs() < 1e-12);
        assert!((metrics.recall - 0.5).abs() < 1e-12);
        assert!((metrics.f1 - 0.5).abs() < 1e-12);

        assert!(date_metrics(&gold, None).is_none());
        let empty = StructuredRecord::new("A", "2024-01");
        assert!(date_metrics(&empty, Some(&empty)).is_none());
    }

    #[test]
    fn test_score_unparseable_prediction() {
        let gold = gold_record();
        let scores = score_poster(&gold, &Prediction::from_text("I could not read the poster"));

        assert_eq!(scores.quality.structured_score, 0.0);
        assert_eq!(scores.quality.top_level_score, 0.0);
        assert_eq!(scores.quality.event_match_score, 0.0);
        assert_eq!(scores.quality.missing_field_rate, 1.0);
        assert_eq!(scores.quality.overall, 0.0);
        assert!(!scores.prediction_present);
    }

    #[test]
    fn test_score_non_object_prediction() {
        let gold = gold_record();
        let scores = score_poster(&gold, &Prediction::from_value(json!(["2024-12-01"])));
        assert!(scores.prediction_present);
        assert!(!scores.parseable_object);
        assert_eq!(scores.quality.structured_score, 0.0);
        assert!(scores.date_metrics.is_none());
    }

    #[test]
    fn test_score_loose_but_not_strict() {
        let gold = gold_record();
        let mut value = gold.to_value().unwrap();
        value["model_notes"] = json!("extra key");

        let scores = score_poster(&gold, &Prediction::from_value(value));
        assert!(scores.schema_loose_valid);
        assert!(!scores.schema_strict_valid);
        assert!((scores.quality.structured_score - 0.3).abs() < 1e-12);
        assert!((scores.quality.event_match_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_score_core_variant_ignores_names() {
        let gold = gold_record();
        let mut pred = gold.clone();
        for event in &mut pred.events {
            event.event_name = Some("Live in concert".to_string());
        }

        let scores = score_poster(&gold, &Prediction::from_record(&pred));
        assert!((scores.quality.core_event_match_score - 1.0).abs() < 1e-12);
        assert!(scores.quality.event_match_score < 1.0);
        assert!(scores.quality.overall_core > scores.quality.overall);
    }
}
