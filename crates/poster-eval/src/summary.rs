//! Model summaries
//!
//! Rolls per-poster scores up into one row per pipeline and compares
//! pipelines pairwise on their full overall scores.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::quality::PosterScores;
use crate::stats::{mean, Bootstrap, BootstrapStat, ComparisonResult};

/// All per-poster scores of one pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelScores {
    pub model: String,
    pub posters: Vec<PosterScores>,
}

/// Aggregate row for one pipeline
///
/// Rates are shares of scored posters; averages are `None` when no poster
/// was scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model: String,
    pub posters: usize,
    pub missing_predictions: usize,
    pub quality: Option<BootstrapStat>,
    pub core_quality: Option<BootstrapStat>,
    pub schema_valid_rate: Option<f64>,
    pub schema_strict_rate: Option<f64>,
    pub json_parse_rate: Option<f64>,
    pub avg_top_level_score: Option<f64>,
    pub avg_event_match_score: Option<f64>,
    pub avg_core_event_match_score: Option<f64>,
    pub avg_event_count_score: Option<f64>,
    pub avg_location_score: Option<f64>,
    pub avg_venue_score: Option<f64>,
    pub avg_missing_field_rate: Option<f64>,
    pub avg_event_diff: Option<f64>,
    /// Posters without date metrics count as F1 0
    pub avg_date_f1: Option<f64>,
}

impl ModelScores {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            posters: Vec::new(),
        }
    }

    pub fn push(&mut self, scores: PosterScores) {
        self.posters.push(scores);
    }

    /// Full overall scores in poster order
    pub fn overall_scores(&self) -> Vec<f64> {
        self.collect(|p| p.quality.overall)
    }

    /// Core overall scores in poster order
    pub fn core_scores(&self) -> Vec<f64> {
        self.collect(|p| p.quality.overall_core)
    }

    pub fn summarize(&self, bootstrap: &Bootstrap) -> ModelSummary {
        let summary = ModelSummary {
            model: self.model.clone(),
            posters: self.posters.len(),
            missing_predictions: self.posters.iter().filter(|p| !p.prediction_present).count(),
            quality: bootstrap.ci(&self.overall_scores()),
            core_quality: bootstrap.ci(&self.core_scores()),
            schema_valid_rate: self.rate(|p| p.schema_loose_valid),
            schema_strict_rate: self.rate(|p| p.schema_strict_valid),
            json_parse_rate: self.rate(|p| p.parseable_object),
            avg_top_level_score: self.average(|p| p.quality.top_level_score),
            avg_event_match_score: self.average(|p| p.quality.event_match_score),
            avg_core_event_match_score: self.average(|p| p.quality.core_event_match_score),
            avg_event_count_score: self.average(|p| p.quality.event_count_score),
            avg_location_score: self.average(|p| p.location_score),
            avg_venue_score: self.average(|p| p.venue_score),
            avg_missing_field_rate: self.average(|p| p.quality.missing_field_rate),
            avg_event_diff: self.average(|p| p.event_count_diff as f64),
            avg_date_f1: self.average(|p| p.date_metrics.map_or(0.0, |m| m.f1)),
        };

        info!(
            model = %summary.model,
            posters = summary.posters,
            missing = summary.missing_predictions,
            quality = summary.quality.map(|q| q.mean),
            "summarized model"
        );

        summary
    }

    fn collect(&self, value: impl Fn(&PosterScores) -> f64) -> Vec<f64> {
        self.posters.iter().map(value).collect()
    }

    fn average(&self, value: impl Fn(&PosterScores) -> f64) -> Option<f64> {
        mean(&self.collect(value))
    }

    fn rate(&self, flag: impl Fn(&PosterScores) -> bool) -> Option<f64> {
        self.average(|p| if flag(p) { 1.0 } else { 0.0 })
    }
}

/// Compare every pair of models on their full overall scores.
///
/// Models are ordered by name and each unordered pair appears once with the
/// lexically smaller name as `model_a`. Pairs where either side has no
/// scores are skipped.
pub fn pairwise_comparisons(
    models: &[ModelScores],
    bootstrap: &Bootstrap,
) -> Vec<ComparisonResult> {
    let mut ordered: Vec<&ModelScores> = models.iter().collect();
    ordered.sort_by(|left, right| left.model.cmp(&right.model));

    let mut comparisons = Vec::new();
    for (i, left) in ordered.iter().enumerate() {
        let left_scores = left.overall_scores();
        for right in &ordered[i + 1..] {
            let right_scores = right.overall_scores();
            if let Some(result) =
                bootstrap.compare(&left.model, &left_scores, &right.model, &right_scores)
            {
                info!(
                    model_a = %result.model_a,
                    model_b = %result.model_b,
                    diff = result.diff_mean,
                    significant = result.significant,
                    "compared models"
                );
                comparisons.push(result);
            }
        }
    }
    comparisons
}
