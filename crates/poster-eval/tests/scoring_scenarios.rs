//! End-to-end scoring scenarios
//!
//! Scores realistic (gold, prediction) pairs through the public API and
//! checks the reported quality and bootstrap statistics.

use poster_core::{EventRecord, StructuredRecord};
use poster_eval::{
    bootstrap_ci, bootstrap_diff, pairwise_comparisons, score_poster, Bootstrap, ModelScores,
    Prediction,
};
use serde_json::json;

/// Helper to build a gold record with complete top-level metadata
fn complete_gold(events: Vec<EventRecord>) -> StructuredRecord {
    let mut record = StructuredRecord::new("Paradox", "2024-11");
    record.instagram_handle = Some("@paradoxband".to_string());
    record.tour_name = Some("Before Dawn Tour".to_string());
    record.contact_info = Some("081-234-5678".to_string());
    record.poster_confidence = Some(0.95);
    record.events = events;
    record
}

fn bangkok_show(date: &str, venue: &str) -> EventRecord {
    EventRecord::new(date, "Thailand")
        .with_venue(venue)
        .with_location("Bangkok", "Bangkok")
}

// =============================================================================
// Per-Poster Scoring
// =============================================================================

#[test]
fn test_identical_prediction_scores_full_marks() {
    let gold = complete_gold(vec![bangkok_show("2024-12-01", "X")]);
    let scores = score_poster(&gold, &Prediction::from_record(&gold));

    assert!(scores.schema_strict_valid);
    assert!((scores.quality.overall - 100.0).abs() < 1e-9);
    assert!((scores.quality.overall_core - 100.0).abs() < 1e-9);
    assert_eq!(scores.quality.missing_field_rate, 0.0);
    assert_eq!(scores.event_count_diff, 0);
}

#[test]
fn test_empty_event_list_prediction() {
    let gold = complete_gold(vec![
        bangkok_show("2024-12-01", "Lido Connect"),
        bangkok_show("2024-12-08", "Impact Arena"),
    ]);
    let scores = score_poster(&gold, &Prediction::from_value(json!({"events": []})));

    assert_eq!(scores.quality.event_count_score, 0.0);
    assert_eq!(scores.quality.event_match_score, 0.0);
    assert_eq!(scores.quality.missing_field_rate, 1.0);
    assert_eq!(scores.quality.top_level_score, 0.0);
    assert!(!scores.schema_strict_valid);
    // Only the parseability credit survives the penalty
    assert!(scores.quality.overall > 0.0 && scores.quality.overall < 5.0);
    assert!((scores.quality.overall - 2.0).abs() < 1e-9);
}

#[test]
fn test_self_identity_for_any_record() {
    let mut gold = complete_gold(vec![
        bangkok_show("2024-10-05", "Voice Space"),
        EventRecord::new("2024-10-12", "Thailand")
            .with_venue("Nimman Convention Centre")
            .with_location("Mueang", "Chiang Mai")
            .with_time("19:30"),
    ]);
    gold.events[0].ticket_info = Some("Ticketmelon".to_string());

    let scores = score_poster(&gold, &Prediction::from_record(&gold));
    assert!((scores.quality.overall - 100.0).abs() < 1e-9);
    assert!((scores.venue_score - 1.0).abs() < 1e-12);
    assert!((scores.location_score - 1.0).abs() < 1e-12);
    assert_eq!(scores.date_metrics.map(|m| m.f1), Some(1.0));
}

#[test]
fn test_reordered_events_still_match() {
    let gold = complete_gold(vec![
        bangkok_show("2024-12-01", "Lido Connect"),
        bangkok_show("2024-12-08", "Impact Arena"),
    ]);
    let mut pred = gold.clone();
    pred.events.reverse();

    let scores = score_poster(&gold, &Prediction::from_record(&pred));
    assert!((scores.quality.event_match_score - 1.0).abs() < 1e-12);
    assert!((scores.quality.overall - 100.0).abs() < 1e-9);
}

#[test]
fn test_fenced_model_output() {
    let gold = complete_gold(vec![bangkok_show("2024-12-01", "X")]);
    let body = serde_json::to_string_pretty(&gold).unwrap();
    let text = format!("```json\n{body}\n```");

    let scores = score_poster(&gold, &Prediction::from_text(&text));
    assert!(scores.parseable_object);
    assert!((scores.quality.overall - 100.0).abs() < 1e-9);
}

#[test]
fn test_scoring_is_deterministic() {
    let gold = complete_gold(vec![bangkok_show("2024-12-01", "Lido Connect")]);
    let mut pred = gold.clone();
    pred.events[0].venue = Some("Lido".to_string());
    pred.tour_name = None;
    let prediction = Prediction::from_record(&pred);

    assert_eq!(score_poster(&gold, &prediction), score_poster(&gold, &prediction));
}

// =============================================================================
// Bootstrap Statistics
// =============================================================================

#[test]
fn test_bootstrap_ci_tight_scores() {
    let stat = bootstrap_ci(&[80.0, 82.0, 81.0, 79.0, 83.0]).unwrap();
    assert!((stat.mean - 81.0).abs() < 1e-12);
    assert!(stat.ci_low < 81.0 && 81.0 < stat.ci_high);
    assert!(stat.ci_high - stat.ci_low < 10.0);
    assert!((stat.std - 2.0_f64.sqrt()).abs() < 1e-12);
}

#[test]
fn test_bootstrap_diff_clear_winner() {
    let diff = bootstrap_diff(&[90.0, 91.0, 89.0], &[50.0, 52.0, 49.0]).unwrap();
    assert!((diff.diff_mean - 39.666_666_666_666_664).abs() < 1e-9);
    assert!(diff.significant);
    assert!(diff.ci_low > 0.0);
    assert_eq!(diff.p_value, 0.0);
}

#[test]
fn test_model_comparison_end_to_end() {
    let gold = complete_gold(vec![bangkok_show("2024-12-01", "Lido Connect")]);
    let mut sloppy = gold.clone();
    sloppy.events[0].date = "2024-12-02".to_string();
    sloppy.instagram_handle = None;

    let mut strong = ModelScores::new("strong");
    let mut weak = ModelScores::new("weak");
    for _ in 0..4 {
        strong.push(score_poster(&gold, &Prediction::from_record(&gold)));
        weak.push(score_poster(&gold, &Prediction::from_record(&sloppy)));
    }

    let bootstrap = Bootstrap::default();
    let strong_summary = strong.summarize(&bootstrap);
    let weak_summary = weak.summarize(&bootstrap);
    assert!(strong_summary.quality.unwrap().mean > weak_summary.quality.unwrap().mean);

    let comparisons = pairwise_comparisons(&[weak, strong], &bootstrap);
    assert_eq!(comparisons.len(), 1);
    assert_eq!(comparisons[0].model_a, "strong");
    assert!(comparisons[0].diff_mean > 0.0);
}
