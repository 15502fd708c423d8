//! Field similarity scoring
//!
//! Pure functions mapping a pair of field values to a similarity in [0, 1].
//! Fuzzy fields use a Ratcliff/Obershelp matching-blocks ratio; identity
//! fields (date, time, country, status, handle) use normalized equality.

use once_cell::sync::Lazy;

use poster_core::{EventField, EventRecord, EventWeights};

static FULL_WEIGHTS: Lazy<EventWeights> = Lazy::new(EventWeights::full);
static CORE_WEIGHTS: Lazy<EventWeights> = Lazy::new(EventWeights::core);

// ============================================================================
// Normalization
// ============================================================================

/// Case-fold, trim, and collapse internal whitespace runs to one space
pub fn normalize_text(value: Option<&str>) -> String {
    value
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalize a social handle: text normalization plus a stripped leading `@`
pub fn normalize_handle(value: Option<&str>) -> String {
    let text = normalize_text(value);
    match text.strip_prefix('@') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

// ============================================================================
// Field Scores
// ============================================================================

/// Fuzzy similarity of two text values
///
/// Both empty scores 1.0, exactly one empty scores 0.0. Otherwise equal
/// normalized text scores 1.0 and anything else gets the sequence ratio.
pub fn string_score(gold: Option<&str>, pred: Option<&str>) -> f64 {
    let gold = normalize_text(gold);
    let pred = normalize_text(pred);
    match (gold.is_empty(), pred.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ if gold == pred => 1.0,
        _ => sequence_ratio(&gold, &pred),
    }
}

/// Exact-match similarity of two text values, with the same emptiness rules
pub fn exact_score(gold: Option<&str>, pred: Option<&str>) -> f64 {
    let gold = normalize_text(gold);
    let pred = normalize_text(pred);
    match (gold.is_empty(), pred.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ if gold == pred => 1.0,
        _ => 0.0,
    }
}

/// Exact-match similarity of two social handles, ignoring a leading `@`
pub fn handle_score(gold: Option<&str>, pred: Option<&str>) -> f64 {
    let gold = normalize_handle(gold);
    let pred = normalize_handle(pred);
    exact_score(Some(&gold), Some(&pred))
}

/// Score one event field with the comparison that field calls for
pub fn field_score(gold: &EventRecord, pred: &EventRecord, field: EventField) -> f64 {
    if field.is_exact() {
        exact_score(gold.text(field), pred.text(field))
    } else {
        string_score(gold.text(field), pred.text(field))
    }
}

/// Average of city, province, and country similarity
pub fn location_score(gold: &EventRecord, pred: &EventRecord) -> f64 {
    let city = field_score(gold, pred, EventField::City);
    let province = field_score(gold, pred, EventField::Province);
    let country = field_score(gold, pred, EventField::Country);
    (city + province + country) / 3.0
}

/// Weighted sum of per-field scores; zero-weight fields are not compared
pub fn event_similarity(gold: &EventRecord, pred: &EventRecord, weights: &EventWeights) -> f64 {
    weights
        .iter()
        .filter(|(_, weight)| *weight != 0.0)
        .map(|(field, weight)| weight * field_score(gold, pred, field))
        .sum()
}

/// Event similarity over every field, with the default weights
pub fn event_similarity_full(gold: &EventRecord, pred: &EventRecord) -> f64 {
    event_similarity(gold, pred, &FULL_WEIGHTS)
}

/// Event similarity over the identifying fields only, with the default weights
pub fn event_similarity_core(gold: &EventRecord, pred: &EventRecord) -> f64 {
    event_similarity(gold, pred, &CORE_WEIGHTS)
}

// ============================================================================
// Sequence Ratio
// ============================================================================

/// Ratcliff/Obershelp similarity: `2 * M / (len(a) + len(b))` where `M` is
/// the number of characters in recursively found longest common blocks.
///
/// Inputs are put in a canonical order first so the ratio is symmetric
/// even when longest-block tie-breaking would differ by argument order.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let first: Vec<char> = first.chars().collect();
    let second: Vec<char> = second.chars().collect();

    let total = first.len() + second.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&first, &second) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_common_block(a, b, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }
        matched += size;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }

    matched
}

/// Longest common block of `a[a_lo..a_hi]` and `b[b_lo..b_hi]`, earliest in
/// `a` first and then earliest in `b` on ties. Returns `(i, j, size)`.
fn longest_common_block(
    a: &[char],
    b: &[char],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let width = b_hi - b_lo;
    let mut best = (a_lo, b_lo, 0);
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];

    for i in a_lo..a_hi {
        for j in b_lo..b_hi {
            let column = j - b_lo + 1;
            if a[i] == b[j] {
                let run = previous[column - 1] + 1;
                current[column] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            } else {
                current[column] = 0;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bangkok_event() -> EventRecord {
        EventRecord::new("2024-12-01", "Thailand")
            .with_venue("Lido Connect")
            .with_location("Bangkok", "Bangkok")
            .with_time("20:00")
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some("  Hello   World \n")), "hello world");
        assert_eq!(normalize_text(None), "");
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle(Some(" @SlotMachine ")), "slotmachine");
        assert_eq!(normalize_handle(Some("slotmachine")), "slotmachine");
    }

    #[test]
    fn test_string_score_empty_rules() {
        assert_eq!(string_score(None, Some("  ")), 1.0);
        assert_eq!(string_score(Some("a"), None), 0.0);
        assert_eq!(string_score(None, Some("a")), 0.0);
        assert_eq!(string_score(Some("Lido  Connect"), Some("lido connect")), 1.0);
    }

    #[test]
    fn test_sequence_ratio_known_values() {
        // "abcd" vs "bcde": common block "bcd" -> 2 * 3 / 8
        assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
        assert_eq!(sequence_ratio("same", "same"), 1.0);
        // "lido connect" vs "lido" -> 2 * 4 / 16
        assert!((sequence_ratio("lido connect", "lido") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sequence_ratio_recurses_both_sides() {
        // blocks "ab" and "de" around a mismatch -> 2 * 4 / 10
        assert!((sequence_ratio("abXde", "abYde") - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_string_score_symmetric() {
        let pairs = [("tiger", "tigre"), ("Impact Arena", "impact arena hall"), ("ab", "ba")];
        for (a, b) in pairs {
            assert_eq!(string_score(Some(a), Some(b)), string_score(Some(b), Some(a)));
        }
    }

    #[test]
    fn test_exact_score() {
        assert_eq!(exact_score(Some("Thailand"), Some("thailand ")), 1.0);
        assert_eq!(exact_score(Some("Thailand"), Some("Laos")), 0.0);
        assert_eq!(exact_score(None, None), 1.0);
    }

    #[test]
    fn test_handle_score() {
        assert_eq!(handle_score(Some("@slotmachine"), Some("SlotMachine")), 1.0);
        assert_eq!(handle_score(Some("@a"), Some("@b")), 0.0);
        assert_eq!(handle_score(Some("@"), None), 1.0);
    }

    #[test]
    fn test_location_score() {
        let gold = bangkok_event();
        let mut pred = bangkok_event();
        assert_eq!(location_score(&gold, &pred), 1.0);

        pred.country = "Laos".to_string();
        assert!((location_score(&gold, &pred) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_event_similarity_identical() {
        let event = bangkok_event();
        assert!((event_similarity_full(&event, &event) - 1.0).abs() < 1e-12);
        assert!((event_similarity_core(&event, &event) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_event_similarity_core_ignores_descriptive_fields() {
        let gold = bangkok_event();
        let pred = bangkok_event()
            .with_name("Completely different name")
            .with_time("18:00");

        assert!((event_similarity_core(&gold, &pred) - 1.0).abs() < 1e-12);
        // time (0.05) mismatches, event_name is blank on one side (0.05)
        assert!((event_similarity_full(&gold, &pred) - 0.90).abs() < 1e-12);
    }

    #[test]
    fn test_event_similarity_wrong_date() {
        let gold = bangkok_event();
        let mut pred = bangkok_event();
        pred.date = "2024-12-02".to_string();
        assert!((event_similarity_full(&gold, &pred) - 0.70).abs() < 1e-12);
        assert!((event_similarity_core(&gold, &pred) - 0.625).abs() < 1e-12);
    }
}
