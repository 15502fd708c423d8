//! Optimal event matching
//!
//! Pairs gold events with predicted events one-to-one so that total
//! similarity is maximal. The pairing is solved as a minimum-cost perfect
//! matching on a square matrix (Kuhn-Munkres, O(k^3)), padded with
//! zero-similarity rows/columns when the lists differ in length.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use poster_core::{EventField, EventRecord};

use crate::similarity::{field_score, location_score};

/// Errors from building a cost matrix
#[derive(Error, Debug, PartialEq)]
pub enum MatrixError {
    #[error("cost matrix must be square: row {row} has {len} columns, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("cost at ({row}, {col}) is not finite")]
    NonFinite { row: usize, col: usize },
}

// ============================================================================
// Cost Matrix
// ============================================================================

/// Square matrix of finite assignment costs
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    size: usize,
    costs: Vec<f64>,
}

impl CostMatrix {
    /// A `size` x `size` matrix with every cell set to `fill`
    pub fn filled(size: usize, fill: f64) -> Self {
        let fill = if fill.is_finite() { fill } else { 0.0 };
        Self {
            size,
            costs: vec![fill; size * size],
        }
    }

    /// Build from rows, rejecting non-square or non-finite input
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, MatrixError> {
        let size = rows.len();
        let mut costs = Vec::with_capacity(size * size);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != size {
                return Err(MatrixError::NotSquare {
                    row,
                    len: values.len(),
                    expected: size,
                });
            }
            for (col, cost) in values.iter().enumerate() {
                if !cost.is_finite() {
                    return Err(MatrixError::NonFinite { row, col });
                }
                costs.push(*cost);
            }
        }
        Ok(Self { size, costs })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.costs[row * self.size + col]
    }

    /// Set a cell; non-finite costs are ignored
    pub fn set(&mut self, row: usize, col: usize, cost: f64) {
        if cost.is_finite() {
            self.costs[row * self.size + col] = cost;
        }
    }

    /// Total cost of an assignment (row `i` takes column `assignment[i]`)
    pub fn total(&self, assignment: &[usize]) -> f64 {
        assignment
            .iter()
            .enumerate()
            .map(|(row, col)| self.get(row, *col))
            .sum()
    }
}

/// Minimum-cost perfect matching of a square cost matrix.
///
/// Returns `assignment` where row `i` is matched to column `assignment[i]`.
/// Uses the shortest augmenting path formulation with row/column potentials.
pub fn solve_assignment(cost: &CostMatrix) -> Vec<usize> {
    let n = cost.size();
    if n == 0 {
        return Vec::new();
    }

    // 1-based; index 0 is the virtual source column
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    let mut owner = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        owner[0] = row;
        let mut col0 = 0;
        let mut min_slack = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[col0] = true;
            let row0 = owner[col0];
            let mut delta = f64::INFINITY;
            let mut col1 = 0;

            for col in 1..=n {
                if used[col] {
                    continue;
                }
                let slack = cost.get(row0 - 1, col - 1) - u[row0] - v[col];
                if slack < min_slack[col] {
                    min_slack[col] = slack;
                    way[col] = col0;
                }
                if min_slack[col] < delta {
                    delta = min_slack[col];
                    col1 = col;
                }
            }

            for col in 0..=n {
                if used[col] {
                    u[owner[col]] += delta;
                    v[col] -= delta;
                } else {
                    min_slack[col] -= delta;
                }
            }

            col0 = col1;
            if owner[col0] == 0 {
                break;
            }
        }

        loop {
            let col1 = way[col0];
            owner[col0] = owner[col1];
            col0 = col1;
            if col0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0usize; n];
    for col in 1..=n {
        if owner[col] > 0 {
            assignment[owner[col] - 1] = col - 1;
        }
    }
    assignment
}

// ============================================================================
// Event Matching
// ============================================================================

/// Matching outcome for one gold event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub gold_index: usize,
    /// `None` when the gold event was left unmatched
    pub pred_index: Option<usize>,
    pub similarity: f64,
}

/// Optimal one-to-one matching of gold events to predicted events.
///
/// Returns one result per gold event, in gold order. Gold events beyond the
/// number of predictions are left unmatched with similarity 0.
pub fn match_events<F>(
    gold: &[EventRecord],
    pred: &[EventRecord],
    similarity: F,
) -> Vec<MatchResult>
where
    F: Fn(&EventRecord, &EventRecord) -> f64,
{
    let size = gold.len().max(pred.len());
    if size == 0 {
        return Vec::new();
    }

    let mut scores = vec![0.0_f64; gold.len() * pred.len()];
    let mut cost = CostMatrix::filled(size, 1.0);
    for (i, gold_event) in gold.iter().enumerate() {
        for (j, pred_event) in pred.iter().enumerate() {
            let score = clamp_unit(similarity(gold_event, pred_event));
            scores[i * pred.len() + j] = score;
            cost.set(i, j, 1.0 - score);
        }
    }

    debug!(
        gold = gold.len(),
        pred = pred.len(),
        size,
        "solving event assignment"
    );
    let assignment = solve_assignment(&cost);

    (0..gold.len())
        .map(|i| match assignment.get(i) {
            Some(&j) if j < pred.len() => MatchResult {
                gold_index: i,
                pred_index: Some(j),
                similarity: scores[i * pred.len() + j],
            },
            _ => MatchResult {
                gold_index: i,
                pred_index: None,
                similarity: 0.0,
            },
        })
        .collect()
}

fn clamp_unit(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Per-poster averages over an optimal event matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Mean matched similarity over gold events (0 for unmatched)
    pub match_score: f64,
    /// Mean venue similarity of matched pairs over gold events
    pub venue_score: f64,
    /// Mean location similarity of matched pairs over gold events
    pub location_score: f64,
    pub matches: Vec<MatchResult>,
}

impl MatchSummary {
    fn uniform(score: f64) -> Self {
        Self {
            match_score: score,
            venue_score: score,
            location_score: score,
            matches: Vec::new(),
        }
    }
}

/// Match events and average the results over the gold events.
///
/// Two empty lists are a vacuous success (all scores 1.0); predictions
/// without any gold events earn nothing (all scores 0.0).
pub fn summarize_matches<F>(
    gold: &[EventRecord],
    pred: &[EventRecord],
    similarity: F,
) -> MatchSummary
where
    F: Fn(&EventRecord, &EventRecord) -> f64,
{
    if gold.is_empty() {
        return MatchSummary::uniform(if pred.is_empty() { 1.0 } else { 0.0 });
    }

    let matches = match_events(gold, pred, similarity);
    let mut match_total = 0.0;
    let mut venue_total = 0.0;
    let mut location_total = 0.0;

    for result in &matches {
        match_total += result.similarity;
        if let Some(j) = result.pred_index {
            let gold_event = &gold[result.gold_index];
            venue_total += field_score(gold_event, &pred[j], EventField::Venue);
            location_total += location_score(gold_event, &pred[j]);
        }
    }

    let count = gold.len() as f64;
    MatchSummary {
        match_score: match_total / count,
        venue_score: venue_total / count,
        location_score: location_total / count,
        matches,
    }
}
