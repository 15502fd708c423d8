//! Bootstrap statistics
//!
//! Per-poster quality scores are bounded, skewed, and few, so confidence
//! intervals and pairwise differences are estimated by resampling with
//! replacement rather than assuming normality. Every call reseeds from the
//! configured seed, so a report run is reproducible bit-for-bit.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use poster_core::BootstrapConfig;

// ============================================================================
// Result Types
// ============================================================================

/// Mean of a score list with its bootstrap confidence interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapStat {
    pub mean: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    /// Population standard deviation of the raw scores
    pub std: f64,
}

/// Bootstrap estimate of `mean(a) - mean(b)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapDiff {
    /// Point estimate from the raw scores
    pub diff_mean: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub p_value: f64,
    /// The confidence interval excludes zero
    pub significant: bool,
}

/// A named pairwise comparison between two pipelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub model_a: String,
    pub model_b: String,
    pub diff_mean: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub p_value: f64,
    pub significant: bool,
}

impl ComparisonResult {
    pub fn new(
        model_a: impl Into<String>,
        model_b: impl Into<String>,
        diff: BootstrapDiff,
    ) -> Self {
        Self {
            model_a: model_a.into(),
            model_b: model_b.into(),
            diff_mean: diff.diff_mean,
            ci_low: diff.ci_low,
            ci_high: diff.ci_high,
            p_value: diff.p_value,
            significant: diff.significant,
        }
    }
}

// ============================================================================
// Bootstrap Engine
// ============================================================================

/// Seeded bootstrap resampler
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    config: BootstrapConfig,
}

impl Bootstrap {
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Confidence interval of the mean; `None` for an empty list
    pub fn ci(&self, scores: &[f64]) -> Option<BootstrapStat> {
        let samples = self.config.samples;
        if scores.is_empty() || samples == 0 {
            return None;
        }

        debug!(
            scores = scores.len(),
            samples,
            seed = self.config.seed,
            "bootstrapping confidence interval"
        );

        let mut rng = self.rng();
        let mut means: Vec<f64> = (0..samples)
            .map(|_| resample_mean(scores, &mut rng))
            .collect();
        means.sort_by(|left, right| left.total_cmp(right));

        let (low, high) = self.percentile_indices();
        Some(BootstrapStat {
            mean: mean(scores)?,
            ci_low: means[low],
            ci_high: means[high],
            std: population_std(scores)?,
        })
    }

    /// Bootstrap difference of means; `None` if either list is empty.
    ///
    /// Both lists are resampled independently in every iteration, so they
    /// may differ in length.
    pub fn diff(&self, scores_a: &[f64], scores_b: &[f64]) -> Option<BootstrapDiff> {
        let samples = self.config.samples;
        if scores_a.is_empty() || scores_b.is_empty() || samples == 0 {
            return None;
        }

        debug!(
            scores_a = scores_a.len(),
            scores_b = scores_b.len(),
            samples,
            seed = self.config.seed,
            "bootstrapping difference of means"
        );

        let mut rng = self.rng();
        let mut diffs: Vec<f64> = (0..samples)
            .map(|_| {
                let mean_a = resample_mean(scores_a, &mut rng);
                let mean_b = resample_mean(scores_b, &mut rng);
                mean_a - mean_b
            })
            .collect();
        diffs.sort_by(|left, right| left.total_cmp(right));

        let (low, high) = self.percentile_indices();
        let ci_low = diffs[low];
        let ci_high = diffs[high];

        let non_positive = diffs.iter().filter(|d| **d <= 0.0).count();
        let positive = samples - non_positive;
        let p_value = 2.0 * (non_positive.min(positive) as f64 / samples as f64);

        Some(BootstrapDiff {
            diff_mean: mean(scores_a)? - mean(scores_b)?,
            ci_low,
            ci_high,
            p_value,
            significant: ci_low > 0.0 || ci_high < 0.0,
        })
    }

    /// Named comparison of two score lists
    pub fn compare(
        &self,
        model_a: &str,
        scores_a: &[f64],
        model_b: &str,
        scores_b: &[f64],
    ) -> Option<ComparisonResult> {
        self.diff(scores_a, scores_b)
            .map(|diff| ComparisonResult::new(model_a, model_b, diff))
    }

    fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.config.seed)
    }

    /// Indices of the `alpha/2` and `1 - alpha/2` ranks in the sorted resamples
    fn percentile_indices(&self) -> (usize, usize) {
        let samples = self.config.samples;
        let last = samples.saturating_sub(1);
        let half_alpha = self.config.alpha / 2.0;
        let low = ((half_alpha * samples as f64).floor() as usize).min(last);
        let high = (((1.0 - half_alpha) * samples as f64).floor() as usize)
            .saturating_sub(1)
            .min(last);
        (low, high.max(low))
    }
}

fn resample_mean(values: &[f64], rng: &mut ChaCha8Rng) -> f64 {
    let count = values.len();
    let total: f64 = (0..count).map(|_| values[rng.gen_range(0..count)]).sum();
    total / count as f64
}

/// Confidence interval with the default bootstrap settings
pub fn bootstrap_ci(scores: &[f64]) -> Option<BootstrapStat> {
    Bootstrap::default().ci(scores)
}

/// Difference of means with the default bootstrap settings
pub fn bootstrap_diff(scores_a: &[f64], scores_b: &[f64]) -> Option<BootstrapDiff> {
    Bootstrap::default().diff(scores_a, scores_b)
}

// ============================================================================
// Descriptive Statistics
// ============================================================================

/// Arithmetic mean; `None` for an empty list
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation; `None` for an empty list
pub fn population_std(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}
