//! Poster Bench CLI - Command-line interface
//!
//! Usage:
//!   poster-bench score --gold <file> --pred <file>
//!   poster-bench validate --input <file> [--strict]
//!   poster-bench compare --a <file> --b <file> [--name-a A] [--name-b B]
//!   poster-bench summarize --gold-dir <dir> --predictions <dir>
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use poster_core::{BenchConfig, LoggingConfig, StructuredRecord};
use poster_eval::{
    pairwise_comparisons, recover_json, validate_report, Bootstrap, BootstrapStat,
    ComparisonResult, ModelScores, ModelSummary, PosterScorer, Prediction, SchemaMode,
};

#[derive(Parser)]
#[command(name = "poster-bench")]
#[command(about = "Score and compare poster extraction pipelines")]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults plus environment overrides if omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one prediction against its ground truth
    Score {
        /// Ground-truth record (JSON)
        #[arg(long)]
        gold: PathBuf,
        /// Raw model output
        #[arg(long)]
        pred: PathBuf,
    },
    /// Check a record against the poster schema
    Validate {
        #[arg(long)]
        input: PathBuf,
        /// Require exact key sets
        #[arg(long)]
        strict: bool,
    },
    /// Bootstrap comparison of two score lists (JSON arrays of numbers)
    Compare {
        #[arg(long)]
        a: PathBuf,
        #[arg(long)]
        b: PathBuf,
        #[arg(long, default_value = "a")]
        name_a: String,
        #[arg(long, default_value = "b")]
        name_b: String,
    },
    /// Score every model directory against a ground-truth directory
    Summarize {
        /// Directory of `<poster_id>.json` ground-truth records
        #[arg(long)]
        gold_dir: PathBuf,
        /// Directory with one sub-directory of `<poster_id>.json` outputs per model
        #[arg(long)]
        predictions: PathBuf,
    },
}

#[derive(Serialize)]
struct NamedStat {
    model: String,
    #[serde(flatten)]
    stat: BootstrapStat,
}

#[derive(Serialize)]
struct CompareOutput {
    a: Option<NamedStat>,
    b: Option<NamedStat>,
    comparison: Option<ComparisonResult>,
}

#[derive(Serialize)]
struct SummaryOutput {
    posters: usize,
    models: Vec<ModelSummary>,
    comparisons: Vec<ComparisonResult>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    let output = match cli.command {
        Commands::Score { gold, pred } => {
            let gold = read_gold(&gold)?;
            let text = read_text(&pred)?;
            let prediction = Prediction::from_text(&text);
            let scores = PosterScorer::with_config(config.scoring).score(&gold, &prediction);
            serde_json::to_value(scores)?
        }
        Commands::Validate { input, strict } => {
            let text = read_text(&input)?;
            let payload = recover_json(&text)
                .with_context(|| format!("no JSON payload in {}", input.display()))?;
            let mode = if strict {
                SchemaMode::Strict
            } else {
                SchemaMode::Loose
            };
            let report = validate_report(&payload.value, mode);
            info!(
                valid = report.is_valid(),
                violations = report.violations.len(),
                "validated record"
            );
            serde_json::to_value(report)?
        }
        Commands::Compare {
            a,
            b,
            name_a,
            name_b,
        } => {
            let bootstrap = Bootstrap::new(config.bootstrap);
            let scores_a = read_scores(&a)?;
            let scores_b = read_scores(&b)?;
            let named = |model: &str, scores: &[f64]| {
                bootstrap.ci(scores).map(|stat| NamedStat {
                    model: model.to_string(),
                    stat,
                })
            };
            serde_json::to_value(CompareOutput {
                a: named(&name_a, &scores_a),
                b: named(&name_b, &scores_b),
                comparison: bootstrap.compare(&name_a, &scores_a, &name_b, &scores_b),
            })?
        }
        Commands::Summarize {
            gold_dir,
            predictions,
        } => {
            let gold = load_gold_dir(&gold_dir)?;
            let scorer = PosterScorer::with_config(config.scoring);
            let models = score_models(&scorer, &gold, &predictions)?;

            let bootstrap = Bootstrap::new(config.bootstrap);
            let summaries = models.iter().map(|m| m.summarize(&bootstrap)).collect();
            let comparisons = pairwise_comparisons(&models, &bootstrap);
            serde_json::to_value(SummaryOutput {
                posters: gold.len(),
                models: summaries,
                comparisons,
            })?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ============================================================================
// Setup
// ============================================================================

fn load_config(path: Option<&Path>) -> anyhow::Result<BenchConfig> {
    BenchConfig::load(path).context("invalid configuration")
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Input Loading
// ============================================================================

fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_gold(path: &Path) -> anyhow::Result<StructuredRecord> {
    let text = read_text(path)?;
    parse_gold(&text).with_context(|| format!("invalid ground-truth record {}", path.display()))
}

/// Ground truth that misses the schema (unknown status, absent country) is
/// still scored, read the same lenient way as predictions
fn parse_gold(text: &str) -> anyhow::Result<StructuredRecord> {
    let strict_err = match StructuredRecord::from_json(text) {
        Ok(record) => return Ok(record),
        Err(err) => err,
    };
    let value: Value = serde_json::from_str(text)?;
    let Some(record) = StructuredRecord::from_value_lenient(&value) else {
        bail!("expected a JSON object");
    };
    warn!(error = %strict_err, "ground truth does not match the schema, reading leniently");
    Ok(record)
}

fn read_scores(path: &Path) -> anyhow::Result<Vec<f64>> {
    let text = read_text(path)?;
    parse_scores(&text).with_context(|| format!("invalid score list {}", path.display()))
}

fn parse_scores(text: &str) -> anyhow::Result<Vec<f64>> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        bail!("expected a JSON array of numbers");
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item.as_f64() {
            Some(score) if score.is_finite() => Ok(score),
            _ => bail!("element {index} is not a finite number"),
        })
        .collect()
}

/// Ground-truth records keyed by poster id; files that are not JSON objects
/// are skipped
fn load_gold_dir(dir: &Path) -> anyhow::Result<BTreeMap<String, StructuredRecord>> {
    let mut gold = BTreeMap::new();
    for path in json_files(dir)? {
        let Some(poster_id) = poster_id(&path) else {
            continue;
        };
        match read_gold(&path) {
            Ok(record) => {
                gold.insert(poster_id, record);
            }
            Err(err) => warn!(path = %path.display(), error = %err, "skipping ground truth"),
        }
    }

    if gold.is_empty() {
        bail!("no ground-truth records found in {}", dir.display());
    }
    info!(posters = gold.len(), "loaded ground truth");
    Ok(gold)
}

fn score_models(
    scorer: &PosterScorer,
    gold: &BTreeMap<String, StructuredRecord>,
    predictions: &Path,
) -> anyhow::Result<Vec<ModelScores>> {
    let mut model_dirs: Vec<PathBuf> = fs::read_dir(predictions)
        .with_context(|| format!("failed to list {}", predictions.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    model_dirs.sort();

    let mut models = Vec::with_capacity(model_dirs.len());
    for dir in model_dirs {
        let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let mut scores = ModelScores::new(name);
        for (poster_id, record) in gold {
            let path = dir.join(format!("{poster_id}.json"));
            let prediction = match fs::read_to_string(&path) {
                Ok(text) => Prediction::from_text(&text),
                Err(_) => Prediction::missing(),
            };
            scores.push(scorer.score(record, &prediction));
        }
        info!(model = %scores.model, posters = scores.posters.len(), "scored model");
        models.push(scores);
    }
    Ok(models)
}

fn json_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// `<poster_id>.json` -> `<poster_id>`; sidecar files like `x.meta.json` are ignored
fn poster_id(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.contains('.') {
        return None;
    }
    Some(stem.to_string())
}
