// ============================================================
// Layer 6 — Scoring and Metrics Logging
// ============================================================
// SquadScorer: SQuAD-v2 style evaluation of predictions.
//
//   exact — prediction equals a reference after normalisation
//   f1    — token overlap F1 against the best-matching reference
//
// Normalisation: lowercase, drop ASCII punctuation, drop the
// articles a / an / the, collapse whitespace. A no-answer example
// is scored against "" — predicting "" is an exact match.
//
// The scorer is built by whoever runs an evaluation and lives for
// that call only; there is no process-wide metric object.
//
// MetricsLogger appends one CSV row per training epoch. The
// header comes from the EpochMetrics field names and is written
// only while the file is still empty:
//
//   epoch,train_loss,learning_rate,exact,f1
//   1,3.1245,3e-5,41.2,55.31

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::example::{Example, Prediction};

/// Aggregate scores in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquadScores {
    pub exact: f64,
    pub f1:    f64,
    pub total: usize,
}

#[derive(Debug, Default)]
pub struct SquadScorer;

fn normalize_answer(s: &str) -> Vec<String> {
    let lower: String = s
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    lower
        .split_whitespace()
        .filter(|w| !matches!(*w, "a" | "an" | "the"))
        .map(str::to_string)
        .collect()
}

fn exact_match(prediction: &str, reference: &str) -> f64 {
    if normalize_answer(prediction) == normalize_answer(reference) { 1.0 } else { 0.0 }
}

fn f1_score(prediction: &str, reference: &str) -> f64 {
    let pred_tokens = normalize_answer(prediction);
    let ref_tokens  = normalize_answer(reference);

    // Either side empty: F1 is 1 when both are empty, else 0
    if pred_tokens.is_empty() || ref_tokens.is_empty() {
        return if pred_tokens == ref_tokens { 1.0 } else { 0.0 };
    }

    let mut ref_counts: HashMap<&str, usize> = HashMap::new();
    for t in &ref_tokens {
        *ref_counts.entry(t.as_str()).or_insert(0) += 1;
    }
    let mut common = 0usize;
    for t in &pred_tokens {
        if let Some(n) = ref_counts.get_mut(t.as_str()) {
            if *n > 0 {
                *n -= 1;
                common += 1;
            }
        }
    }
    if common == 0 {
        return 0.0;
    }

    let precision = common as f64 / pred_tokens.len() as f64;
    let recall    = common as f64 / ref_tokens.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

impl SquadScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score predictions against the examples' reference answers.
    /// Examples without a prediction count as predicting "".
    pub fn compute(&self, predictions: &[Prediction], references: &[Example]) -> SquadScores {
        let by_id: HashMap<&str, &str> = predictions
            .iter()
            .map(|p| (p.question_id.as_str(), p.prediction_text.as_str()))
            .collect();

        let mut exact_sum = 0.0;
        let mut f1_sum    = 0.0;
        for example in references {
            let prediction = by_id.get(example.question_id.as_str()).copied().unwrap_or("");
            let golds      = example.reference_answers();

            exact_sum += golds.iter().map(|g| exact_match(prediction, g)).fold(0.0, f64::max);
            f1_sum    += golds.iter().map(|g| f1_score(prediction, g)).fold(0.0, f64::max);
        }

        let total = references.len();
        let scale = if total > 0 { 100.0 / total as f64 } else { 0.0 };
        SquadScores { exact: exact_sum * scale, f1: f1_sum * scale, total }
    }
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:         usize,
    /// Average loss over all training batches
    pub train_loss:    f64,
    /// Learning rate at the end of the epoch
    pub learning_rate: f64,
    pub exact:         f64,
    pub f1:            f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, learning_rate: f64, scores: SquadScores) -> Self {
        Self { epoch, train_loss, learning_rate, exact: scores.exact, f1: scores.f1 }
    }

    /// True when this epoch beats the best F1 so far
    pub fn is_improvement(&self, best_f1: f64) -> bool {
        self.f1 > best_f1
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Creates the (empty) CSV file if it doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);
        writer.serialize(m)?;
        writer.flush()?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, f1={:.2}",
            m.epoch, m.train_loss, m.f1,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
