// ============================================================
// Layer 2 — InferUseCase
// ============================================================
// Predicts answers for a preprocessed test table:
//
//   Step 1: Read test features + Examples   (Layer 4 - data)
//   Step 2: Load the trained model          (Layer 5 - ml)
//   Step 3: Check tokenizer compatibility   (Layer 6 - infra)
//   Step 4: Collect logits, decode spans    (Layer 5 - ml)
//   Step 5: Write predictions JSON
//
// Output format:
//   [ { "id": "q1", "prediction_text": "Paris" }, ... ]
//
// When the Examples carry reference answers, exact / F1 are
// logged as well.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::data::{
    dataset::EvalDataset,
    store::{read_eval_features, read_examples, EvalSplit},
};
use crate::domain::{example::Prediction, feature::EvalFeature};
use crate::infra::{metrics::SquadScorer, tokenizer_store::TokenizerStore};
use crate::ml::{
    decoder::{SpanDecoder, DEFAULT_N_BEST},
    inferencer::Inferencer,
    model::QaModelConfig,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferConfig {
    pub model_fn:              String,
    pub pretrained_model_name: String,
    /// A `preprocessed_test.csv`-style feature table
    pub test_file:             String,
    /// Defaults to `test_examples.json` beside `test_file`
    pub examples_file:         Option<String>,
    pub output_file:           String,
    pub batch_size:            usize,
    pub max_answer_length:     usize,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            model_fn:              "model/qa_model".to_string(),
            pretrained_model_name: "bert-base-uncased".to_string(),
            test_file:             "preprocessed/preprocessed_test.csv".to_string(),
            examples_file:         None,
            output_file:           "predictions.json".to_string(),
            batch_size:            16,
            max_answer_length:     40,
        }
    }
}

impl InferConfig {
    fn table_dir(&self) -> PathBuf {
        Path::new(&self.test_file)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    pub fn examples_path(&self) -> PathBuf {
        match &self.examples_file {
            Some(path) => PathBuf::from(path),
            None       => self.table_dir().join(EvalSplit::Test.examples_file()),
        }
    }
}

/// Write predictions as a JSON array of `{id, prediction_text}`.
pub fn write_predictions(path: impl AsRef<Path>, predictions: &[Prediction]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    fs::write(path, serde_json::to_string_pretty(predictions)?)
        .with_context(|| format!("Cannot write predictions to '{}'", path.display()))?;
    tracing::info!("Wrote {} predictions to '{}'", predictions.len(), path.display());
    Ok(())
}

/// Features longer than the position table cannot be embedded.
fn check_feature_length(features: &[EvalFeature], config: &QaModelConfig) -> Result<()> {
    let max_len = features.iter().map(|f| f.input_ids.len()).max().unwrap_or(0);
    anyhow::ensure!(
        max_len <= config.max_seq_len,
        "Test features have {} tokens but the model was trained for at most {}",
        max_len, config.max_seq_len,
    );
    Ok(())
}

pub struct InferUseCase {
    config: InferConfig,
}

impl InferUseCase {
    pub fn new(config: InferConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<Prediction>> {
        let cfg = &self.config;

        // ── Step 1: Inputs ────────────────────────────────────────────────────
        let features = read_eval_features(&cfg.test_file)?;
        let examples = read_examples(cfg.examples_path())?;
        tracing::info!("{} test features for {} examples", features.len(), examples.len());

        // ── Step 2: Model ─────────────────────────────────────────────────────
        let inferencer = Inferencer::from_model_file(Path::new(&cfg.model_fn))?;

        // ── Step 3: Tokenizer and features must fit the model ──────────────
        let tokenizer  = TokenizerStore::new(cfg.table_dir()).load_or_fetch(&cfg.pretrained_model_name)?;
        let vocab_size = tokenizer.get_vocab_size(true);
        anyhow::ensure!(
            vocab_size <= inferencer.config().vocab_size,
            "Tokenizer '{}' has {} tokens but the model was trained with {}",
            cfg.pretrained_model_name, vocab_size, inferencer.config().vocab_size,
        );

        check_feature_length(&features, inferencer.config())?;

        // ── Step 4: Logits → spans ────────────────────────────────────────────
        let dataset     = EvalDataset::new(features);
        let logits      = inferencer.logits(dataset.to_infer_dataset(), cfg.batch_size)?;
        let decoder     = SpanDecoder::new(cfg.max_answer_length).with_n_best(DEFAULT_N_BEST);
        let predictions = decoder.decode_all(&examples, dataset.features(), &logits);

        if examples.iter().any(|e| e.has_answer()) {
            let scores = SquadScorer::new().compute(&predictions, &examples);
            tracing::info!("exact={:.2} f1={:.2} over {} examples", scores.exact, scores.f1, scores.total);
        }

        // ── Step 5: Output ────────────────────────────────────────────────────
        write_predictions(&cfg.output_file, &predictions)?;
        Ok(predictions)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_default_beside_test_table() {
        let cfg = InferConfig {
            test_file: "out/preprocessed_test.csv".to_string(),
            ..InferConfig::default()
        };
        assert_eq!(cfg.examples_path(), PathBuf::from("out/test_examples.json"));

        let explicit = InferConfig { examples_file: Some("ex.json".to_string()), ..cfg };
        assert_eq!(explicit.examples_path(), PathBuf::from("ex.json"));
    }

    #[test]
    fn test_prediction_file_layout() {
        let path = std::env::temp_dir()
            .join(format!("squad_qa_infer_{}", std::process::id()))
            .join("predictions.json");
        let preds = vec![Prediction::new("q1", "Paris"), Prediction::no_answer("q2")];
        write_predictions(&path, &preds).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                { "id": "q1", "prediction_text": "Paris" },
                { "id": "q2", "prediction_text": "" },
            ])
        );
    }

    #[test]
    fn test_features_must_fit_position_table() {
        let feature = |len: usize| EvalFeature {
            input_ids:      vec![1; len],
            token_type_ids: vec![0; len],
            attention_mask: vec![1; len],
            offset_mapping: vec![None; len],
            example_id:     "q1".to_string(),
        };
        let config = QaModelConfig::new(30, 4);
        assert!(check_feature_length(&[feature(4)], &config).is_ok());
        let err = check_feature_length(&[feature(4), feature(6)], &config).unwrap_err();
        assert!(err.to_string().contains("at most 4"));
    }

    #[test]
    fn test_missing_test_table_fails() {
        let cfg = InferConfig {
            test_file: "/nonexistent/preprocessed_test.csv".to_string(),
            ..InferConfig::default()
        };
        assert!(InferUseCase::new(cfg).execute().is_err());
    }
}
