// ============================================================
// Layer 2 — PreprocessUseCase
// ============================================================
// Turns raw SQuAD-style corpora into feature tables:
//
//   Step 1: Load train + test corpora    (Layer 4 - data)
//   Step 2: Split train / validation     (Layer 4 - data)
//   Step 3: Resolve tokenizer, keep copy (Layer 6 - infra)
//   Step 4: Featurize each split         (Layer 4 - data)
//   Step 5: Write tables + examples      (Layer 4 - data)
//
// The split happens on Examples, so the overflow windows of one
// question never end up on both sides.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    featurizer::Featurizer,
    loader::SquadLoader,
    splitter::{split_train_val, DEFAULT_SEED},
    store::{EvalSplit, FeatureStore},
};
use crate::domain::traits::ExampleSource;
use crate::infra::tokenizer_store::{load_pretrained, TokenizerStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Directory holding the raw corpora
    pub data_path:             String,
    /// Output directory for feature tables
    pub save_path:             String,
    pub pretrained_model_name: String,
    pub test_size:             f64,
    pub max_length:            usize,
    pub stride:                usize,
    pub train_name:            String,
    pub test_name:             String,
    pub seed:                  u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            data_path:             "data".to_string(),
            save_path:             "preprocessed".to_string(),
            pretrained_model_name: "bert-base-uncased".to_string(),
            test_size:             0.2,
            max_length:            384,
            stride:                50,
            train_name:            "train.json".to_string(),
            test_name:             "test.json".to_string(),
            seed:                  DEFAULT_SEED,
        }
    }
}

/// Feature counts written for each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub train_features:      usize,
    pub validation_features: usize,
    pub test_features:       usize,
}

pub struct PreprocessUseCase {
    config: PreprocessConfig,
}

impl PreprocessUseCase {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PreprocessSummary> {
        let cfg  = &self.config;
        let data = PathBuf::from(&cfg.data_path);

        // ── Step 1: Load corpora ──────────────────────────────────────────────
        let examples      = SquadLoader::new(data.join(&cfg.train_name)).load_examples()?;
        let test_examples = SquadLoader::new(data.join(&cfg.test_name)).load_examples()?;

        // ── Step 2: Train / validation split ──────────────────────────────────
        let (train_examples, val_examples) = split_train_val(examples, cfg.test_size, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation, {} test examples",
            train_examples.len(), val_examples.len(), test_examples.len(),
        );

        // ── Step 3: Tokenizer ─────────────────────────────────────────────────
        // The untouched tokenizer is stored; truncation and padding are
        // re-applied by the Featurizer from explicit parameters.
        let store     = FeatureStore::create(&cfg.save_path)?;
        let tokenizer = load_pretrained(&cfg.pretrained_model_name)?;
        TokenizerStore::new(store.dir()).save(&tokenizer)?;
        let featurizer = Featurizer::new(tokenizer, cfg.max_length, cfg.stride)?;

        // ── Step 4 + 5: Featurize and persist ─────────────────────────────────
        let train_features = featurizer.training_features(&train_examples)?;
        let train_rows     = store.write_train(&train_features)?;

        let val_features = featurizer.eval_features(&val_examples)?;
        let val_rows     = store.write_eval(EvalSplit::Validation, &val_features)?;
        store.write_examples(EvalSplit::Validation, &val_examples)?;

        let test_features = featurizer.eval_features(&test_examples)?;
        let test_rows     = store.write_eval(EvalSplit::Test, &test_features)?;
        store.write_examples(EvalSplit::Test, &test_examples)?;

        tracing::info!(
            "Wrote {} train, {} validation, {} test features to '{}'",
            train_rows, val_rows, test_rows, store.dir().display(),
        );

        Ok(PreprocessSummary {
            train_features:      train_rows,
            validation_features: val_rows,
            test_features:       test_rows,
        })
    }
}
