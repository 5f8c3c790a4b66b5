// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the training pipeline in order:
//
//   Step 1: Read preprocessed tables      (Layer 4 - data)
//   Step 2: Resolve tokenizer vocabulary  (Layer 6 - infra)
//   Step 3: Locate pretrained weights and
//           build the model config        (Layer 6 - infra, Layer 5 - ml)
//   Step 4: Save configs for inference    (Layer 6 - infra)
//   Step 5: Run training loop             (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::data::{
    dataset::{EvalDataset, TrainDataset},
    splitter::DEFAULT_SEED,
    store::{EvalSplit, FeatureStore},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
    pretrained::{PretrainedEncoder, WeightFormat},
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    model::QaModelConfig,
    trainer::{run_training, ValidationSet},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved next to the checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Directory written by `preprocess`
    pub file_path:             String,
    /// Final weights file; its config lands beside it
    pub model_fn:              String,
    pub pretrained_model_name: String,
    pub checkpoint_dir:        String,
    pub batch_size:            usize,
    pub n_epochs:              usize,
    pub warmup_ratio:          f64,
    pub max_answer_length:     usize,
    pub lr:                    f64,
    pub weight_decay:          f64,
    pub d_model:               usize,
    pub num_heads:             usize,
    pub num_layers:            usize,
    pub d_ff:                  usize,
    pub dropout:               f64,
    pub seed:                  u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            file_path:             "preprocessed".to_string(),
            model_fn:              "model/qa_model".to_string(),
            pretrained_model_name: "bert-base-uncased".to_string(),
            checkpoint_dir:        ".checkpoints".to_string(),
            batch_size:            16,
            n_epochs:              2,
            warmup_ratio:          0.1,
            max_answer_length:     40,
            lr:                    5e-5,
            weight_decay:          0.01,
            d_model:               256,
            num_heads:             8,
            num_layers:            6,
            d_ff:                  1024,
            dropout:               0.1,
            seed:                  DEFAULT_SEED,
        }
    }
}

impl TrainConfig {
    /// Architecture for a given vocabulary and window length.
    pub fn model_config(&self, vocab_size: usize, max_seq_len: usize) -> QaModelConfig {
        QaModelConfig::new(vocab_size, max_seq_len)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let cfg = &self.config;
        anyhow::ensure!(cfg.batch_size > 0, "batch size must be positive");
        anyhow::ensure!(
            cfg.num_heads > 0 && cfg.d_model % cfg.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})", cfg.d_model, cfg.num_heads,
        );

        // ── Step 1: Preprocessed tables ───────────────────────────────────────
        let store          = FeatureStore::new(&cfg.file_path);
        let train_features = store.read_train()?;
        let val_features   = store.read_eval(EvalSplit::Validation)?;
        let val_examples   = store.read_examples(EvalSplit::Validation)?;
        tracing::info!(
            "Loaded {} train features, {} validation features ({} examples)",
            train_features.len(), val_features.len(), val_examples.len(),
        );

        let max_seq_len = train_features
            .first()
            .map(|f| f.input_ids.len())
            .context("No training features found; run preprocess first")?;
        anyhow::ensure!(
            train_features.iter().all(|f| f.input_ids.len() == max_seq_len),
            "Training features have mixed lengths; expected {max_seq_len}",
        );

        // ── Step 2: Tokenizer vocabulary ──────────────────────────────────────
        let tokenizer  = TokenizerStore::new(&cfg.file_path).load_or_fetch(&cfg.pretrained_model_name)?;
        let vocab_size = tokenizer.get_vocab_size(true);

        // ── Step 3: Pretrained weights fix the architecture when present ──────
        let pretrained = PretrainedEncoder::locate(&cfg.pretrained_model_name)?;
        let model_cfg  = resolve_model_config(cfg, pretrained.as_ref(), vocab_size, max_seq_len)?;

        // ── Step 4: Configs saved for reloading ───────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(&model_cfg)?;
        let run_cfg_path = ckpt_manager.dir().join("train_config.json");
        fs::write(&run_cfg_path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write '{}'", run_cfg_path.display()))?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 5: Training loop (Layer 5) ───────────────────────────────────
        let validation = ValidationSet {
            examples: val_examples,
            dataset:  EvalDataset::new(val_features),
        };
        run_training(
            cfg,
            &model_cfg,
            pretrained.as_ref(),
            TrainDataset::new(train_features),
            validation,
            &ckpt_manager,
            &metrics,
        )
    }
}

/// Architecture from the pretrained config.json, else from the CLI
/// hyperparameters. Imported weights must cover the tokenizer and
/// the feature length.
fn resolve_model_config(
    cfg:         &TrainConfig,
    pretrained:  Option<&PretrainedEncoder>,
    vocab_size:  usize,
    max_seq_len: usize,
) -> Result<QaModelConfig> {
    let Some(weights) = pretrained else {
        return Ok(cfg.model_config(vocab_size, max_seq_len));
    };

    let model_cfg = match (&weights.config, weights.format) {
        (Some(bert), _) => bert.to_model_config(),
        (None, WeightFormat::Burn) => cfg.model_config(vocab_size, max_seq_len),
        (None, WeightFormat::PyTorch) => anyhow::bail!(
            "PyTorch weights '{}' need a config.json beside them",
            weights.path.display(),
        ),
    };
    anyhow::ensure!(
        model_cfg.vocab_size >= vocab_size,
        "Pretrained encoder has {} token embeddings but the tokenizer has {} tokens",
        model_cfg.vocab_size, vocab_size,
    );
    anyhow::ensure!(
        model_cfg.max_seq_len >= max_seq_len,
        "Pretrained encoder supports {} positions but features have {}",
        model_cfg.max_seq_len, max_seq_len,
    );
    Ok(model_cfg)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_carries_hyperparameters() {
        let cfg = TrainConfig { d_model: 64, num_heads: 4, num_layers: 2, ..TrainConfig::default() };
        let m   = cfg.model_config(30522, 384);
        assert_eq!(m.vocab_size, 30522);
        assert_eq!(m.max_seq_len, 384);
        assert_eq!((m.d_model, m.num_heads, m.num_layers), (64, 4, 2));
    }

    fn bert_weights(vocab_size: usize, positions: usize) -> PretrainedEncoder {
        let bert = serde_json::json!({
            "vocab_size": vocab_size, "hidden_size": 768, "num_hidden_layers": 12,
            "num_attention_heads": 12, "intermediate_size": 3072,
            "max_position_embeddings": positions,
        });
        PretrainedEncoder {
            path:   "bert/pytorch_model.bin".into(),
            format: WeightFormat::PyTorch,
            config: Some(serde_json::from_value(bert).unwrap()),
        }
    }

    #[test]
    fn test_pretrained_config_overrides_hyperparameters() {
        let cfg = TrainConfig::default();
        let m   = resolve_model_config(&cfg, Some(&bert_weights(30522, 512)), 30522, 384).unwrap();
        assert_eq!((m.d_model, m.num_layers, m.max_seq_len), (768, 12, 512));

        let random = resolve_model_config(&cfg, None, 100, 384).unwrap();
        assert_eq!((random.d_model, random.max_seq_len), (cfg.d_model, 384));
    }

    #[test]
    fn test_pretrained_shape_must_cover_features() {
        let cfg = TrainConfig::default();
        assert!(resolve_model_config(&cfg, Some(&bert_weights(30522, 256)), 30522, 384).is_err());
        assert!(resolve_model_config(&cfg, Some(&bert_weights(1000, 512)), 30522, 384).is_err());

        let mut no_config = bert_weights(30522, 512);
        no_config.config  = None;
        assert!(resolve_model_config(&cfg, Some(&no_config), 30522, 384).is_err());
    }

    #[test]
    fn test_missing_tables_fail_before_training() {
        let dir = std::env::temp_dir().join(format!("squad_qa_train_missing_{}", std::process::id()));
        let cfg = TrainConfig {
            file_path:      dir.to_string_lossy().into_owned(),
            checkpoint_dir: dir.join("ckpt").to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_indivisible_heads_rejected() {
        let cfg = TrainConfig { d_model: 100, num_heads: 8, ..TrainConfig::default() };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("divisible"));
    }
}
