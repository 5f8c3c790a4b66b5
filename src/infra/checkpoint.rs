// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// Per-epoch checkpoints (training only):
//   {checkpoint_dir}/
//     model_epoch_1.mpk.gz   ← weights after epoch 1
//     model_epoch_2.mpk.gz
//     model_config.json      ← architecture, to rebuild the model
//
// Final model (`--model_fn`):
//   {model_fn stem}.mpk.gz   ← weights (the recorder sets the extension)
//   {model_fn stem}.config.json
//
// The config is saved separately because the model must be
// rebuilt with the exact same shape before weights can be loaded.
// Loading into a different shape fails instead of silently
// producing garbage.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::model::{QaModel, QaModelConfig};

/// Config file that accompanies a `--model_fn` weights file.
pub fn config_path(model_fn: &Path) -> PathBuf {
    model_fn.with_extension("config.json")
}

/// Write final weights and architecture next to each other.
pub fn save_model_file<B: Backend>(
    model:    &QaModel<B>,
    config:   &QaModelConfig,
    model_fn: &Path,
) -> Result<()> {
    if let Some(parent) = model_fn.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }

    CompactRecorder::new()
        .record(model.clone().into_record(), model_fn.to_path_buf())
        .with_context(|| format!("Failed to save model to '{}'", model_fn.display()))?;

    let cfg_path = config_path(model_fn);
    config
        .save(&cfg_path)
        .with_context(|| format!("Cannot write config to '{}'", cfg_path.display()))?;

    tracing::info!("Saved model to '{}'", model_fn.display());
    Ok(())
}

/// Rebuild the model described by `{model_fn}.config.json` and load its weights.
pub fn load_model_file<B: Backend>(
    model_fn: &Path,
    device:   &B::Device,
) -> Result<(QaModelConfig, QaModel<B>)> {
    let cfg_path = config_path(model_fn);
    let config = QaModelConfig::load(&cfg_path).map_err(|e| {
        anyhow::anyhow!(
            "Cannot read model config '{}': {e}. Was the model trained with this tool?",
            cfg_path.display()
        )
    })?;

    let record = CompactRecorder::new()
        .load(model_fn.to_path_buf(), device)
        .with_context(|| format!("Cannot load weights '{}'", model_fn.display()))?;

    let model = config.init::<B>(device).load_record(record);
    tracing::info!("Model loaded from '{}'", model_fn.display());
    Ok((config, model))
}

/// Manages per-epoch checkpoints inside one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, making the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save the architecture so any epoch checkpoint can be reloaded.
    pub fn save_config(&self, config: &QaModelConfig) -> Result<()> {
        let path = self.dir.join("model_config.json");
        config
            .save(&path)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    /// Path of the weights saved after `epoch`.
    pub fn epoch_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    /// Save weights after `epoch`.
    pub fn save_epoch<B: Backend>(&self, model: &QaModel<B>, epoch: usize) -> Result<()> {
        let path = self.epoch_path(epoch);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use crate::ml::model::QaModelRecord;

    type TestBackend = NdArray<f32>;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("squad_qa_ckpt_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn tiny_config() -> QaModelConfig {
        QaModelConfig::new(20, 8)
            .with_d_model(8)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(16)
    }

    #[test]
    fn test_config_path_sits_next_to_weights() {
        assert_eq!(config_path(Path::new("out/qa_model")), PathBuf::from("out/qa_model.config.json"));
    }

    #[test]
    fn test_model_file_round_trip() {
        let device   = Default::default();
        let model_fn = scratch_dir("final").join("qa_model");
        let config   = tiny_config();
        let model    = config.init::<TestBackend>(&device);

        save_model_file(&model, &config, &model_fn).unwrap();
        let (loaded_cfg, _model) = load_model_file::<TestBackend>(&model_fn, &device).unwrap();
        assert_eq!(loaded_cfg.vocab_size, 20);
        assert_eq!(loaded_cfg.d_model, 8);
    }

    #[test]
    fn test_epoch_checkpoints_reload() {
        let device = Default::default();
        let ckpt   = CheckpointManager::new(scratch_dir("epochs")).unwrap();
        let model  = tiny_config().init::<TestBackend>(&device);

        ckpt.save_epoch(&model, 1).unwrap();
        ckpt.save_epoch(&model, 2).unwrap();

        let record: QaModelRecord<TestBackend> = CompactRecorder::new()
            .load(ckpt.epoch_path(2), &device)
            .unwrap();
        let _model: QaModel<TestBackend> = tiny_config().init(&device).load_record(record);
    }

    #[test]
    fn test_missing_model_file_is_an_error() {
        let device = Default::default();
        let result = load_model_file::<TestBackend>(&scratch_dir("none").join("qa_model"), &device);
        assert!(result.is_err());
    }
}
