// ============================================================
// Layer 6 — Pretrained Encoder Weights
// ============================================================
// Finds BERT weights for `--pretrained_model_name` and loads them
// into the model's Encoder. The span head always starts fresh.
//
// A name resolves to weights when it is, or is a directory with:
//
//   pytorch_model.bin   Hugging Face BERT checkpoint, loaded with
//                       burn-import's PyTorch recorder
//   encoder.mpk         an Encoder record saved by Burn
//
// A `config.json` beside the weights (Hugging Face layout) fixes
// the architecture: hidden_size, num_hidden_layers, ...
//
// Without weights the model is initialised randomly.
//
// PyTorch key layout → Encoder fields:
//
//   bert.embeddings.word_embeddings              token_embedding
//   bert.embeddings.token_type_embeddings        segment_embedding
//   bert.embeddings.position_embeddings          position_embedding
//   bert.embeddings.LayerNorm                    embedding_norm
//   bert.encoder.layer.N.attention.self.query    layers.N.self_attn.query
//   bert.encoder.layer.N.attention.output.dense  layers.N.self_attn.output
//   bert.encoder.layer.N.attention.output.LayerNorm  layers.N.norm1
//   bert.encoder.layer.N.intermediate.dense      layers.N.ffn_linear1
//   bert.encoder.layer.N.output.dense            layers.N.ffn_linear2
//   bert.encoder.layer.N.output.LayerNorm        layers.N.norm2
//
// Reference: Burn Book §8 (Importing PyTorch models)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use serde::Deserialize;
use std::{fs, path::{Path, PathBuf}};

use crate::ml::model::{EncoderRecord, QaModel, QaModelConfig};

pub const PYTORCH_WEIGHTS: &str = "pytorch_model.bin";
pub const BURN_WEIGHTS:    &str = "encoder.mpk";
const BERT_CONFIG:         &str = "config.json";

const KEY_REMAP: [(&str, &str); 10] = [
    (r"^(bert\.)?embeddings\.word_embeddings",       "token_embedding"),
    (r"^(bert\.)?embeddings\.token_type_embeddings", "segment_embedding"),
    (r"^(bert\.)?embeddings\.position_embeddings",   "position_embedding"),
    (r"^(bert\.)?embeddings\.LayerNorm",             "embedding_norm"),
    (r"^(bert\.)?encoder\.layer\.([0-9]+)\.attention\.self\.(query|key|value)", "layers.$2.self_attn.$3"),
    (r"^(bert\.)?encoder\.layer\.([0-9]+)\.attention\.output\.dense",     "layers.$2.self_attn.output"),
    (r"^(bert\.)?encoder\.layer\.([0-9]+)\.attention\.output\.LayerNorm", "layers.$2.norm1"),
    (r"^(bert\.)?encoder\.layer\.([0-9]+)\.intermediate\.dense",          "layers.$2.ffn_linear1"),
    (r"^(bert\.)?encoder\.layer\.([0-9]+)\.output\.dense",                "layers.$2.ffn_linear2"),
    (r"^(bert\.)?encoder\.layer\.([0-9]+)\.output\.LayerNorm",            "layers.$2.norm2"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightFormat {
    PyTorch,
    Burn,
}

/// Hugging Face `config.json` fields that shape the encoder.
#[derive(Debug, Clone, Deserialize)]
pub struct BertConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size:         usize,
    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob:     f64,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps:          f64,
}

fn default_type_vocab_size() -> usize { 2 }
fn default_dropout() -> f64 { 0.1 }
fn default_layer_norm_eps() -> f64 { 1e-12 }

impl BertConfig {
    pub fn to_model_config(&self) -> QaModelConfig {
        QaModelConfig::new(self.vocab_size, self.max_position_embeddings)
            .with_d_model(self.hidden_size)
            .with_num_heads(self.num_attention_heads)
            .with_num_layers(self.num_hidden_layers)
            .with_d_ff(self.intermediate_size)
            .with_dropout(self.hidden_dropout_prob)
            .with_type_vocab_size(self.type_vocab_size)
            .with_layer_norm_eps(self.layer_norm_eps)
    }
}

/// A located weights file plus the architecture stored beside it.
#[derive(Debug, Clone)]
pub struct PretrainedEncoder {
    pub path:   PathBuf,
    pub format: WeightFormat,
    pub config: Option<BertConfig>,
}

impl PretrainedEncoder {
    /// Look for encoder weights under `name`; None when there are none.
    pub fn locate(name: &str) -> Result<Option<Self>> {
        let path = Path::new(name);
        let found = if path.is_file() {
            format_of(path).map(|f| (path.to_path_buf(), f))
        } else if path.join(PYTORCH_WEIGHTS).is_file() {
            Some((path.join(PYTORCH_WEIGHTS), WeightFormat::PyTorch))
        } else if path.join(BURN_WEIGHTS).is_file() {
            Some((path.join(BURN_WEIGHTS), WeightFormat::Burn))
        } else {
            None
        };

        let Some((path, format)) = found else {
            tracing::warn!("No pretrained weights for '{}'; encoder starts from random weights", name);
            return Ok(None);
        };

        let config_path = path.with_file_name(BERT_CONFIG);
        let config = if config_path.is_file() {
            let text = fs::read_to_string(&config_path)
                .with_context(|| format!("Cannot read '{}'", config_path.display()))?;
            let cfg: BertConfig = serde_json::from_str(&text)
                .with_context(|| format!("Malformed model config '{}'", config_path.display()))?;
            Some(cfg)
        } else {
            None
        };

        tracing::info!("Pretrained encoder weights: '{}' ({:?})", path.display(), format);
        Ok(Some(Self { path, format, config }))
    }

    /// Read the Encoder record from the weights file.
    pub fn load_record<B: Backend>(&self, device: &B::Device) -> Result<EncoderRecord<B>> {
        match self.format {
            WeightFormat::PyTorch => {
                let args = KEY_REMAP
                    .iter()
                    .fold(LoadArgs::new(self.path.clone()), |args, (pattern, replacement)| {
                        args.with_key_remap(pattern, replacement)
                    });
                PyTorchFileRecorder::<FullPrecisionSettings>::default()
                    .load(args, device)
                    .with_context(|| format!("Cannot import PyTorch weights '{}'", self.path.display()))
            }
            WeightFormat::Burn => NamedMpkFileRecorder::<FullPrecisionSettings>::new()
                .load(self.path.clone(), device)
                .with_context(|| format!("Cannot load encoder weights '{}'", self.path.display())),
        }
    }
}

fn format_of(path: &Path) -> Option<WeightFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bin" | "pt" | "pth") => Some(WeightFormat::PyTorch),
        Some("mpk")                => Some(WeightFormat::Burn),
        _                          => None,
    }
}

/// Build the model, loading pretrained encoder weights when given.
pub fn init_model<B: Backend>(
    config:     &QaModelConfig,
    pretrained: Option<&PretrainedEncoder>,
    device:     &B::Device,
) -> Result<QaModel<B>> {
    let mut model = config.init::<B>(device);
    if let Some(weights) = pretrained {
        let record = weights.load_record::<B>(device)?;
        model.encoder = model.encoder.load_record(record);
        tracing::info!("Encoder initialised from '{}'", weights.path.display());
    }
    Ok(model)
}

/// Save an Encoder in the format `locate` picks up as `encoder.mpk`.
pub fn save_encoder<B: Backend>(model: &QaModel<B>, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;
    let path = dir.join(BURN_WEIGHTS);
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
        .record(model.encoder.clone().into_record(), path.clone())
        .with_context(|| format!("Cannot save encoder to '{}'", path.display()))?;
    Ok(path)
}
