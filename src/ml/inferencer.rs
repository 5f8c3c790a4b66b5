// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs the trained model over an inference dataset and collects
// the raw start/end logits, one row per feature, in dataset order.
//
// The logits are handed to the span decoder unchanged; no softmax
// is applied since the decoder only compares sums of logits.
//
// The data loader may pad the last batch, so the collected table
// is truncated to exactly the number of features.

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    prelude::*,
};
use std::path::Path;

use crate::data::{batcher::InputBatcher, dataset::InferDataset};
use crate::infra::checkpoint::load_model_file;
use crate::ml::{
    decoder::LogitTable,
    model::{QaModel, QaModelConfig},
};

type InferBackend = burn::backend::Wgpu;

fn tensor_rows<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<Vec<f32>>> {
    let [_, seq_len] = tensor.dims();
    let flat = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read logits: {e:?}"))?;
    Ok(flat.chunks(seq_len.max(1)).map(<[f32]>::to_vec).collect())
}

/// Batched forward pass over `dataset`, returning one logit row per feature.
pub fn collect_logits<B: Backend>(
    model:      &QaModel<B>,
    dataset:    InferDataset,
    batch_size: usize,
    device:     &B::Device,
) -> Result<LogitTable> {
    let n_features = dataset.len();
    anyhow::ensure!(
        dataset.max_input_len() <= model.max_seq_len(),
        "Features of {} tokens exceed the model's {} positions",
        dataset.max_input_len(), model.max_seq_len(),
    );

    let loader = DataLoaderBuilder::new(InputBatcher::<B>::new(device.clone()))
        .batch_size(batch_size.max(1))
        .build(dataset);

    let mut start = Vec::with_capacity(n_features);
    let mut end   = Vec::with_capacity(n_features);
    for batch in loader.iter() {
        let output = model.forward(batch);
        start.extend(tensor_rows(output.start_logits)?);
        end.extend(tensor_rows(output.end_logits)?);
    }

    let mut logits = LogitTable::new(start, end);
    logits.truncate(n_features);
    tracing::debug!("Collected logits for {} features", logits.len());
    Ok(logits)
}

/// A trained model loaded for prediction on the default WGPU device.
pub struct Inferencer {
    model:  QaModel<InferBackend>,
    config: QaModelConfig,
    device: burn::backend::wgpu::WgpuDevice,
}

impl Inferencer {
    /// Rebuild the model from `model_fn` and its config file.
    pub fn from_model_file(model_fn: &Path) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        let (config, model) = load_model_file::<InferBackend>(model_fn, &device)?;
        tracing::info!(
            "Inference model ready: {} layers, d_model={}, vocab={}",
            config.num_layers, config.d_model, config.vocab_size,
        );
        Ok(Self { model, config, device })
    }

    pub fn config(&self) -> &QaModelConfig {
        &self.config
    }

    pub fn logits(&self, dataset: InferDataset, batch_size: usize) -> Result<LogitTable> {
        collect_logits(&self.model, dataset, batch_size, &self.device)
    }
}
