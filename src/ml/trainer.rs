// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + evaluation loop using Burn's DataLoader and AdamW.
//
//   per step : forward_loss → backward → AdamW step at the
//              scheduled learning rate (linear warmup, linear decay)
//   per epoch: validation logits → group → decode → exact / F1,
//              metrics CSV row, epoch checkpoint
//   at end   : final weights + config written to --model_fn
//
// Burn notes:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on MyInnerBackend (Wgpu)
//     with dropout disabled, used for evaluation
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
};
use std::path::Path;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::QaBatcher,
    dataset::{EvalDataset, TrainDataset},
};
use crate::domain::example::Example;
use crate::infra::{
    checkpoint::{save_model_file, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger, SquadScorer, SquadScores},
    pretrained::{init_model, PretrainedEncoder},
};
use crate::ml::{
    decoder::SpanDecoder,
    inferencer::collect_logits,
    model::{QaModel, QaModelConfig},
    schedule::LinearWarmupDecay,
};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

/// Held-out examples and their features, scored after every epoch.
pub struct ValidationSet {
    pub examples: Vec<Example>,
    pub dataset:  EvalDataset,
}

/// Optimizer steps over the whole run: ceil(n / batch_size) per epoch.
pub fn total_steps(n_features: usize, batch_size: usize, n_epochs: usize) -> usize {
    n_features.div_ceil(batch_size.max(1)) * n_epochs
}

/// Score a model on the validation set with the span decoder.
pub fn evaluate<B: Backend>(
    model:             &QaModel<B>,
    validation:        &ValidationSet,
    batch_size:        usize,
    max_answer_length: usize,
    device:            &B::Device,
) -> Result<SquadScores> {
    let logits      = collect_logits(model, validation.dataset.to_infer_dataset(), batch_size, device)?;
    let decoder     = SpanDecoder::new(max_answer_length);
    let predictions = decoder.decode_all(&validation.examples, validation.dataset.features(), &logits);
    Ok(SquadScorer::new().compute(&predictions, &validation.examples))
}

pub fn run_training(
    cfg:           &TrainConfig,
    model_cfg:     &QaModelConfig,
    pretrained:    Option<&PretrainedEncoder>,
    train_dataset: TrainDataset,
    validation:    ValidationSet,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
) -> Result<Vec<EpochMetrics>> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop(cfg, model_cfg, pretrained, train_dataset, validation, ckpt_manager, metrics, device)
}

#[allow(clippy::too_many_arguments)]
fn train_loop(
    cfg:           &TrainConfig,
    model_cfg:     &QaModelConfig,
    pretrained:    Option<&PretrainedEncoder>,
    train_dataset: TrainDataset,
    validation:    ValidationSet,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        burn::backend::wgpu::WgpuDevice,
) -> Result<Vec<EpochMetrics>> {

    // ── Build model ───────────────────────────────────────────────────────────
    // Pretrained encoder when weights were found, random otherwise
    let mut model: QaModel<MyBackend> = init_model(model_cfg, pretrained, &device)?;
    tracing::info!(
        "Model ready: {} layers, d_model={}, vocab={}",
        model_cfg.num_layers, model_cfg.d_model, model_cfg.vocab_size,
    );

    // ── AdamW optimiser + schedule ────────────────────────────────────────────
    // Decoupled weight decay: θ = θ - lr * (m / (√v + ε) + λθ)
    let optim_cfg = AdamWConfig::new()
        .with_epsilon(1e-8)
        .with_weight_decay(cfg.weight_decay as f32);
    let mut optim = optim_cfg.init();

    let steps = total_steps(train_dataset.len(), cfg.batch_size, cfg.n_epochs);
    let mut schedule = LinearWarmupDecay::with_warmup_ratio(cfg.lr, cfg.warmup_ratio, steps);
    tracing::info!(
        "{} training features, {} steps ({} warmup)",
        train_dataset.len(), steps, schedule.warmup_steps(),
    );

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = QaBatcher::<MyBackend>::new(device.clone());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut history = Vec::with_capacity(cfg.n_epochs);
    let mut best_f1 = f64::NEG_INFINITY;

    for epoch in 1..=cfg.n_epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(
                batch.inputs,
                batch.start_positions,
                batch.end_positions,
            );

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val;
            train_batches  += 1;

            // Backward pass + AdamW update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(schedule.get_lr(), model, grads);
            schedule.step();
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Evaluation phase ──────────────────────────────────────────────────
        // model.valid() → QaModel<MyInnerBackend>, dropout disabled
        let model_valid: QaModel<MyInnerBackend> = model.valid();
        let scores = evaluate(
            &model_valid, &validation, cfg.batch_size, cfg.max_answer_length, &device,
        )?;

        let row = EpochMetrics::new(epoch, avg_train_loss, schedule.get_lr(), scores);
        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | exact={:.2} | f1={:.2} | n={}",
            epoch, cfg.n_epochs, avg_train_loss, scores.exact, scores.f1, scores.total,
        );
        if row.is_improvement(best_f1) {
            best_f1 = row.f1;
        }
        metrics.log(&row)?;
        history.push(row);

        ckpt_manager.save_epoch(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    save_model_file(&model.valid(), model_cfg, Path::new(&cfg.model_fn))?;
    tracing::info!(
        "Training complete! best f1={:.2}, metrics in '{}'",
        best_f1, metrics.csv_path().display()
    );
    Ok(history)
}
