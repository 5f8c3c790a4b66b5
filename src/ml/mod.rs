// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Model, training and the logit → answer decoding step.
//
//   model.rs      — The transformer encoder architecture
//                   • Token, segment and positional embeddings
//                   • Multi-head self-attention with padding mask
//                   • Feed-forward networks (GELU activation)
//                   • Layer normalisation + residual connections
//                   • Span head: start / end logit per token
//
//   schedule.rs   — Linear warmup / linear decay learning rate
//
//   trainer.rs    — The training loop
//                   forward, loss, backward, AdamW step, per-epoch
//                   evaluation and checkpointing
//
//   inferencer.rs — Loads a trained model and collects logits
//                   for every feature of a dataset
//
//   decoder.rs    — Span decoder: top-k start/end search over the
//                   features of each example, best span → text
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT

/// Transformer encoder Q&A model architecture
pub mod model;

/// Learning-rate schedule
pub mod schedule;

/// Full training loop with evaluation and checkpointing
pub mod trainer;

/// Batched logit collection from a trained model
pub mod inferencer;

/// Best-span selection from start/end logits
pub mod decoder;
