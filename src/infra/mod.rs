// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs      — model weights + architecture on disk
//                        (Burn CompactRecorder + config JSON)
//
//   tokenizer_store.rs — resolves the pretrained tokenizer and
//                        keeps a copy next to the feature tables
//
//   pretrained.rs      — locates BERT weights and imports them
//                        into the encoder (burn-import)
//
//   metrics.rs         — SQuAD exact/F1 scorer and the per-epoch
//                        metrics CSV logger
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer resolution and persistence
pub mod tokenizer_store;

/// Pretrained encoder weights
pub mod pretrained;

/// Evaluation scores and training metrics CSV logger
pub mod metrics;
