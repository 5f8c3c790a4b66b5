// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the raw corpus and tensor batches:
//
//   SQuAD JSON
//       │
//       ▼
//   SquadLoader     → Examples (char-level answers)
//       │
//       ▼
//   splitter        → seeded train / validation split
//       │
//       ▼
//   Featurizer      → tokenized overflow windows
//       │
//       ▼
//   aligner         → token labels (train) or
//                     context-only offsets (validation / test)
//       │
//       ▼
//   FeatureStore    → CSV tables on disk
//       │
//       ▼
//   datasets        → Burn Dataset adapters
//       │
//       ▼
//   batchers        → [batch, seq_len] tensors
//
// After inference, grouper maps features back to examples for
// the span decoder.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads SQuAD-style JSON corpora into Examples
pub mod loader;

/// Seeded train/validation split
pub mod splitter;

/// Tokenizer-driven windowing of examples
pub mod featurizer;

/// Character ↔ token offset alignment
pub mod aligner;

/// example_id → feature indices
pub mod grouper;

/// CSV / JSON persistence of preprocessed splits
pub mod store;

/// Burn Dataset adapters for each split
pub mod dataset;

/// Burn Batchers for training and inference
pub mod batcher;

#[cfg(test)]
pub mod test_support;
