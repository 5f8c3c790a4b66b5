// ============================================================
// Layer 3 — Feature Domain Types
// ============================================================
// A Feature is one fixed-length tokenized window of an Example.
// Long contexts overflow into several Features (sliding window
// with stride), so the Feature → Example relation is many-to-one
// and is stored as a plain `example_id` key.
//
// Sequence layout of every window:
//
//   [CLS] question [SEP] context-window [SEP] [PAD] ...
//     0                  ^ sequence id 1     ^
//
// Offsets are character ranges into the ORIGINAL context string.

use serde::{Deserialize, Serialize};

/// Character offset of one token position; None marks a position
/// that can never be an answer boundary (question/special/padding).
pub type Offset = Option<(usize, usize)>;

/// Sequence id the tokenizer assigns to context tokens in a pair encoding.
pub const CONTEXT_SEQUENCE_ID: usize = 1;

/// One tokenized window as produced by the tokenizer, before any
/// label or offset post-processing. All vectors share one length.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedChunk {
    pub input_ids:      Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub offsets:        Vec<(usize, usize)>,

    /// None = special token, Some(0) = question, Some(1) = context
    pub sequence_ids:   Vec<Option<usize>>,

    /// Position of the classification token
    pub cls_index:      usize,
}

impl TokenizedChunk {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_context(&self, position: usize) -> bool {
        self.sequence_ids.get(position).copied().flatten() == Some(CONTEXT_SEQUENCE_ID)
    }
}

/// Training feature: model inputs plus token-level answer labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainFeature {
    pub input_ids:      Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub start_position: usize,
    pub end_position:   usize,
}

/// Validation/test feature: model inputs plus the context-only offset
/// mapping and the owning example's id, kept for decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalFeature {
    pub input_ids:      Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub offset_mapping: Vec<Offset>,
    pub example_id:     String,
}

impl EvalFeature {
    /// Strip decoding metadata, keeping only what the model consumes.
    pub fn model_input(&self) -> ModelInput {
        ModelInput {
            input_ids:      self.input_ids.clone(),
            token_type_ids: self.token_type_ids.clone(),
            attention_mask: self.attention_mask.clone(),
        }
    }
}

/// Raw model inputs with no labels and no metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInput {
    pub input_ids:      Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl From<&TrainFeature> for ModelInput {
    fn from(f: &TrainFeature) -> Self {
        Self {
            input_ids:      f.input_ids.clone(),
            token_type_ids: f.token_type_ids.clone(),
            attention_mask: f.attention_mask.clone(),
        }
    }
}
