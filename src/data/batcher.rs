// ============================================================
// Layer 4 — Q&A Batchers
// ============================================================
// Implements Burn's Batcher trait to stack fixed-length features
// into [batch_size, seq_len] tensors.
//
//   QaBatcher    : TrainFeature → QaBatch    (inputs + labels)
//   InputBatcher : ModelInput   → InputBatch (inputs only)
//
// Every feature is already padded to max_length, so no dynamic
// padding is needed: flatten, then reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::feature::{ModelInput, TrainFeature};

/// Model inputs for one batch; all tensors are [batch_size, seq_len].
#[derive(Debug, Clone)]
pub struct InputBatch<B: Backend> {
    pub input_ids:      Tensor<B, 2, Int>,
    pub token_type_ids: Tensor<B, 2, Int>,
    /// 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,
}

/// Training batch: inputs plus start/end labels of shape [batch_size].
#[derive(Debug, Clone)]
pub struct QaBatch<B: Backend> {
    pub inputs:          InputBatch<B>,
    pub start_positions: Tensor<B, 1, Int>,
    pub end_positions:   Tensor<B, 1, Int>,
}

fn stack_rows<B: Backend>(rows: &[&[u32]], device: &B::Device) -> Tensor<B, 2, Int> {
    let batch_size = rows.len();
    let seq_len    = rows.first().map_or(0, |r| r.len());
    let flat: Vec<i32> = rows
        .iter()
        .flat_map(|r| r.iter().map(|&x| x as i32))
        .collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([batch_size, seq_len])
}

fn input_batch<B: Backend>(
    input_ids:      Vec<&[u32]>,
    token_type_ids: Vec<&[u32]>,
    attention_mask: Vec<&[u32]>,
    device:         &B::Device,
) -> InputBatch<B> {
    InputBatch {
        input_ids:      stack_rows(&input_ids, device),
        token_type_ids: stack_rows(&token_type_ids, device),
        attention_mask: stack_rows(&attention_mask, device),
    }
}

#[derive(Clone, Debug)]
pub struct QaBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> QaBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TrainFeature, QaBatch<B>> for QaBatcher<B> {
    fn batch(&self, items: Vec<TrainFeature>) -> QaBatch<B> {
        let inputs = input_batch(
            items.iter().map(|f| f.input_ids.as_slice()).collect(),
            items.iter().map(|f| f.token_type_ids.as_slice()).collect(),
            items.iter().map(|f| f.attention_mask.as_slice()).collect(),
            &self.device,
        );

        let starts: Vec<i32> = items.iter().map(|f| f.start_position as i32).collect();
        let ends:   Vec<i32> = items.iter().map(|f| f.end_position as i32).collect();

        QaBatch {
            inputs,
            start_positions: Tensor::<B, 1, Int>::from_ints(starts.as_slice(), &self.device),
            end_positions:   Tensor::<B, 1, Int>::from_ints(ends.as_slice(), &self.device),
        }
    }
}

#[derive(Clone, Debug)]
pub struct InputBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> InputBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ModelInput, InputBatch<B>> for InputBatcher<B> {
    fn batch(&self, items: Vec<ModelInput>) -> InputBatch<B> {
        input_batch(
            items.iter().map(|f| f.input_ids.as_slice()).collect(),
            items.iter().map(|f| f.token_type_ids.as_slice()).collect(),
            items.iter().map(|f| f.attention_mask.as_slice()).collect(),
            &self.device,
        )
    }
}
