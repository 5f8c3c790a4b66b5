// ============================================================
// Layer 4 — Dataset Adapters
// ============================================================
// Indexed, fixed-length access over feature records for Burn's
// DataLoader. No transformation happens here.
//
//   TrainDataset → inputs + start/end labels
//   EvalDataset  → inputs + offset mapping + example id
//   InferDataset → inputs only; decoding metadata is re-joined
//                  from the matching EvalDataset afterwards
//
// Reference: Burn Book §4 (Datasets)

use burn::data::dataset::Dataset;

use crate::domain::feature::{EvalFeature, ModelInput, TrainFeature};

pub struct TrainDataset {
    features: Vec<TrainFeature>,
}

impl TrainDataset {
    pub fn new(features: Vec<TrainFeature>) -> Self { Self { features } }
}

impl Dataset<TrainFeature> for TrainDataset {
    fn get(&self, index: usize) -> Option<TrainFeature> {
        self.features.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.features.len()
    }
}

pub struct EvalDataset {
    features: Vec<EvalFeature>,
}

impl EvalDataset {
    pub fn new(features: Vec<EvalFeature>) -> Self { Self { features } }

    /// Borrow every feature, in storage order, for decoding.
    pub fn features(&self) -> &[EvalFeature] {
        &self.features
    }

    /// Model-input view over the same features.
    pub fn to_infer_dataset(&self) -> InferDataset {
        InferDataset::new(self.features.iter().map(EvalFeature::model_input).collect())
    }
}

impl Dataset<EvalFeature> for EvalDataset {
    fn get(&self, index: usize) -> Option<EvalFeature> {
        self.features.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.features.len()
    }
}

pub struct InferDataset {
    inputs: Vec<ModelInput>,
}

impl InferDataset {
    pub fn new(inputs: Vec<ModelInput>) -> Self { Self { inputs } }

    /// Longest input sequence; 0 when empty.
    pub fn max_input_len(&self) -> usize {
        self.inputs.iter().map(|i| i.input_ids.len()).max().unwrap_or(0)
    }
}

impl Dataset<ModelInput> for InferDataset {
    fn get(&self, index: usize) -> Option<ModelInput> {
        self.inputs.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.inputs.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn eval_feature(id: &str) -> EvalFeature {
        EvalFeature {
            input_ids:      vec![101, 7, 102],
            token_type_ids: vec![0, 0, 0],
            attention_mask: vec![1, 1, 1],
            offset_mapping: vec![Some((0, 0)), None, None],
            example_id:     id.to_string(),
        }
    }

    #[test]
    fn test_eval_dataset_indexed_access() {
        let ds = EvalDataset::new(vec![eval_feature("a"), eval_feature("b")]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().example_id, "b");
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_infer_dataset_strips_metadata() {
        let ds    = EvalDataset::new(vec![eval_feature("a")]);
        let infer = ds.to_infer_dataset();
        assert_eq!(infer.len(), 1);
        assert_eq!(infer.get(0).unwrap().input_ids, vec![101, 7, 102]);
        assert_eq!(infer.max_input_len(), 3);
        assert_eq!(InferDataset::new(Vec::new()).max_input_len(), 0);
    }

    #[test]
    fn test_train_dataset_len() {
        let f = TrainFeature {
            input_ids:      vec![1, 2],
            token_type_ids: vec![0, 1],
            attention_mask: vec![1, 1],
            start_position: 1,
            end_position:   1,
        };
        let ds = TrainDataset::new(vec![f.clone(), f]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0).unwrap().start_position, 1);
    }
}
