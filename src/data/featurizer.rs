// ============================================================
// Layer 4 — Featurizer
// ============================================================
// Runs the pretrained tokenizer over (question, context) pairs
// and unrolls overflowing windows into Features.
//
// Tokenizer settings for every call:
//   - truncation OnlySecond  → the question is never cut,
//                              only the context is windowed
//   - stride                 → consecutive windows share
//                              `stride` context tokens
//   - padding Fixed(max_len) → every window has the same length
//   - char offsets           → offsets line up with the
//                              character-level answer_start
//
// max_length and stride are passed to `Featurizer::new` and
// set on the owned tokenizer; nothing is captured from a
// surrounding configuration.
//
// Reference: tokenizers crate (TruncationParams, PaddingParams)

use anyhow::Result;
use tokenizers::{
    Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection,
    TruncationParams, TruncationStrategy,
};

use crate::data::aligner::{to_eval_feature, to_train_feature};
use crate::domain::example::Example;
use crate::domain::feature::{EvalFeature, TokenizedChunk, TrainFeature};

const CLS_TOKENS: [&str; 3] = ["[CLS]", "<s>", "<cls>"];
const PAD_TOKENS: [&str; 2] = ["[PAD]", "<pad>"];

pub struct Featurizer {
    tokenizer: Tokenizer,
    cls_id:    Option<u32>,
}

impl Featurizer {
    /// Configure `tokenizer` for windowed pair encoding.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize, stride: usize) -> Result<Self> {
        anyhow::ensure!(
            stride < max_length,
            "stride ({stride}) must be less than max_length ({max_length})"
        );

        let (pad_token, pad_id) = PAD_TOKENS
            .iter()
            .find_map(|t| tokenizer.token_to_id(t).map(|id| (t.to_string(), id)))
            .unwrap_or_else(|| ("[PAD]".to_string(), 0));

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                stride,
                strategy:  TruncationStrategy::OnlySecond,
                direction: TruncationDirection::Right,
            }))
            .map_err(|e| anyhow::anyhow!("Invalid truncation settings: {e}"))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            pad_id,
            pad_token,
            ..Default::default()
        }));

        let cls_id = CLS_TOKENS.iter().find_map(|t| tokenizer.token_to_id(t));
        if cls_id.is_none() {
            tracing::warn!("Tokenizer has no CLS token; position 0 is used as the no-answer index");
        }

        Ok(Self { tokenizer, cls_id })
    }

    /// Tokenize one example into its overflow windows, in window order.
    pub fn chunks(&self, example: &Example) -> Result<Vec<TokenizedChunk>> {
        let mut encoding = self
            .tokenizer
            .encode_char_offsets((example.question.as_str(), example.context.as_str()), true)
            .map_err(|e| anyhow::anyhow!("Tokenise '{}': {e}", example.question_id))?;

        let overflowing = encoding.take_overflowing();
        let mut chunks  = Vec::with_capacity(1 + overflowing.len());
        chunks.push(self.to_chunk(&encoding));
        chunks.extend(overflowing.iter().map(|e| self.to_chunk(e)));
        Ok(chunks)
    }

    fn to_chunk(&self, encoding: &Encoding) -> TokenizedChunk {
        let input_ids = encoding.get_ids().to_vec();
        let cls_index = self
            .cls_id
            .and_then(|cls| input_ids.iter().position(|&id| id == cls))
            .unwrap_or(0);

        TokenizedChunk {
            token_type_ids: encoding.get_type_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
            offsets:        encoding.get_offsets().to_vec(),
            sequence_ids:   encoding.get_sequence_ids(),
            input_ids,
            cls_index,
        }
    }

    /// Training features with aligned start/end labels.
    pub fn training_features(&self, examples: &[Example]) -> Result<Vec<TrainFeature>> {
        let mut features = Vec::new();
        for example in examples {
            let answer = example.answer_span();
            for chunk in self.chunks(example)? {
                features.push(to_train_feature(chunk, answer));
            }
        }
        tracing::debug!("{} examples → {} training features", examples.len(), features.len());
        Ok(features)
    }

    /// Validation/test features with context-only offsets and example ids.
    pub fn eval_features(&self, examples: &[Example]) -> Result<Vec<EvalFeature>> {
        let mut features = Vec::new();
        for example in examples {
            for chunk in self.chunks(example)? {
                features.push(to_eval_feature(chunk, &example.question_id));
            }
        }
        tracing::debug!("{} examples → {} eval features", examples.len(), features.len());
        Ok(features)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::word_tokenizer;
    use crate::domain::example::char_slice;

    #[test]
    fn test_single_window_features() {
        let context  = "Paris is the capital of France.";
        let question = "What is the capital of France?";
        let words: Vec<&str> = context.split(' ').chain(question.split(' ')).collect();
        let f = Featurizer::new(word_tokenizer(&words), 24, 4).unwrap();

        let ex     = Example::answered("q1", context, question, 0, "Paris");
        let chunks = f.chunks(&ex).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 24);
        assert_eq!(chunks[0].cls_index, 0);

        let train = f.training_features(&[ex.clone()]).unwrap();
        assert_eq!((train[0].start_position, train[0].end_position), (8, 8));

        let eval = f.eval_features(&[ex]).unwrap();
        assert_eq!(eval[0].example_id, "q1");
        assert_eq!(eval[0].offset_mapping[8], Some((0, 5)));
        assert_eq!(eval[0].offset_mapping[1], None);
    }

    #[test]
    fn test_long_context_overflows() {
        let context = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        let words: Vec<&str> = context.split(' ').chain(["which", "word"]).collect();
        let f = Featurizer::new(word_tokenizer(&words), 11, 2).unwrap();

        let start = context.find("hotel").unwrap();
        let ex    = Example::answered("q1", context, "which word", start, "hotel");

        // [CLS] which word [SEP] + 6 context words + [SEP]; windows step by 6 - 2
        let train = f.training_features(&[ex.clone()]).unwrap();
        assert_eq!(train.len(), 2);
        assert!(train.iter().all(|t| t.input_ids.len() == 11));
        assert_eq!((train[0].start_position, train[0].end_position), (0, 0));
        assert_eq!((train[1].start_position, train[1].end_position), (7, 7));

        let eval = f.eval_features(&[ex]).unwrap();
        assert_eq!(eval.len(), 2);
        let (char_start, char_end) = eval[1].offset_mapping[7].unwrap();
        assert_eq!(char_slice(context, char_start, char_end), "hotel");
        // window 2 starts at "echo": the stride shares echo + foxtrot
        assert_eq!(eval[1].offset_mapping[4], Some((26, 30)));
    }

    #[test]
    fn test_stride_must_fit_window() {
        assert!(Featurizer::new(word_tokenizer(&[]), 8, 8).is_err());
    }
}
