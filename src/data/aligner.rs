// ============================================================
// Layer 4 — Offset Aligner
// ============================================================
// Bridges character-level answers and token-level windows.
//
// Training: turn the answer's character span into (start, end)
// TOKEN positions inside one window.
//
//   context chars:  P a r i s _ i s _ t h e ...
//   tokens:        [CLS] what is ... [SEP] Paris is the ... [SEP]
//                    0                 7     8    9  10
//   answer "Paris" (chars 0..5)  →  start = 8, end = 8
//
// Three outcomes per window:
//   - example has no answer        → (cls, cls)
//   - answer not fully inside the
//     window's context tokens      → (0, 0)   answer-absent window
//   - otherwise                    → tightest covering token span
//
// A window that only partially overlaps the answer is labelled
// answer-absent on purpose; it is never "half right".
//
// Validation / test: keep offsets only for context tokens (and
// position 0) so the decoder can reject every other position.

use crate::domain::example::AnswerSpan;
use crate::domain::feature::{EvalFeature, Offset, TokenizedChunk, TrainFeature};

/// Token-level answer labels for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPositions {
    pub start: usize,
    pub end:   usize,
}

impl LabelPositions {
    /// Label for a window that does not contain the answer.
    pub const ANSWER_ABSENT: LabelPositions = LabelPositions { start: 0, end: 0 };

    pub fn at(index: usize) -> Self {
        Self { start: index, end: index }
    }
}

/// First and last position of the contiguous run of context tokens.
fn context_range(chunk: &TokenizedChunk) -> Option<(usize, usize)> {
    let start   = (0..chunk.len()).find(|&i| chunk.is_context(i))?;
    let mut end = start;
    while end + 1 < chunk.len() && chunk.is_context(end + 1) {
        end += 1;
    }
    Some((start, end))
}

/// Compute the training labels of one window.
pub fn align_training_labels(
    chunk:  &TokenizedChunk,
    answer: Option<AnswerSpan>,
) -> LabelPositions {
    let Some(answer) = answer else {
        return LabelPositions::at(chunk.cls_index);
    };

    let Some((context_start, context_end)) = context_range(chunk) else {
        return LabelPositions::ANSWER_ABSENT;
    };

    let offsets = &chunk.offsets;
    if offsets[context_start].0 > answer.start || offsets[context_end].1 < answer.end {
        return LabelPositions::ANSWER_ABSENT;
    }

    // Last token that starts at or before the answer start
    let mut start = context_start;
    while start < context_end && offsets[start + 1].0 <= answer.start {
        start += 1;
    }

    // First token from which every token ends at or after the answer end
    let mut end = context_end;
    while end > context_start && offsets[end - 1].1 >= answer.end {
        end -= 1;
    }

    LabelPositions { start, end }
}

/// Keep offsets of context tokens (and position 0); mark the rest absent.
pub fn build_validation_offsets(chunk: &TokenizedChunk) -> Vec<Offset> {
    chunk
        .offsets
        .iter()
        .enumerate()
        .map(|(k, &offset)| {
            if k == 0 || chunk.is_context(k) {
                Some(offset)
            } else {
                None
            }
        })
        .collect()
}

/// Turn one tokenized window into a labelled training feature.
pub fn to_train_feature(chunk: TokenizedChunk, answer: Option<AnswerSpan>) -> TrainFeature {
    let labels = align_training_labels(&chunk, answer);
    TrainFeature {
        input_ids:      chunk.input_ids,
        token_type_ids: chunk.token_type_ids,
        attention_mask: chunk.attention_mask,
        start_position: labels.start,
        end_position:   labels.end,
    }
}

/// Turn one tokenized window into a validation/test feature owned by `example_id`.
pub fn to_eval_feature(chunk: TokenizedChunk, example_id: &str) -> EvalFeature {
    let offset_mapping = build_validation_offsets(&chunk);
    EvalFeature {
        input_ids:      chunk.input_ids,
        token_type_ids: chunk.token_type_ids,
        attention_mask: chunk.attention_mask,
        offset_mapping,
        example_id:     example_id.to_string(),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::whitespace_chunks;
    use crate::domain::example::{char_slice, Example};

    const CONTEXT:  &str = "Paris is the capital of France.";
    const QUESTION: &str = "What is the capital of France?";

    #[test]
    fn test_single_window_answer_at_context_start() {
        let ex     = Example::answered("q1", CONTEXT, QUESTION, 0, "Paris");
        let chunks = whitespace_chunks(QUESTION, CONTEXT, 32, 4);
        assert_eq!(chunks.len(), 1);

        // [CLS] + 6 question words + [SEP] → context starts at 8
        let labels = align_training_labels(&chunks[0], ex.answer_span());
        assert_eq!(labels, LabelPositions { start: 8, end: 8 });
    }

    #[test]
    fn test_multi_token_answer_round_trips() {
        let start  = CONTEXT.find("capital").unwrap();
        let ex     = Example::answered("q1", CONTEXT, QUESTION, start, "capital of France.");
        let chunk  = &whitespace_chunks(QUESTION, CONTEXT, 32, 4)[0];
        let labels = align_training_labels(chunk, ex.answer_span());

        assert!(labels.start <= labels.end);
        let text = char_slice(
            CONTEXT,
            chunk.offsets[labels.start].0,
            chunk.offsets[labels.end].1,
        );
        assert_eq!(text, "capital of France.");
    }

    #[test]
    fn test_answer_inside_token_covers_whole_token() {
        // "apit" sits inside the token "capital"
        let start  = CONTEXT.find("apit").unwrap();
        let ex     = Example::answered("q1", CONTEXT, QUESTION, start, "apit");
        let chunk  = &whitespace_chunks(QUESTION, CONTEXT, 32, 4)[0];
        let labels = align_training_labels(chunk, ex.answer_span());
        assert_eq!(labels.start, labels.end);
        assert_eq!(chunk.offsets[labels.start], (13, 20));
    }

    #[test]
    fn test_no_answer_labels_cls_index() {
        let ex    = Example::unanswered("q1", CONTEXT, QUESTION);
        let chunk = &whitespace_chunks(QUESTION, CONTEXT, 32, 4)[0];
        let labels = align_training_labels(chunk, ex.answer_span());
        assert_eq!(labels, LabelPositions::at(chunk.cls_index));
        assert_eq!(labels, LabelPositions::at(0));
    }

    #[test]
    fn test_overflow_window_without_answer_is_absent() {
        let context = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        let start   = context.find("hotel").unwrap();
        let ex      = Example::answered("q1", context, "which word", start, "hotel");

        // [CLS] q q [SEP] + 6 context tokens + [SEP] = 11 positions
        let chunks = whitespace_chunks("which word", context, 11, 2);
        assert_eq!(chunks.len(), 2);

        let first  = align_training_labels(&chunks[0], ex.answer_span());
        let second = align_training_labels(&chunks[1], ex.answer_span());
        assert_eq!(first, LabelPositions::ANSWER_ABSENT);

        // second window holds context words 4..10; "hotel" is word 7
        assert_eq!(second, LabelPositions { start: 7, end: 7 });
        let text = char_slice(
            context,
            chunks[1].offsets[second.start].0,
            chunks[1].offsets[second.end].1,
        );
        assert_eq!(text, "hotel");
    }

    #[test]
    fn test_answer_straddling_window_edge_is_absent() {
        let context = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        let start   = context.find("foxtrot").unwrap();
        let ex      = Example::answered("q1", context, "which word", start, "foxtrot golf");

        // first window ends at "foxtrot", so "foxtrot golf" only fits the second
        let chunks = whitespace_chunks("which word", context, 11, 2);
        assert_eq!(align_training_labels(&chunks[0], ex.answer_span()), LabelPositions::ANSWER_ABSENT);
        let second = align_training_labels(&chunks[1], ex.answer_span());
        assert_eq!((second.start, second.end), (5, 6));
    }

    #[test]
    fn test_alignment_is_idempotent() {
        let ex    = Example::answered("q1", CONTEXT, QUESTION, 13, "capital");
        let chunk = &whitespace_chunks(QUESTION, CONTEXT, 32, 4)[0];
        assert_eq!(
            align_training_labels(chunk, ex.answer_span()),
            align_training_labels(chunk, ex.answer_span()),
        );
    }

    #[test]
    fn test_validation_offsets_keep_only_context_and_position_zero() {
        let chunk   = &whitespace_chunks(QUESTION, CONTEXT, 20, 4)[0];
        let offsets = build_validation_offsets(chunk);

        assert_eq!(offsets.len(), chunk.len());
        assert_eq!(offsets[0], Some((0, 0)));
        // question tokens and the first [SEP]
        assert!(offsets[1..8].iter().all(Option::is_none));
        assert_eq!(offsets[8], Some((0, 5)));
        // trailing [SEP] and padding
        assert!(offsets[14..].iter().all(Option::is_none));
    }

    #[test]
    fn test_eval_feature_is_tagged_with_example_id() {
        let chunk   = whitespace_chunks(QUESTION, CONTEXT, 20, 4).remove(0);
        let feature = to_eval_feature(chunk, "q42");
        assert_eq!(feature.example_id, "q42");
        assert_eq!(feature.offset_mapping.len(), feature.input_ids.len());
    }
}
