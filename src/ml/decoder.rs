// ============================================================
// Layer 5 — Span Decoder
// ============================================================
// Turns per-token start/end logits back into answer text.
//
// For every feature of an example:
//   1. take the n_best positions by start logit
//   2. take the n_best positions by end logit
//   3. pair them up (n_best² candidates) and drop pairs where
//        - either position has no offset (question/special token)
//        - end < start
//        - the span is longer than max_answer_length tokens
//   4. text  = context[offset(start).0 .. offset(end).1]
//      score = start_logit + end_logit
//
// The best candidate across all features wins. Ties keep the
// first one seen (strict >), so decoding is deterministic.
// No surviving candidate → empty prediction ("no answer").
//
// This is a bounded greedy search: O(features × n_best²).

use crate::data::grouper::{group_features, FeatureGroups};
use crate::domain::example::{char_slice, Example, Prediction};
use crate::domain::feature::{EvalFeature, Offset};

/// Positions considered per side before pairing
pub const DEFAULT_N_BEST: usize = 5;

/// Start/end logits, one row per feature, in feature storage order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogitTable {
    pub start: Vec<Vec<f32>>,
    pub end:   Vec<Vec<f32>>,
}

impl LogitTable {
    pub fn new(start: Vec<Vec<f32>>, end: Vec<Vec<f32>>) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.start.len().min(self.end.len())
    }

    /// Drop rows past `n`; batched inference may pad the last batch.
    pub fn truncate(&mut self, n: usize) {
        self.start.truncate(n);
        self.end.truncate(n);
    }
}

/// One valid (start, end) pair with its extracted text.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSpan {
    pub text:          String,
    pub score:         f32,
    pub feature_index: usize,
    pub start_index:   usize,
    pub end_index:     usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SpanDecoder {
    n_best:            usize,
    max_answer_length: usize,
}

/// Indices of the `k` largest logits, highest first.
/// Equal logits keep ascending position order.
fn top_k_indices(logits: &[f32], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..logits.len()).collect();
    indices.sort_by(|&a, &b| logits[b].total_cmp(&logits[a]));
    indices.truncate(k);
    indices
}

impl SpanDecoder {
    pub fn new(max_answer_length: usize) -> Self {
        Self { n_best: DEFAULT_N_BEST, max_answer_length }
    }

    pub fn with_n_best(mut self, n_best: usize) -> Self {
        self.n_best = n_best;
        self
    }

    fn span_offsets(&self, offsets: &[Offset], start: usize, end: usize) -> Option<(usize, usize)> {
        let (char_start, _) = offsets.get(start).copied().flatten()?;
        let (_, char_end)   = offsets.get(end).copied().flatten()?;
        if end < start || end - start + 1 > self.max_answer_length {
            return None;
        }
        Some((char_start, char_end))
    }

    /// Every surviving candidate of one example, in enumeration order:
    /// features in group order, start rank outer, end rank inner.
    pub fn candidates(
        &self,
        context:         &str,
        feature_indices: &[usize],
        logits:          &LogitTable,
        features:        &[EvalFeature],
    ) -> Vec<CandidateSpan> {
        let mut answers = Vec::new();

        for &feature_index in feature_indices {
            let (Some(start_logit), Some(end_logit), Some(feature)) = (
                logits.start.get(feature_index),
                logits.end.get(feature_index),
                features.get(feature_index),
            ) else {
                tracing::warn!("No logits for feature {}; skipping", feature_index);
                continue;
            };
            let offsets = &feature.offset_mapping;

            let start_indexes = top_k_indices(start_logit, self.n_best);
            let end_indexes   = top_k_indices(end_logit, self.n_best);

            for &start_index in &start_indexes {
                for &end_index in &end_indexes {
                    let Some((char_start, char_end)) =
                        self.span_offsets(offsets, start_index, end_index)
                    else {
                        continue;
                    };

                    answers.push(CandidateSpan {
                        text:  char_slice(context, char_start, char_end),
                        score: start_logit[start_index] + end_logit[end_index],
                        feature_index,
                        start_index,
                        end_index,
                    });
                }
            }
        }

        answers
    }

    /// Highest-scoring candidate; the first one wins on ties.
    pub fn best_span(
        &self,
        context:         &str,
        feature_indices: &[usize],
        logits:          &LogitTable,
        features:        &[EvalFeature],
    ) -> Option<CandidateSpan> {
        let mut best: Option<CandidateSpan> = None;
        for candidate in self.candidates(context, feature_indices, logits, features) {
            if best.as_ref().map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Decode one example from the features grouped under its id.
    pub fn decode(
        &self,
        example:         &Example,
        feature_indices: &[usize],
        logits:          &LogitTable,
        features:        &[EvalFeature],
    ) -> Prediction {
        match self.best_span(&example.context, feature_indices, logits, features) {
            Some(span) => {
                tracing::debug!(
                    "{}: feature {} span [{},{}] score={:.4}",
                    example.question_id, span.feature_index,
                    span.start_index, span.end_index, span.score,
                );
                Prediction::new(&example.question_id, span.text)
            }
            None => Prediction::no_answer(&example.question_id),
        }
    }

    /// Group features by example and decode every example in order.
    pub fn decode_all(
        &self,
        examples: &[Example],
        features: &[EvalFeature],
        logits:   &LogitTable,
    ) -> Vec<Prediction> {
        let groups: FeatureGroups = group_features(features);
        examples
            .iter()
            .map(|ex| self.decode(ex, groups.features_for(&ex.question_id), logits, features))
            .collect()
    }
}
