// ============================================================
// Layer 3 — Example and Prediction Domain Types
// ============================================================
// An Example is one logical question over one context passage.
// Answers are stored at the CHARACTER level:
//
//   context:      "Paris is the capital of France."
//   answer_start: [0]
//   answer_text:  ["Paris"]
//
// An empty answer_start means the question has no answer in
// the context. Examples are immutable once parsed.
//
// All offsets count Unicode scalar values (chars), not bytes,
// so they line up with the tokenizer's character offsets.

use serde::{Deserialize, Serialize};

/// One question/context pair from the source corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub question_id:  String,
    pub context:      String,
    pub question:     String,

    /// Character offsets of each answer; empty = no answer
    #[serde(default)]
    pub answer_start: Vec<usize>,

    /// Answer strings aligned with `answer_start`
    #[serde(default)]
    pub answer_text:  Vec<String>,
}

/// Half-open character range `[start, end)` of an answer in the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerSpan {
    pub start: usize,
    pub end:   usize,
}

impl Example {
    /// Build an unanswered example (test corpora carry no answers).
    pub fn unanswered(
        question_id: impl Into<String>,
        context:     impl Into<String>,
        question:    impl Into<String>,
    ) -> Self {
        Self {
            question_id:  question_id.into(),
            context:      context.into(),
            question:     question.into(),
            answer_start: Vec::new(),
            answer_text:  Vec::new(),
        }
    }

    /// Build an example with a single labelled answer.
    pub fn answered(
        question_id: impl Into<String>,
        context:     impl Into<String>,
        question:    impl Into<String>,
        start:       usize,
        text:        impl Into<String>,
    ) -> Self {
        Self {
            answer_start: vec![start],
            answer_text:  vec![text.into()],
            ..Self::unanswered(question_id, context, question)
        }
    }

    pub fn has_answer(&self) -> bool {
        !self.answer_start.is_empty() && !self.answer_text.is_empty()
    }

    /// Character span of the first answer, or None for a no-answer example.
    pub fn answer_span(&self) -> Option<AnswerSpan> {
        let start = *self.answer_start.first()?;
        let text  = self.answer_text.first()?;
        Some(AnswerSpan { start, end: start + text.chars().count() })
    }

    /// Reference answers for scoring; a no-answer example scores against "".
    pub fn reference_answers(&self) -> Vec<String> {
        if self.answer_text.is_empty() {
            vec![String::new()]
        } else {
            self.answer_text.clone()
        }
    }
}

/// Slice `text` by character offsets `[start, end)`.
/// Out-of-range offsets are clamped instead of panicking.
pub fn char_slice(text: &str, start: usize, end: usize) -> String {
    if end <= start {
        return String::new();
    }
    text.chars().skip(start).take(end - start).collect()
}

/// The decoded answer for one Example. An empty `prediction_text`
/// means the model predicted "no answer".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "id")]
    pub question_id:     String,
    pub prediction_text: String,
}

impl Prediction {
    pub fn new(question_id: impl Into<String>, prediction_text: impl Into<String>) -> Self {
        Self {
            question_id:     question_id.into(),
            prediction_text: prediction_text.into(),
        }
    }

    pub fn no_answer(question_id: impl Into<String>) -> Self {
        Self::new(question_id, "")
    }

    pub fn is_no_answer(&self) -> bool {
        self.prediction_text.is_empty()
    }
}
