// ============================================================
// Layer 4 — SQuAD Corpus Loader
// ============================================================
// Reads SQuAD-style JSON corpora:
//
//   { "data": [ { "paragraphs": [ { "context": "...",
//       "qas": [ { "question_id": "...", "question": "...",
//                  "answers": [ { "answer_start": 0, "text": "..." } ] } ] } ] } ] }
//
// Every `qas` entry becomes one Example. A labelled question
// keeps its first answer; an empty (or missing) `answers` list
// means "no answer".
//
// Structural problems are fatal: a missing key or a wrong type
// aborts loading with a CorpusError. There is no partial recovery.
// An answer running past its context is only logged; the aligner
// labels every window of such an example as absent.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::domain::example::{char_slice, Example};
use crate::domain::traits::ExampleSource;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("cannot read corpus '{path}': {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed corpus: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ─── Raw JSON layout ──────────────────────────────────────────────────────────
#[derive(Debug, Deserialize)]
struct RawCorpus {
    data: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    paragraphs: Vec<RawParagraph>,
}

#[derive(Debug, Deserialize)]
struct RawParagraph {
    context: String,
    qas:     Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    question_id: QuestionId,
    question:    String,
    #[serde(default)]
    answers:     Vec<RawAnswer>,
}

#[derive(Debug, Deserialize)]
struct RawAnswer {
    answer_start: usize,
    text:         String,
}

/// Corpora mix string and integer question ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionId {
    Text(String),
    Number(i64),
}

impl QuestionId {
    fn into_string(self) -> String {
        match self {
            QuestionId::Text(s)   => s,
            QuestionId::Number(n) => n.to_string(),
        }
    }
}

/// Loads Examples from one SQuAD-style JSON file.
pub struct SquadLoader {
    path: PathBuf,
}

impl SquadLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl ExampleSource for SquadLoader {
    fn load_examples(&self) -> Result<Vec<Example>> {
        let text = fs::read_to_string(&self.path).map_err(|source| CorpusError::Io {
            path: self.path.clone(),
            source,
        })?;
        let examples = parse_corpus(&text)
            .with_context(|| format!("Cannot parse corpus '{}'", self.path.display()))?;

        tracing::info!(
            "Loaded {} examples from '{}' ({} without answer)",
            examples.len(),
            self.path.display(),
            examples.iter().filter(|e| !e.has_answer()).count(),
        );
        Ok(examples)
    }
}

/// Parse corpus JSON text into Examples, in corpus order.
fn parse_corpus(text: &str) -> Result<Vec<Example>, CorpusError> {
    let corpus: RawCorpus = serde_json::from_str(text)?;

    let mut examples = Vec::new();
    for article in corpus.data {
        for paragraph in article.paragraphs {
            for qa in paragraph.qas {
                let question_id = qa.question_id.into_string();
                let example = match qa.answers.into_iter().next() {
                    Some(answer) => {
                        let start = correct_answer_start(&paragraph.context, answer.answer_start, &answer.text);
                        warn_if_out_of_bounds(&question_id, &paragraph.context, start, &answer.text);
                        Example::answered(question_id, paragraph.context.as_str(), qa.question, start, answer.text)
                    }
                    None => Example::unanswered(question_id, paragraph.context.as_str(), qa.question),
                };
                examples.push(example);
            }
        }
    }
    Ok(examples)
}

/// Some corpora record answer starts one character early. Shift by one
/// when that makes the context agree with the answer text.
fn correct_answer_start(context: &str, start: usize, text: &str) -> usize {
    let len = text.chars().count();
    if char_slice(context, start, start + len) != text
        && char_slice(context, start + 1, start + 1 + len) == text
    {
        start + 1
    } else {
        start
    }
}

fn warn_if_out_of_bounds(question_id: &str, context: &str, start: usize, text: &str) {
    let len         = text.chars().count();
    let context_len = context.chars().count();
    if start + len > context_len {
        tracing::warn!(
            "Question '{}': answer at char {} (+{}) runs past its context ({} chars)",
            question_id, start, len, context_len
        );
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aligner::{align_training_labels, LabelPositions};
    use crate::data::test_support::whitespace_chunks;

    const CORPUS: &str = r#"{
        "data": [{
            "paragraphs": [{
                "context": "Paris is the capital of France.",
                "qas": [
                    {"question_id": "q1", "question": "What is the capital of France?",
                     "answers": [{"answer_start": 0, "text": "Paris"}]},
                    {"question_id": 17, "question": "Who is the king?", "answers": []}
                ]
            }]
        }]
    }"#;

    #[test]
    fn test_parses_answered_and_unanswered() {
        let examples = parse_corpus(CORPUS).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].question_id, "q1");
        assert_eq!(examples[0].answer_start, vec![0]);
        assert_eq!(examples[0].answer_text, vec!["Paris".to_string()]);

        assert_eq!(examples[1].question_id, "17");
        assert!(!examples[1].has_answer());
    }

    #[test]
    fn test_missing_answers_key_means_no_answer() {
        let corpus = r#"{"data":[{"paragraphs":[{"context":"c","qas":[
            {"question_id":"t1","question":"q"}]}]}]}"#;
        let examples = parse_corpus(corpus).unwrap();
        assert!(examples[0].answer_start.is_empty());
    }

    #[test]
    fn test_missing_context_is_malformed() {
        let corpus = r#"{"data":[{"paragraphs":[{"qas":[]}]}]}"#;
        assert!(matches!(parse_corpus(corpus), Err(CorpusError::Malformed(_))));
    }

    #[test]
    fn test_answer_outside_context_still_loads() {
        let corpus = r#"{"data":[{"paragraphs":[{"context":"abc","qas":[
            {"question_id":"t1","question":"q","answers":[{"answer_start":2,"text":"cdef"}]}]}]}]}"#;
        let examples = parse_corpus(corpus).unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].answer_start, vec![2]);

        // no window can hold the answer, so it aligns to (0, 0)
        let chunks = whitespace_chunks("q", "abc", 8, 1);
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            align_training_labels(&chunks[0], examples[0].answer_span()),
            LabelPositions::ANSWER_ABSENT
        );
    }

    #[test]
    fn test_off_by_one_answer_start_is_corrected() {
        let context = "The river Nile flows north.";
        assert_eq!(correct_answer_start(context, 9, "Nile"), 10);
        assert_eq!(correct_answer_start(context, 10, "Nile"), 10);
        // no shift when neither position matches
        assert_eq!(correct_answer_start(context, 3, "Nile"), 3);
    }

    #[test]
    fn test_loader_reports_unreadable_file() {
        let loader = SquadLoader::new("/definitely/not/here.json");
        assert!(loader.load_examples().is_err());
    }
}
