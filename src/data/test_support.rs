//! Whitespace stand-ins for a subword tokenizer, used by unit tests to
//! build `TokenizedChunk`s with real character offsets and overflow.

use std::collections::HashMap;
use tokenizers::models::wordlevel::WordLevel;
use tokenizers::pre_tokenizers::whitespace::WhitespaceSplit;
use tokenizers::processors::template::TemplateProcessing;
use tokenizers::Tokenizer;

use crate::domain::feature::TokenizedChunk;

pub const CLS_ID: u32 = 101;
pub const SEP_ID: u32 = 102;
pub const PAD_ID: u32 = 0;

/// Character spans of whitespace-separated words.
pub fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    let mut count = 0;
    for (i, c) in text.chars().enumerate() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
        count = i + 1;
    }
    if let Some(s) = start {
        spans.push((s, count));
    }
    spans
}

/// Encode `[CLS] question [SEP] context-window [SEP] [PAD]...` windows,
/// overlapping consecutive windows by `stride` context words.
pub fn whitespace_chunks(
    question:   &str,
    context:    &str,
    max_length: usize,
    stride:     usize,
) -> Vec<TokenizedChunk> {
    let q_spans = word_spans(question);
    let c_spans = word_spans(context);
    let budget  = max_length - q_spans.len() - 3;
    assert!(stride < budget, "stride must be smaller than the context budget");

    let mut chunks = Vec::new();
    let mut start  = 0usize;
    loop {
        let end = (start + budget).min(c_spans.len());

        let mut chunk = TokenizedChunk {
            input_ids:      vec![CLS_ID],
            token_type_ids: vec![0],
            attention_mask: vec![1],
            offsets:        vec![(0, 0)],
            sequence_ids:   vec![None],
            cls_index:      0,
        };
        for (i, &span) in q_spans.iter().enumerate() {
            push(&mut chunk, 1000 + i as u32, 0, span, Some(0));
        }
        push(&mut chunk, SEP_ID, 0, (0, 0), None);
        for (i, &span) in c_spans[start..end].iter().enumerate() {
            push(&mut chunk, 2000 + (start + i) as u32, 1, span, Some(1));
        }
        push(&mut chunk, SEP_ID, 1, (0, 0), None);
        while chunk.len() < max_length {
            chunk.input_ids.push(PAD_ID);
            chunk.token_type_ids.push(0);
            chunk.attention_mask.push(0);
            chunk.offsets.push((0, 0));
            chunk.sequence_ids.push(None);
        }
        chunks.push(chunk);

        if end == c_spans.len() {
            break;
        }
        start = end - stride;
    }
    chunks
}

fn push(
    chunk:   &mut TokenizedChunk,
    id:      u32,
    type_id: u32,
    offset:  (usize, usize),
    seq:     Option<usize>,
) {
    chunk.input_ids.push(id);
    chunk.token_type_ids.push(type_id);
    chunk.attention_mask.push(1);
    chunk.offsets.push(offset);
    chunk.sequence_ids.push(seq);
}

/// Word-level tokenizer with BERT-style pair template.
/// Ids: [PAD]=0, [UNK]=1, [CLS]=2, [SEP]=3, then `words` in order.
pub fn word_tokenizer(words: &[&str]) -> Tokenizer {
    let mut vocab: HashMap<String, u32> = HashMap::new();
    for (id, tok) in ["[PAD]", "[UNK]", "[CLS]", "[SEP]"].iter().enumerate() {
        vocab.insert(tok.to_string(), id as u32);
    }
    for w in words {
        let next = vocab.len() as u32;
        vocab.entry(w.to_string()).or_insert(next);
    }
    let model = WordLevel::builder()
        .vocab(vocab)
        .unk_token("[UNK]".to_string())
        .build()
        .unwrap();

    let mut tokenizer = Tokenizer::new(model);
    tokenizer.with_pre_tokenizer(WhitespaceSplit);
    tokenizer.with_post_processor(
        TemplateProcessing::builder()
            .try_single("[CLS] $A [SEP]")
            .unwrap()
            .try_pair("[CLS] $A:0 [SEP]:0 $B:1 [SEP]:1")
            .unwrap()
            .special_tokens(vec![("[CLS]", 2), ("[SEP]", 3)])
            .build()
            .unwrap(),
    );
    tokenizer
}
