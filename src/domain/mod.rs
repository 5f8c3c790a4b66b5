// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the core concepts
// of extractive question answering:
//
//   Example    — one question/context pair from the corpus
//   Feature    — one fixed-length tokenized window of an Example
//   Prediction — the decoded answer text for one Example
//
// Rules for this layer:
//   - NO Burn or tokenizers types
//   - NO file I/O
//   - Features point back to Examples by id (a foreign key),
//     never by reference
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Question/context/answer records and predictions
pub mod example;

/// Tokenized windows and the per-split feature records
pub mod feature;

/// Core abstractions (traits) that other layers implement
pub mod traits;
