// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits so the
// concrete corpus format can change without touching the
// pipeline drivers.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::example::Example;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can produce question/context Examples.
///
/// Implementations:
///   - SquadLoader → SQuAD-style JSON corpus files
pub trait ExampleSource {
    /// Load every Example from this source, in corpus order.
    fn load_examples(&self) -> Result<Vec<Example>>;
}
