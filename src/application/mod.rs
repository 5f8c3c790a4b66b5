// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// One use case per pipeline driver. Each coordinates the other
// layers and holds no ML math or file-format code itself.
//
//   preprocess → raw corpora   → feature tables
//   train      → feature tables → trained model
//   infer      → test table     → predictions.json
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Corpus → features workflow
pub mod preprocess_use_case;

// The training workflow
pub mod train_use_case;

// The prediction workflow
pub mod infer_use_case;
