// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing dialogue corpora and
// the training instances derived from them.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// The tokenizer and the dataset resolver are described here as
// traits so the data layer can be tested with small fakes.

// Nested dialogue corpus, raw or tokenized
pub mod dialogue;

// One training example and the special marker ids
pub mod instance;

// Core abstractions (traits) that other layers implement
pub mod traits;
