// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
// preparing the tokenized corpus, or walking the batches a
// training loop would consume.
//
// Rules for this layer:
//   - No tokenization or tensor code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

/// Serialisable run configuration shared by every use case
pub mod config;

/// Tokenizer + cache + instance building, with a summary report
pub mod prepare_use_case;

/// Train/validation loaders walked for one epoch
pub mod batches_use_case;
