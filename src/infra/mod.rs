// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the disk or the network on behalf
// of the data layer:
//
//   tokenizer_store.rs: tokenizer.json persistence
//                        Builds a word-level tokenizer with the
//                        dialogue markers reserved if none
//                        exists, otherwise loads the saved one.
//
//   dataset_cache.rs:   Tokenized corpus cache
//                        One JSON file per tokenizer kind, so
//                        switching tokenizers never reuses ids
//                        from another vocabulary.
//
//   resource.rs:        Dataset location resolution
//                        URLs are downloaded once into a local
//                        directory; local paths pass through.

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// `{dataset_cache}_{tokenizer}` JSON cache
pub mod dataset_cache;

/// URL or path → local file
pub mod resource;
