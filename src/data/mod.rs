// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a raw dialogue corpus to tensor batches.
//
// The pipeline flows in this order:
//
//   corpus.json (URL or path)
//       │
//       ▼
//   get_data          → cache hit, or fetch + tokenize + cache
//       │
//       ▼
//   data_process      → one Instance per dialogue
//       │                (BOS, speaker markers, labels)
//       ▼
//   InstanceDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   DialogueBatcher   → pads instances into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// The streaming variant (get_dist_loaders) reads per-split
// files and builds each instance when the loader asks for it.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Corpus loading, tokenization, caching, preview
pub mod loader;

/// Dialogue → Instance construction
pub mod instances;

/// Implements Burn's Dataset trait for instances
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Per-rank sharding for distributed runs
pub mod sampler;

/// Train/validation DataLoader wiring
pub mod loaders;

#[cfg(test)]
pub mod vocab_tokenizer;
