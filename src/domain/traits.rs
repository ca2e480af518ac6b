// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The data layer talks to two outside collaborators:
//   - a tokenizer that turns utterance text into token ids
//   - a resolver that turns a dataset location into a local file
//
// Both are passed explicitly to every function that needs them,
// never held as global state.

use std::path::PathBuf;

use anyhow::Result;

// ─── DialogueTokenizer ────────────────────────────────────────────────────────
/// Anything that can split text into vocabulary tokens and map
/// those tokens to ids.
///
/// Implementations:
///   - HfTokenizer → wraps a HuggingFace tokenizer.json
pub trait DialogueTokenizer: Send + Sync {
    /// Stable name of the tokenizer kind. Part of the dataset
    /// cache key, so two tokenizer kinds never share a cache file.
    fn type_name(&self) -> &str;

    /// Split text into vocabulary tokens.
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;

    /// Map tokens to ids. Unknown tokens map to the unknown-token id.
    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>>;

    /// Exact vocabulary lookup, no unknown-token fallback.
    fn token_to_id(&self, token: &str) -> Option<u32>;

    /// Id used to pad batches, if the vocabulary defines one.
    fn pad_token_id(&self) -> Option<u32>;

    /// tokenize → convert_tokens_to_ids in one step.
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let tokens = self.tokenize(text)?;
        self.convert_tokens_to_ids(&tokens)
    }
}

// ─── ResourceResolver ─────────────────────────────────────────────────────────
/// Turns a dataset location (URL or path) into a readable local file.
///
/// Implementations:
///   - CachedPathResolver → downloads URLs once, passes paths through
pub trait ResourceResolver {
    fn resolve(&self, location: &str) -> Result<PathBuf>;
}
