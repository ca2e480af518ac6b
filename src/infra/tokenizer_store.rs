// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads a HuggingFace tokenizer.json, or builds a word-level
// one from the corpus when none exists yet.
//
// The built vocabulary always carries the six markers the
// instance builder and batcher need:
//   [PAD] [UNK] [CLS] [SEP] [speaker1] [speaker2]
//
// Building writes the tokenizer JSON by hand and loads it back,
// which avoids the trainer/ModelWrapper type mismatch in
// tokenizers 0.15.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use tokenizers::models::ModelWrapper;
use tokenizers::{
    Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer, Tokenizer,
};

use crate::domain::instance::{BOS_TOKEN, EOS_TOKEN, SPEAKER1_TOKEN, SPEAKER2_TOKEN};
use crate::domain::traits::DialogueTokenizer;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";

/// Markers in id order for a freshly built vocabulary.
const RESERVED_TOKENS: [&str; 6] = [
    PAD_TOKEN, UNK_TOKEN, BOS_TOKEN, EOS_TOKEN, SPEAKER1_TOKEN, SPEAKER2_TOKEN,
];

// ─── HfTokenizer ──────────────────────────────────────────────────────────────
/// A `tokenizers::Tokenizer` exposed through the DialogueTokenizer trait.
pub struct HfTokenizer {
    inner:     Tokenizer,
    type_name: String,
}

impl HfTokenizer {
    pub fn new(inner: Tokenizer) -> Self {
        let kind = match inner.get_model() {
            ModelWrapper::BPE(_)       => "BPE",
            ModelWrapper::WordPiece(_) => "WordPiece",
            ModelWrapper::WordLevel(_) => "WordLevel",
            ModelWrapper::Unigram(_)   => "Unigram",
        };
        Self { inner, type_name: format!("{kind}Tokenizer") }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}", path.display(), e
            ))?;
        Ok(Self::new(inner))
    }

    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(false)
    }
}

impl DialogueTokenizer for HfTokenizer {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let enc = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        Ok(enc.get_tokens().to_vec())
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Result<Vec<u32>> {
        let unk = self.inner.token_to_id(UNK_TOKEN);
        tokens
            .iter()
            .map(|t| {
                self.inner
                    .token_to_id(t)
                    .or(unk)
                    .ok_or_else(|| anyhow::anyhow!(
                        "Token '{t}' is not in the vocabulary and no {UNK_TOKEN} is defined"
                    ))
            })
            .collect()
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }

    fn pad_token_id(&self) -> Option<u32> {
        self.inner
            .token_to_id(PAD_TOKEN)
            .or_else(|| self.inner.token_to_id("<pad>"))
            .or_else(|| self.inner.token_to_id("<|pad|>"))
    }
}

// ─── TokenizerStore ───────────────────────────────────────────────────────────
pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Load existing tokenizer or build a new one from texts
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<HfTokenizer> {
        if self.exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<HfTokenizer> {
        HfTokenizer::from_file(self.path())
    }

    /// Count corpus words, keep the most frequent ones and write a
    /// WordLevel tokenizer.json next to the markers.
    ///
    /// Words are counted with the normalizer and pre-tokenizer of a
    /// markers-only build of the same JSON, so every counted word is
    /// exactly a string the finished tokenizer will look up.
    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<HfTokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let mut vocab = serde_json::Map::new();
        for (id, token) in RESERVED_TOKENS.iter().enumerate() {
            vocab.insert(token.to_string(), serde_json::json!(id));
        }
        let base = Tokenizer::from_str(&tokenizer_json(vocab.clone()).to_string())
            .map_err(|e| anyhow::anyhow!("Cannot assemble tokenizer: {e}"))?;

        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in corpus_words(&base, text)? {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        // Most frequent first, ties alphabetical so rebuilds are stable
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(RESERVED_TOKENS.len()));

        let mut next_id = RESERVED_TOKENS.len();
        for (word, _) in &words {
            if !vocab.contains_key(word) {
                vocab.insert(word.clone(), serde_json::json!(next_id));
                next_id += 1;
            }
        }

        let tok_path = self.path();
        std::fs::write(&tok_path, serde_json::to_string_pretty(&tokenizer_json(vocab))?)
            .with_context(|| format!("Cannot write '{}'", tok_path.display()))?;

        tracing::info!(
            "Tokenizer built with {} entries, saved to '{}'",
            next_id,
            tok_path.display()
        );

        self.load()
    }
}

/// Full tokenizer.json for a word-level vocabulary. The markers are
/// registered as special added tokens so they never get normalized.
fn tokenizer_json(vocab: serde_json::Map<String, serde_json::Value>) -> serde_json::Value {
    let added_tokens: Vec<serde_json::Value> = RESERVED_TOKENS
        .iter()
        .enumerate()
        .map(|(id, token)| serde_json::json!({
            "id": id, "content": token, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        }))
        .collect();

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": false,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": UNK_TOKEN
        }
    })
}

/// Words of `text` as `tokenizer` splits them before the model lookup.
fn corpus_words(tokenizer: &Tokenizer, text: &str) -> Result<Vec<String>> {
    let mut pretok = PreTokenizedString::from(text);
    if let Some(normalizer) = tokenizer.get_normalizer() {
        pretok
            .normalize(|s| normalizer.normalize(s))
            .map_err(|e| anyhow::anyhow!("Normalisation error: {e}"))?;
    }
    if let Some(pre_tokenizer) = tokenizer.get_pre_tokenizer() {
        pre_tokenizer
            .pre_tokenize(&mut pretok)
            .map_err(|e| anyhow::anyhow!("Pre-tokenisation error: {e}"))?;
    }
    Ok(pretok
        .get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .map(|(word, _, _)| word.to_string())
        .filter(|word| !word.is_empty())
        .collect())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn markers_only() -> Tokenizer {
        let vocab = RESERVED_TOKENS
            .iter()
            .enumerate()
            .map(|(id, t)| (t.to_string(), serde_json::json!(id)))
            .collect();
        Tokenizer::from_str(&tokenizer_json(vocab).to_string()).unwrap()
    }

    #[test]
    fn test_corpus_words_split_punctuation() {
        let words = corpus_words(&markers_only(), "Hello, World!").unwrap();
        assert_eq!(words, vec!["hello", ",", "world", "!"]);
    }

    #[test]
    fn test_corpus_words_isolate_cjk_characters() {
        let words = corpus_words(&markers_only(), "你好 ok").unwrap();
        assert_eq!(words, vec!["你", "好", "ok"]);
    }

    #[test]
    fn test_unusual_characters_stay_in_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let texts: Vec<String> = ["x² y", "cafe\u{301} ok", "a\u{200b}b"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let tok = store.load_or_build(&texts, 100).unwrap();

        for text in &texts {
            let tokens = tok.tokenize(text).unwrap();
            assert!(!tokens.is_empty(), "{text:?}");
            assert!(!tokens.iter().any(|t| t == UNK_TOKEN), "{text:?} → {tokens:?}");
            assert!(tok.encode(text).unwrap().iter().all(|&id| id != 1), "{text:?}");
        }
    }

    #[test]
    fn test_build_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let texts = vec!["hello there".to_string(), "how are you".to_string()];

        let tok = store.load_or_build(&texts, 100).unwrap();
        assert!(store.exists());
        assert_eq!(tok.type_name(), "WordLevelTokenizer");
        assert_eq!(tok.vocab_size(), 6 + 5);

        assert_eq!(tok.token_to_id("[PAD]"), Some(0));
        assert_eq!(tok.token_to_id("[speaker2]"), Some(5));
        assert_eq!(tok.pad_token_id(), Some(0));

        let tokens = tok.tokenize("Hello there").unwrap();
        assert_eq!(tokens, vec!["hello", "there"]);
        let ids = tok.convert_tokens_to_ids(&tokens).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|&id| id >= 6));

        // Second call loads the saved file instead of rebuilding
        let again = store.load_or_build(&[], 100).unwrap();
        assert_eq!(again.encode("hello there").unwrap(), ids);
    }

    #[test]
    fn test_unknown_word_maps_to_unk() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let tok = store.load_or_build(&["known".to_string()], 100).unwrap();

        let ids = tok.convert_tokens_to_ids(&["mystery".to_string()]).unwrap();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_vocab_size_caps_words() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let texts = vec!["a a a b b c".to_string()];
        let tok = store.load_or_build(&texts, 8).unwrap();

        // Six markers plus the two most frequent words
        assert_eq!(tok.vocab_size(), 8);
        assert!(tok.token_to_id("a").is_some());
        assert!(tok.token_to_id("c").is_none());
    }
}
