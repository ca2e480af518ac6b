// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Produces the tokenized corpus, from cache when possible.
//
//   dataset_cache + "_" + tokenizer type name exists?
//       yes → read it, no preview
//       no  → resolve dataset_path (URL or file)
//             parse JSON   { split: [ [utterance, ...], ... ] }
//             keep the first 5 dialogues per split as a preview
//             tokenize every utterance, keeping the nesting
//             write the cache
//
// Nothing here is retried or recovered: a bad file, a bad
// download or a tokenizer failure ends the run.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::domain::dialogue::{DialogueTree, RawDataset, RawPreview, TokenizedDataset};
use crate::domain::traits::{DialogueTokenizer, ResourceResolver};
use crate::infra::dataset_cache::DatasetCache;

/// Location used when no dataset path is configured. There is no
/// public default corpus, so an empty path is rejected.
pub const DEFAULT_DATASET_URL: &str = "";

/// Dialogues per split kept in the raw preview.
pub const PREVIEW_DIALOGUES: usize = 5;

/// Output of `get_data`.
#[derive(Debug)]
pub struct LoadedData {
    pub dataset: TokenizedDataset,
    /// Only present when the corpus was tokenized in this run.
    pub samples: Option<RawPreview>,
}

/// Load the tokenized corpus from cache, or fetch and tokenize it.
pub fn get_data(
    tokenizer:     &dyn DialogueTokenizer,
    resolver:      &dyn ResourceResolver,
    dataset_path:  &str,
    dataset_cache: &str,
) -> Result<LoadedData> {
    let dataset_path = if dataset_path.is_empty() { DEFAULT_DATASET_URL } else { dataset_path };
    let cache = DatasetCache::new(dataset_cache, tokenizer.type_name());

    if cache.exists() {
        tracing::info!("Load tokenized dataset from cache at {}", cache.path().display());
        let dataset = cache.load()?;
        return Ok(LoadedData { dataset, samples: None });
    }

    anyhow::ensure!(
        !dataset_path.is_empty(),
        "No dataset path configured and no cache at '{}'",
        cache.path().display()
    );

    tracing::info!("Download dataset from {}", dataset_path);
    let local = resolver.resolve(dataset_path)?;
    let raw = read_raw_dataset(&local)?;
    let samples = preview(&raw);

    tracing::info!("Tokenize and encode the dataset");
    let dataset = tokenize_dataset(tokenizer, &raw)?;
    cache.save(&dataset)?;

    Ok(LoadedData { dataset, samples: Some(samples) })
}

/// Read a raw corpus file. The top level must be a JSON object.
pub fn read_raw_dataset(path: &Path) -> Result<RawDataset> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("'{}' is not valid JSON", path.display()))?;

    anyhow::ensure!(
        value.is_object(),
        "'{}' must hold a JSON object mapping split names to dialogues",
        path.display()
    );
    raw_from_json(&value, "")
}

/// Convert parsed JSON into a raw tree. Strings become leaves,
/// arrays lists, objects maps; anything else is rejected with the
/// JSON pointer of the offending value.
pub fn raw_from_json(value: &Value, pointer: &str) -> Result<RawDataset> {
    Ok(match value {
        Value::String(s) => DialogueTree::Leaf(s.clone()),
        Value::Array(items) => DialogueTree::List(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| raw_from_json(v, &format!("{pointer}/{i}")))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Object(entries) => {
            let mut map = BTreeMap::new();
            for (key, v) in entries {
                map.insert(key.clone(), raw_from_json(v, &format!("{pointer}/{key}"))?);
            }
            DialogueTree::Map(map)
        }
        other => anyhow::bail!(
            "Expected text at '{}', found {}",
            if pointer.is_empty() { "/" } else { pointer },
            other
        ),
    })
}

/// Tokenize every utterance; lists and maps keep their shape.
pub fn tokenize_dataset(
    tokenizer: &dyn DialogueTokenizer,
    raw:       &RawDataset,
) -> Result<TokenizedDataset> {
    raw.try_map_leaves(&mut |text: &String| {
        tokenizer
            .encode(text)
            .with_context(|| format!("Cannot tokenize {text:?}"))
    })
}

/// First few dialogues of every split.
pub fn preview(raw: &RawDataset) -> RawPreview {
    let mut out = BTreeMap::new();
    if let Some(splits) = raw.as_map() {
        for (name, split) in splits {
            if let Some(dialogues) = split.as_list() {
                let head = dialogues.iter().take(PREVIEW_DIALOGUES).cloned().collect();
                out.insert(name.clone(), head);
            }
        }
    }
    out
}

/// Every utterance string in the corpus, for building a vocabulary.
pub fn collect_texts(raw: &RawDataset) -> Vec<String> {
    let mut texts = Vec::with_capacity(raw.leaf_count());
    raw.for_each_leaf(&mut |s: &String| texts.push(s.clone()));
    texts
}

/// Read a single split file: a JSON array of dialogues, each an
/// array of utterance strings.
pub fn read_dialogue_file(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    let dialogues: Vec<Vec<String>> = serde_json::from_str(&text)
        .with_context(|| format!(
            "'{}' must be a JSON array of dialogues (arrays of strings)",
            path.display()
        ))?;
    tracing::debug!("Read {} dialogues from '{}'", dialogues.len(), path.display());
    Ok(dialogues)
}
