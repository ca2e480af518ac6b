// ============================================================
// Layer 6 — Tokenized Dataset Cache
// ============================================================
// Tokenizing a whole corpus is slow, so the tokenized tree is
// written to disk once and read back on later runs.
//
// Cache file:  {dataset_cache}_{tokenizer_type_name}
//
// The file is trusted as-is. A cache built from a different
// corpus, or by a differently configured tokenizer of the same
// kind, is loaded without complaint; delete the file to rebuild.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::domain::dialogue::TokenizedDataset;

pub struct DatasetCache {
    path: PathBuf,
}

impl DatasetCache {
    /// Build the cache location from the configured base path and
    /// the tokenizer kind.
    pub fn new(base: &str, tokenizer_type_name: &str) -> Self {
        Self { path: PathBuf::from(format!("{base}_{tokenizer_type_name}")) }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<TokenizedDataset> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read dataset cache '{}'", self.path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed dataset cache '{}'", self.path.display()))
    }

    pub fn save(&self, dataset: &TokenizedDataset) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        let json = serde_json::to_string(dataset)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Cannot write dataset cache '{}'", self.path.display()))?;

        tracing::debug!("Saved tokenized dataset to '{}'", self.path.display());
        Ok(())
    }
}
