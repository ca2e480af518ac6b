// ============================================================
// Layer 2 — Data Pipeline Configuration
// ============================================================
// Every knob of a data preparation run in one serde struct.
// The CLI converts its flags into this; `--config file.json`
// reads it straight from disk instead.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::instances::InstanceOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Raw corpus location, URL or local path
    pub data_path:        String,
    /// Base path of the tokenized cache; the tokenizer kind is appended
    pub dataset_cache:    String,
    /// Per-split raw files for the streaming loaders
    pub train_path:       String,
    pub valid_path:       String,
    /// Directory holding tokenizer.json
    pub tokenizer_dir:    String,
    /// Vocabulary size when the tokenizer has to be built
    pub vocab_size:       usize,
    /// Where downloaded corpora are kept
    pub download_dir:     String,
    /// Turns of context kept per side of the conversation
    pub max_history:      usize,
    pub train_batch_size: usize,
    pub valid_batch_size: usize,
    pub num_workers:      usize,
    pub distributed:      bool,
    pub world_size:       usize,
    pub rank:             usize,
    pub seed:             u64,
    /// cpu, wgpu or cuda
    pub device:           String,
    pub with_eos:         bool,
    pub lm_labels:        bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_path:        "data/corpus.json".to_string(),
            dataset_cache:    "dataset_cache".to_string(),
            train_path:       "data/train.json".to_string(),
            valid_path:       "data/valid.json".to_string(),
            tokenizer_dir:    "tokenizer".to_string(),
            vocab_size:       13088,
            download_dir:     "data/downloads".to_string(),
            max_history:      15,
            train_batch_size: 8,
            valid_batch_size: 8,
            num_workers:      1,
            distributed:      false,
            world_size:       1,
            rank:             0,
            seed:             42,
            device:           "cpu".to_string(),
            with_eos:         true,
            lm_labels:        true,
        }
    }
}

impl DataConfig {
    pub fn instance_options(&self) -> InstanceOptions {
        InstanceOptions { with_eos: self.with_eos, lm_labels: self.lm_labels }
    }

    /// Batches are built directly on the accelerator for CUDA runs.
    pub fn pin_memory(&self) -> bool {
        self.device == "cuda"
    }

    /// Reject settings that would only fail later, deep in a run.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_history >= 1, "max_history must be at least 1");
        anyhow::ensure!(self.train_batch_size >= 1, "train_batch_size must be at least 1");
        anyhow::ensure!(self.valid_batch_size >= 1, "valid_batch_size must be at least 1");
        if self.distributed {
            anyhow::ensure!(self.world_size >= 1, "world_size must be at least 1");
            anyhow::ensure!(
                self.rank < self.world_size,
                "rank {} is outside a world of {} processes",
                self.rank,
                self.world_size
            );
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved data config to '{}'", path.display());
        Ok(())
    }
}
