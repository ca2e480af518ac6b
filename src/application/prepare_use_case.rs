// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Runs the preparation half of the pipeline once, end to end:
//
//   Step 1: Load or build the tokenizer      (Layer 6 - infra)
//   Step 2: Load the tokenized corpus        (Layer 4 - data)
//           from cache, or fetch + tokenize + cache it
//   Step 3: Build instances per split        (Layer 4 - data)
//   Step 4: Summarise, optionally dump JSON  (Layer 6 - infra)
//
// The resolved config is saved next to tokenizer.json so a later
// `--config` run can reproduce the same preparation.
//
// The CLI prints the returned report; nothing is printed here.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::config::DataConfig;
use crate::data::{
    instances::data_process,
    loader::{collect_texts, get_data, read_raw_dataset},
};
use crate::domain::{
    dialogue::RawPreview,
    instance::Instance,
    traits::{DialogueTokenizer, ResourceResolver},
};
use crate::infra::{
    resource::CachedPathResolver,
    tokenizer_store::{HfTokenizer, TokenizerStore},
};

/// File name of the saved run config inside `tokenizer_dir`.
pub const CONFIG_FILE: &str = "data_config.json";

/// Load the saved tokenizer, or build one from the texts `corpus`
/// yields. `corpus` is only called when no tokenizer exists yet.
pub fn open_tokenizer<F>(cfg: &DataConfig, corpus: F) -> Result<HfTokenizer>
where
    F: FnOnce() -> Result<Vec<String>>,
{
    let store = TokenizerStore::new(&cfg.tokenizer_dir);
    if store.exists() {
        return store.load();
    }
    let texts = corpus()?;
    tracing::info!("Collected {} utterances for the vocabulary", texts.len());
    store.load_or_build(&texts, cfg.vocab_size)
}

// ─── Report ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitStats {
    pub instances: usize,
    pub tokens:    usize,
    /// Positions with a real label
    pub targets:   usize,
    pub max_len:   usize,
}

impl SplitStats {
    fn of(instances: &[Instance]) -> Self {
        Self {
            instances: instances.len(),
            tokens:    instances.iter().map(Instance::len).sum(),
            targets:   instances.iter().map(Instance::target_count).sum(),
            max_len:   instances.iter().map(Instance::len).max().unwrap_or(0),
        }
    }
}

#[derive(Debug)]
pub struct PrepareReport {
    pub tokenizer_type: String,
    pub vocab_size:     usize,
    pub splits:         BTreeMap<String, SplitStats>,
    /// Present only when the corpus was tokenized in this run
    pub samples:        Option<RawPreview>,
    pub written_to:     Option<PathBuf>,
}

// ─── PrepareUseCase ───────────────────────────────────────────────────────────
pub struct PrepareUseCase {
    config: DataConfig,
    output: Option<PathBuf>,
}

impl PrepareUseCase {
    pub fn new(config: DataConfig, output: Option<PathBuf>) -> Self {
        Self { config, output }
    }

    pub fn execute(&self) -> Result<PrepareReport> {
        let cfg = &self.config;
        cfg.validate()?;
        let resolver = CachedPathResolver::new(&cfg.download_dir);

        // ── Step 1: Tokenizer ─────────────────────────────────────────────────
        let tokenizer = open_tokenizer(cfg, || {
            let local = resolver.resolve(&cfg.data_path)?;
            Ok(collect_texts(&read_raw_dataset(&local)?))
        })?;

        cfg.save(&Path::new(&cfg.tokenizer_dir).join(CONFIG_FILE))?;

        // ── Step 2: Tokenized corpus ──────────────────────────────────────────
        let loaded = get_data(&tokenizer, &resolver, &cfg.data_path, &cfg.dataset_cache)?;

        // ── Step 3: Instances ─────────────────────────────────────────────────
        tracing::info!("Build inputs and labels");
        let datasets = data_process(cfg.max_history, &loaded.dataset, &tokenizer, cfg.instance_options())?;

        let splits: BTreeMap<String, SplitStats> = datasets
            .iter()
            .map(|(name, instances)| (name.clone(), SplitStats::of(instances)))
            .collect();
        for (name, stats) in &splits {
            tracing::info!("Split '{}': {} instances, {} tokens", name, stats.instances, stats.tokens);
        }

        // ── Step 4: Optional dump ─────────────────────────────────────────────
        if let Some(path) = &self.output {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create '{}'", parent.display()))?;
            }
            let json = serde_json::to_string(&datasets)?;
            fs::write(path, json)
                .with_context(|| format!("Cannot write instances to '{}'", path.display()))?;
            tracing::info!("Wrote instances to '{}'", path.display());
        }

        Ok(PrepareReport {
            tokenizer_type: tokenizer.type_name().to_string(),
            vocab_size:     tokenizer.vocab_size(),
            splits,
            samples:        loaded.samples,
            written_to:     self.output.clone(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = r#"{
        "train": [["hi there", "hello"], ["hello", "hi", "hi there"]],
        "valid": [["hello there"]]
    }"#;

    fn config(dir: &std::path::Path) -> DataConfig {
        let p = |name: &str| dir.join(name).to_str().unwrap().to_string();
        DataConfig {
            data_path:     p("corpus.json"),
            dataset_cache: p("cache"),
            tokenizer_dir: p("tokenizer"),
            download_dir:  p("downloads"),
            vocab_size:    100,
            max_history:   2,
            ..DataConfig::default()
        }
    }

    #[test]
    fn test_prepare_builds_tokenizer_cache_and_instances() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("corpus.json"), CORPUS).unwrap();
        let out = dir.path().join("out").join("instances.json");

        let report = PrepareUseCase::new(config(dir.path()), Some(out.clone()))
            .execute()
            .unwrap();

        assert_eq!(report.tokenizer_type, "WordLevelTokenizer");
        assert_eq!(report.splits["train"].instances, 2);
        assert_eq!(report.splits["valid"].instances, 1);
        assert!(report.samples.is_some());
        assert!(dir.path().join("tokenizer").join("tokenizer.json").exists());
        assert!(dir.path().join("cache_WordLevelTokenizer").exists());

        let saved = DataConfig::load(&dir.path().join("tokenizer").join(CONFIG_FILE)).unwrap();
        assert_eq!(saved, config(dir.path()));

        let written: BTreeMap<String, Vec<Instance>> =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["train"].len(), 2);
        assert!(written.values().flatten().all(Instance::is_aligned));
    }

    #[test]
    fn test_second_run_reads_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("corpus.json"), CORPUS).unwrap();

        let first = PrepareUseCase::new(config(dir.path()), None).execute().unwrap();
        // The corpus is no longer needed once both caches exist
        fs::remove_file(dir.path().join("corpus.json")).unwrap();
        let second = PrepareUseCase::new(config(dir.path()), None).execute().unwrap();

        assert!(second.samples.is_none());
        assert_eq!(first.splits, second.splits);
    }

    #[test]
    fn test_missing_corpus_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PrepareUseCase::new(config(dir.path()), None).execute().is_err());
    }
}
