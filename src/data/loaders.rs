// ============================================================
// Layer 4 — Train / Validation Loaders
// ============================================================
// Wires the pipeline into Burn DataLoaders:
//
//   build_dataloaders                 get_dist_loaders
//   ─────────────────                 ────────────────
//   get_data (cache or fetch)         read train/valid files
//   data_process → instances          tokenize dialogues
//   InstanceDataset                   DialogueFileDataset (lazy)
//           │                                  │
//           └────────── DataLoaderBuilder ─────┘
//                       + DialogueBatcher
//                       + DistributedSampler when distributed
//
// Shuffle policy: the train loader shuffles unless distributed,
// where the sampler owns the ordering instead. Validation never
// shuffles in the loader.

use std::sync::Arc;

use anyhow::{Context, Result};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};

use crate::application::config::DataConfig;
use crate::data::{
    batcher::{DialogueBatch, DialogueBatcher},
    dataset::{DialogueFileDataset, InstanceDataset},
    instances::{data_process, resolve_special_tokens},
    loader::{get_data, read_dialogue_file},
    sampler::DistributedSampler,
};
use crate::domain::instance::Instance;
use crate::domain::traits::{DialogueTokenizer, ResourceResolver};

pub type BatchLoader<B> = Arc<dyn DataLoader<B, DialogueBatch<B>>>;

/// Loaders for both splits plus the samplers driving them, so the
/// training loop can call `set_epoch` between epochs.
pub struct DialogueLoaders<B: Backend> {
    pub train:         BatchLoader<B>,
    pub valid:         BatchLoader<B>,
    pub train_sampler: Option<DistributedSampler>,
    pub valid_sampler: Option<DistributedSampler>,
}

impl<B: Backend> DialogueLoaders<B> {
    /// Point both samplers at a new epoch.
    pub fn set_epoch(&self, epoch: u64) {
        for sampler in [&self.train_sampler, &self.valid_sampler].into_iter().flatten() {
            sampler.set_epoch(epoch);
        }
    }
}

/// Per-loader settings derived from the config.
struct LoaderSpec<'a, B: Backend> {
    batch_size: usize,
    shuffle:    bool,
    sampler:    Option<&'a DistributedSampler>,
    pad_id:     u32,
    device:     &'a B::Device,
}

fn make_loader<B, D>(cfg: &DataConfig, spec: LoaderSpec<'_, B>, dataset: D) -> BatchLoader<B>
where
    B: Backend,
    D: Dataset<Instance> + 'static,
{
    let mut builder: DataLoaderBuilder<B, Instance, DialogueBatch<B>> =
        DataLoaderBuilder::new(DialogueBatcher::new(spec.pad_id))
            .batch_size(spec.batch_size)
            .set_device(spec.device.clone());

    if cfg.num_workers > 0 {
        builder = builder.num_workers(cfg.num_workers);
    }
    if spec.shuffle {
        builder = builder.shuffle(cfg.seed);
    }

    match spec.sampler {
        Some(sampler) => builder.build(sampler.shard(dataset)),
        None => builder.build(dataset),
    }
}

fn samplers(cfg: &DataConfig) -> Result<(Option<DistributedSampler>, Option<DistributedSampler>)> {
    if !cfg.distributed {
        return Ok((None, None));
    }
    let train = DistributedSampler::new(cfg.world_size, cfg.rank, true, cfg.seed)?;
    let valid = DistributedSampler::new(cfg.world_size, cfg.rank, true, cfg.seed)?;
    tracing::info!("Distributed sampling: rank {} of {}", train.rank(), train.num_replicas());
    Ok((Some(train), Some(valid)))
}

fn wire<B, D>(
    cfg:       &DataConfig,
    tokenizer: &dyn DialogueTokenizer,
    train:     D,
    valid:     D,
    device:    &B::Device,
) -> Result<DialogueLoaders<B>>
where
    B: Backend,
    D: Dataset<Instance> + 'static,
{
    let pad_id = resolve_special_tokens(tokenizer)?.pad;
    let (train_sampler, valid_sampler) = samplers(cfg)?;

    if cfg.pin_memory() {
        tracing::info!("Batches are built directly on {:?}", device);
    }

    let train_loader = make_loader(cfg, LoaderSpec {
        batch_size: cfg.train_batch_size,
        shuffle:    !cfg.distributed,
        sampler:    train_sampler.as_ref(),
        pad_id,
        device,
    }, train);

    let valid_loader = make_loader(cfg, LoaderSpec {
        batch_size: cfg.valid_batch_size,
        shuffle:    false,
        sampler:    valid_sampler.as_ref(),
        pad_id,
        device,
    }, valid);

    Ok(DialogueLoaders {
        train: train_loader,
        valid: valid_loader,
        train_sampler,
        valid_sampler,
    })
}

/// Cached corpus → instances → loaders.
pub fn build_dataloaders<B: Backend>(
    cfg:       &DataConfig,
    tokenizer: &dyn DialogueTokenizer,
    resolver:  &dyn ResourceResolver,
    device:    &B::Device,
) -> Result<DialogueLoaders<B>> {
    cfg.validate()?;
    let loaded = get_data(tokenizer, resolver, &cfg.data_path, &cfg.dataset_cache)?;

    tracing::info!("Build inputs and labels");
    let mut datasets = data_process(cfg.max_history, &loaded.dataset, tokenizer, cfg.instance_options())?;
    let train = datasets.remove("train").context("Dataset has no 'train' split")?;
    let valid = datasets.remove("valid").context("Dataset has no 'valid' split")?;

    tracing::info!(
        "Build train and validation dataloaders ({} / {} instances)",
        train.len(),
        valid.len()
    );
    wire(cfg, tokenizer, InstanceDataset::new(train), InstanceDataset::new(valid), device)
}

/// Per-split raw files → lazily built instances → loaders.
pub fn get_dist_loaders<B: Backend>(
    cfg:       &DataConfig,
    tokenizer: &dyn DialogueTokenizer,
    device:    &B::Device,
) -> Result<DialogueLoaders<B>> {
    cfg.validate()?;
    tracing::info!("Build train and validation dataloaders");

    let special = resolve_special_tokens(tokenizer)?;
    let opts = cfg.instance_options();

    let open = |path: &str| -> Result<DialogueFileDataset> {
        let raw = read_dialogue_file(path.as_ref())?;
        DialogueFileDataset::new(&raw, tokenizer, cfg.max_history, special, opts)
            .with_context(|| format!("Cannot prepare '{path}'"))
    };
    let train = open(&cfg.train_path)?;
    let valid = open(&cfg.valid_path)?;

    wire(cfg, tokenizer, train, valid, device)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::data::vocab_tokenizer::VocabTokenizer;
    use crate::infra::resource::CachedPathResolver;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    type TestBackend = NdArray;

    const CORPUS: &str = r#"{
        "train": [["hi", "hello"], ["hello", "hi", "hello there"], ["hi"]],
        "valid": [["hello", "hi"]]
    }"#;

    fn tokenizer() -> VocabTokenizer {
        VocabTokenizer::new()
            .with_word("hi", 10)
            .with_word("hello", 11)
            .with_word("there", 12)
    }

    fn config(dir: &Path) -> DataConfig {
        DataConfig {
            data_path:        dir.join("corpus.json").to_str().unwrap().to_string(),
            dataset_cache:    dir.join("cache").to_str().unwrap().to_string(),
            train_path:       dir.join("train.json").to_str().unwrap().to_string(),
            valid_path:       dir.join("valid.json").to_str().unwrap().to_string(),
            train_batch_size: 2,
            valid_batch_size: 2,
            num_workers:      0,
            max_history:      2,
            ..DataConfig::default()
        }
    }

    fn batch_shapes(loader: &BatchLoader<TestBackend>) -> Vec<[usize; 2]> {
        loader.iter().map(|b| b.input_ids.dims()).collect()
    }

    #[test]
    fn test_build_dataloaders_batches_every_instance() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("corpus.json"), CORPUS).unwrap();
        let cfg = config(dir.path());
        let resolver = CachedPathResolver::new(dir.path());

        let loaders: DialogueLoaders<TestBackend> =
            build_dataloaders(&cfg, &tokenizer(), &resolver, &NdArrayDevice::default()).unwrap();

        assert_eq!(loaders.train.num_items(), 3);
        assert_eq!(loaders.valid.num_items(), 1);
        assert!(loaders.train_sampler.is_none());

        let train_rows: usize = batch_shapes(&loaders.train).iter().map(|s| s[0]).sum();
        assert_eq!(train_rows, 3);

        // Single validation dialogue: [CLS] [s1] hello [s2] hi [SEP]
        assert_eq!(batch_shapes(&loaders.valid), vec![[1, 6]]);
    }

    #[test]
    fn test_missing_valid_split_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("corpus.json"), r#"{"train": [["hi"]]}"#).unwrap();
        let cfg = config(dir.path());
        let resolver = CachedPathResolver::new(dir.path());

        let result: Result<DialogueLoaders<TestBackend>> =
            build_dataloaders(&cfg, &tokenizer(), &resolver, &NdArrayDevice::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_distributed_loaders_split_work() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("corpus.json"), CORPUS).unwrap();
        let resolver = CachedPathResolver::new(dir.path());

        let mut rows = 0;
        for rank in 0..2 {
            let cfg = DataConfig {
                distributed: true,
                world_size:  2,
                rank,
                ..config(dir.path())
            };
            let loaders: DialogueLoaders<TestBackend> =
                build_dataloaders(&cfg, &tokenizer(), &resolver, &NdArrayDevice::default())
                    .unwrap();

            assert!(loaders.train_sampler.is_some());
            assert_eq!(loaders.train.num_items(), 2);
            loaders.set_epoch(1);
            rows += batch_shapes(&loaders.train).iter().map(|s| s[0]).sum::<usize>();
        }
        // Three instances padded to four across two ranks
        assert_eq!(rows, 4);
    }

    #[test]
    fn test_dist_loaders_read_split_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.json"), r#"[["hi", "hello"], ["hello"]]"#).unwrap();
        fs::write(dir.path().join("valid.json"), r#"[["hi", "hello there"]]"#).unwrap();
        let cfg = config(dir.path());

        let loaders: DialogueLoaders<TestBackend> =
            get_dist_loaders(&cfg, &tokenizer(), &NdArrayDevice::default()).unwrap();

        assert_eq!(loaders.train.num_items(), 2);
        let valid: Vec<_> = loaders.valid.iter().collect();
        assert_eq!(valid.len(), 1);

        let ids: Vec<i64> = valid[0].input_ids.clone().into_data().iter::<i64>().collect();
        assert_eq!(ids, vec![1, 5, 10, 6, 11, 12, 2]);
    }

    #[test]
    fn test_dist_loaders_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let result: Result<DialogueLoaders<TestBackend>> =
            get_dist_loaders(&cfg, &tokenizer(), &NdArrayDevice::default());
        assert!(result.is_err());
    }
}
