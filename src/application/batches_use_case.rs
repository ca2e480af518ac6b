// ============================================================
// Layer 2 — BatchesUseCase
// ============================================================
// Builds the train/valid loaders and walks one epoch of each,
// which is exactly what a training loop would see:
//
//   Step 1: Pick the Burn backend from `device`
//   Step 2: Load or build the tokenizer         (Layer 6 - infra)
//   Step 3: Build the loaders                   (Layer 4 - data)
//           cached corpus, or per-split files with --stream
//   Step 4: Iterate both loaders, record shapes
//
// Backends:
//   cpu        → NdArray
//   wgpu, cuda → Wgpu (batches land on the GPU directly)

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};

use crate::application::{config::DataConfig, prepare_use_case::open_tokenizer};
use crate::data::{
    loader::{collect_texts, read_dialogue_file, read_raw_dataset},
    loaders::{build_dataloaders, get_dist_loaders, BatchLoader, DialogueLoaders},
};
use crate::domain::traits::ResourceResolver;
use crate::infra::resource::CachedPathResolver;

// ─── Report ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub batches:   usize,
    pub rows:      usize,
    /// Longest padded sequence seen in any batch
    pub max_width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchesReport {
    pub backend: &'static str,
    pub train:   LoaderStats,
    pub valid:   LoaderStats,
}

fn walk<B: Backend>(loader: &BatchLoader<B>) -> Result<LoaderStats> {
    let mut stats = LoaderStats::default();
    for batch in loader.iter() {
        let [rows, width] = batch.input_ids.dims();
        anyhow::ensure!(
            batch.token_type_ids.dims() == [rows, width] && batch.lm_labels.dims() == [rows, width],
            "Batch {} tensors disagree on shape",
            stats.batches
        );
        stats.batches  += 1;
        stats.rows     += rows;
        stats.max_width = stats.max_width.max(width);
    }
    Ok(stats)
}

// ─── BatchesUseCase ───────────────────────────────────────────────────────────
pub struct BatchesUseCase {
    config: DataConfig,
    stream: bool,
}

impl BatchesUseCase {
    pub fn new(config: DataConfig, stream: bool) -> Self {
        Self { config, stream }
    }

    pub fn execute(&self) -> Result<BatchesReport> {
        self.config.validate()?;
        match self.config.device.as_str() {
            "cpu" => {
                let device = NdArrayDevice::default();
                tracing::info!("Using NdArray device: {:?}", device);
                self.run::<NdArray>("ndarray", &device)
            }
            "wgpu" | "cuda" => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                self.run::<Wgpu>("wgpu", &device)
            }
            other => anyhow::bail!("Unknown device '{other}', expected cpu, wgpu or cuda"),
        }
    }

    fn run<B: Backend>(&self, backend: &'static str, device: &B::Device) -> Result<BatchesReport> {
        let cfg = &self.config;
        let resolver = CachedPathResolver::new(&cfg.download_dir);

        let loaders: DialogueLoaders<B> = if self.stream {
            let tokenizer = open_tokenizer(cfg, || {
                let mut texts = Vec::new();
                for path in [&cfg.train_path, &cfg.valid_path] {
                    texts.extend(read_dialogue_file(path.as_ref())?.into_iter().flatten());
                }
                Ok(texts)
            })?;
            get_dist_loaders(cfg, &tokenizer, device)?
        } else {
            let tokenizer = open_tokenizer(cfg, || {
                let local = resolver.resolve(&cfg.data_path)?;
                Ok(collect_texts(&read_raw_dataset(&local)?))
            })?;
            build_dataloaders(cfg, &tokenizer, &resolver, device)?
        };

        loaders.set_epoch(0);
        let train = walk(&loaders.train)?;
        let valid = walk(&loaders.valid)?;
        tracing::info!(
            "Epoch walked: {} train batches, {} valid batches",
            train.batches,
            valid.batches
        );

        Ok(BatchesReport { backend, train, valid })
    }
}
