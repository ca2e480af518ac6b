// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `prepare` and `batches`, and
// all their configurable flags. Both share DataArgs, which
// converts into the application-layer DataConfig.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::config::DataConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tokenize and cache the corpus, then build training instances
    Prepare(PrepareArgs),

    /// Build the train/validation loaders and walk one epoch
    Batches(BatchesArgs),
}

/// Flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Read every setting below from a JSON file instead
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Raw corpus: URL or local path to a JSON object of splits
    #[arg(long, default_value = "data/corpus.json")]
    pub data_path: String,

    /// Base path of the tokenized cache; the tokenizer kind is appended
    #[arg(long, default_value = "dataset_cache")]
    pub dataset_cache: String,

    /// Directory holding tokenizer.json
    #[arg(long, default_value = "tokenizer")]
    pub tokenizer_dir: String,

    /// Vocabulary size when a tokenizer has to be built
    #[arg(long, default_value_t = 13088)]
    pub vocab_size: usize,

    /// Where downloaded corpora are kept
    #[arg(long, default_value = "data/downloads")]
    pub download_dir: String,

    /// Turns of context kept per side of the conversation
    #[arg(long, default_value_t = 15)]
    pub max_history: usize,

    /// Leave the end-of-sequence token off every instance
    #[arg(long)]
    pub no_eos: bool,

    /// Mask every label, for inference-style prompts
    #[arg(long)]
    pub no_lm_labels: bool,
}

/// All arguments for the `prepare` command
#[derive(Args, Debug)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Write the built instances here as JSON
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// All arguments for the `batches` command
#[derive(Args, Debug)]
pub struct BatchesArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Read per-split files and build instances lazily
    #[arg(long)]
    pub stream: bool,

    /// Training dialogues for --stream
    #[arg(long, default_value = "data/train.json")]
    pub train_path: String,

    /// Validation dialogues for --stream
    #[arg(long, default_value = "data/valid.json")]
    pub valid_path: String,

    #[arg(long, default_value_t = 8)]
    pub train_batch_size: usize,

    #[arg(long, default_value_t = 8)]
    pub valid_batch_size: usize,

    /// Loader worker threads, 0 loads on the calling thread
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Shard both splits across `world_size` processes
    #[arg(long)]
    pub distributed: bool,

    #[arg(long, default_value_t = 1)]
    pub world_size: usize,

    /// This process's index within the world
    #[arg(long, default_value_t = 0)]
    pub rank: usize,

    /// Seed for loader shuffling and sampler ordering
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// cpu, wgpu or cuda
    #[arg(long, default_value = "cpu")]
    pub device: String,
}

/// Convert the shared flags into a DataConfig.
/// The application layer never sees clap types.
impl From<DataArgs> for DataConfig {
    fn from(a: DataArgs) -> Self {
        DataConfig {
            data_path:     a.data_path,
            dataset_cache: a.dataset_cache,
            tokenizer_dir: a.tokenizer_dir,
            vocab_size:    a.vocab_size,
            download_dir:  a.download_dir,
            max_history:   a.max_history,
            with_eos:      !a.no_eos,
            lm_labels:     !a.no_lm_labels,
            ..DataConfig::default()
        }
    }
}

impl From<BatchesArgs> for DataConfig {
    fn from(a: BatchesArgs) -> Self {
        DataConfig {
            train_path:       a.train_path,
            valid_path:       a.valid_path,
            train_batch_size: a.train_batch_size,
            valid_batch_size: a.valid_batch_size,
            num_workers:      a.num_workers,
            distributed:      a.distributed,
            world_size:       a.world_size,
            rank:             a.rank,
            seed:             a.seed,
            device:           a.device,
            ..DataConfig::from(a.data)
        }
    }
}
