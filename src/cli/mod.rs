// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `prepare`: tokenize/cache the corpus, build instances
//   2. `batches`: build the loaders and walk one epoch
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use commands::{BatchesArgs, Commands, PrepareArgs};

use crate::application::config::DataConfig;

/// clap reads the fields and generates the argument parser
/// through the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "dialogue-inputs",
    version = "0.1.0",
    about = "Tokenize a dialogue corpus and build language-model training batches."
)]
pub struct Cli {
    /// The subcommand to run (prepare or batches)
    #[command(subcommand)]
    pub command: Commands,
}

/// `--config` wins over every other flag when given.
fn config_or(path: Option<PathBuf>, from_flags: impl FnOnce() -> DataConfig) -> Result<DataConfig> {
    match path {
        Some(path) => {
            tracing::info!("Reading data config from '{}'", path.display());
            DataConfig::load(&path)
        }
        None => Ok(from_flags()),
    }
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args) => run_prepare(args),
            Commands::Batches(args) => run_batches(args),
        }
    }
}

/// Handles the `prepare` subcommand and prints its report.
fn run_prepare(mut args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let output = args.output.take();
    let config = config_or(args.data.config.take(), || args.data.into())?;
    let report = PrepareUseCase::new(config, output).execute()?;

    println!("Tokenizer: {} ({} tokens)", report.tokenizer_type, report.vocab_size);
    for (split, stats) in &report.splits {
        println!(
            "  {:<8} {:>7} instances  {:>9} tokens  {:>8} targets  longest {}",
            split, stats.instances, stats.tokens, stats.targets, stats.max_len
        );
    }

    if let Some(samples) = &report.samples {
        for (split, dialogues) in samples {
            println!("\n[{split}] first {} dialogues:", dialogues.len());
            for (i, dialogue) in dialogues.iter().enumerate() {
                println!("  #{i}");
                dialogue.for_each_leaf(&mut |utterance: &String| println!("    {utterance}"));
            }
        }
    }

    if let Some(path) = &report.written_to {
        println!("\nInstances written to {}", path.display());
    }
    Ok(())
}

/// Handles the `batches` subcommand and prints per-loader totals.
fn run_batches(mut args: BatchesArgs) -> Result<()> {
    use crate::application::batches_use_case::BatchesUseCase;

    let stream = args.stream;
    let config = config_or(args.data.config.take(), || args.into())?;
    let report = BatchesUseCase::new(config, stream).execute()?;

    println!("Backend: {}", report.backend);
    for (name, stats) in [("train", &report.train), ("valid", &report.valid)] {
        println!(
            "  {:<6} {:>6} batches  {:>7} rows  widest {}",
            name, stats.batches, stats.rows, stats.max_width
        );
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("dialogue-inputs").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_prepare_flags_become_config() {
        let Commands::Prepare(args) = parse(&["prepare", "--max-history", "3", "--no-eos"]) else {
            panic!("expected prepare");
        };
        let cfg: DataConfig = args.data.into();
        assert_eq!(cfg.max_history, 3);
        assert!(!cfg.with_eos);
        assert!(cfg.lm_labels);
    }

    #[test]
    fn test_batches_flags_become_config() {
        let Commands::Batches(args) = parse(&[
            "batches", "--distributed", "--world-size", "4", "--rank", "2",
            "--device", "wgpu", "--data-path", "corpus.json", "--stream",
        ]) else {
            panic!("expected batches");
        };
        assert!(args.stream);
        let cfg: DataConfig = args.into();
        assert!(cfg.distributed);
        assert_eq!((cfg.world_size, cfg.rank), (4, 2));
        assert_eq!(cfg.device, "wgpu");
        assert_eq!(cfg.data_path, "corpus.json");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_config_file_overrides_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_history": 4}"#).unwrap();

        let cfg = config_or(Some(path), DataConfig::default).unwrap();
        assert_eq!(cfg.max_history, 4);
        assert_eq!(config_or(None, DataConfig::default).unwrap(), DataConfig::default());
    }
}
