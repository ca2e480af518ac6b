use anyhow::{Context, Result};
use burn::data::dataset::Dataset;

use crate::data::instances::{build_instance, window, InstanceOptions};
use crate::domain::instance::{Instance, SpecialTokens};
use crate::domain::traits::DialogueTokenizer;

/// Instances built up front by `data_process`.
pub struct InstanceDataset {
    instances: Vec<Instance>,
}

impl InstanceDataset {
    pub fn new(instances: Vec<Instance>) -> Self { Self { instances } }
}

impl Dataset<Instance> for InstanceDataset {
    fn get(&self, index: usize) -> Option<Instance> {
        self.instances.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.instances.len()
    }
}

/// Tokenized dialogues whose instances are built on each `get`.
///
/// Used for split files read straight from disk, where holding
/// every flattened instance in memory is not worth it. With
/// `lm_labels` off the response is dropped, leaving a prompt that
/// ends in the next speaker's marker.
pub struct DialogueFileDataset {
    dialogues:   Vec<Vec<Vec<u32>>>,
    max_history: usize,
    special:     SpecialTokens,
    opts:        InstanceOptions,
}

impl DialogueFileDataset {
    /// Tokenize raw dialogues. Empty dialogues are rejected here so
    /// `get` never has to fail on them.
    pub fn new(
        raw:         &[Vec<String>],
        tokenizer:   &dyn DialogueTokenizer,
        max_history: usize,
        special:     SpecialTokens,
        opts:        InstanceOptions,
    ) -> Result<Self> {
        anyhow::ensure!(max_history >= 1, "max_history must be at least 1");

        let mut dialogues = Vec::with_capacity(raw.len());
        for (index, dialogue) in raw.iter().enumerate() {
            anyhow::ensure!(!dialogue.is_empty(), "Dialogue {index} has no utterances");
            let ids = dialogue
                .iter()
                .map(|u| tokenizer.encode(u))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Cannot tokenize dialogue {index}"))?;
            dialogues.push(ids);
        }

        Ok(Self { dialogues, max_history, special, opts })
    }

    fn instance(&self, dialogue: &[Vec<u32>]) -> Result<Instance> {
        let (history, response) = window(dialogue, self.max_history)
            .context("Dialogue has no utterances")?;
        let response = if self.opts.lm_labels { response } else { &[] };
        build_instance(history, response, &self.special, self.opts)
    }
}

impl Dataset<Instance> for DialogueFileDataset {
    fn get(&self, index: usize) -> Option<Instance> {
        let dialogue = self.dialogues.get(index)?;
        match self.instance(dialogue) {
            Ok(instance) => Some(instance),
            Err(e) => {
                tracing::error!("Cannot build instance {}: {:#}", index, e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.dialogues.len()
    }
}
