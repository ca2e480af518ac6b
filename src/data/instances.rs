// ============================================================
// Layer 4 — Instance Builder
// ============================================================
// Turns each tokenized dialogue into one training Instance.
//
// For a dialogue [u0, u1, ..., un] and max_history = k:
//
//   history  = the utterances before un, at most 2k - 1 of them
//   response = un
//
//   sequence = [BOS]
//            + [speaker1] h0
//            + [speaker2] h1
//            + ...
//            + [speakerX] response [EOS]
//
// Speakers alternate from the first turn after BOS, so the
// response marker depends on how many history turns survive
// the window.
//
// lm_labels hide everything except the response content (and
// the EOS), so the model is only trained to produce the reply.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::domain::dialogue::TokenizedDataset;
use crate::domain::instance::{Instance, SpecialTokens, IGNORE_INDEX, SPECIAL_TOKENS};
use crate::domain::traits::DialogueTokenizer;

/// Switches that change the shape of every built instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceOptions {
    /// Append EOS to the response turn
    pub with_eos:  bool,
    /// Expose the response tokens as labels
    pub lm_labels: bool,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self { with_eos: true, lm_labels: true }
    }
}

/// Look up the four markers (plus padding) in the tokenizer vocabulary.
pub fn resolve_special_tokens(tokenizer: &dyn DialogueTokenizer) -> Result<SpecialTokens> {
    let mut ids = [0u32; 4];
    for (slot, token) in ids.iter_mut().zip(SPECIAL_TOKENS) {
        *slot = tokenizer.token_to_id(token).with_context(|| {
            format!("Tokenizer '{}' has no '{}' token", tokenizer.type_name(), token)
        })?;
    }

    let pad = match tokenizer.pad_token_id() {
        Some(id) => id,
        None => {
            tracing::warn!("Tokenizer has no pad token, padding batches with id 0");
            0
        }
    };

    Ok(SpecialTokens {
        bos:      ids[0],
        eos:      ids[1],
        speaker1: ids[2],
        speaker2: ids[3],
        pad,
    })
}

/// Split a dialogue into (history, response) the way
/// `dialogue[-2k:-1], dialogue[-1]` would.
pub fn window(dialogue: &[Vec<u32>], max_history: usize) -> Option<(&[Vec<u32>], &[u32])> {
    let (response, before) = dialogue.split_last()?;
    let start = dialogue.len().saturating_sub(max_history.saturating_mul(2));
    let history = &before[start.min(before.len())..];
    Some((history, response.as_slice()))
}

/// Build one instance from an already windowed dialogue.
pub fn build_instance(
    history:  &[Vec<u32>],
    response: &[u32],
    special:  &SpecialTokens,
    opts:     InstanceOptions,
) -> Result<Instance> {
    let mut last_turn = response.to_vec();
    if opts.with_eos {
        last_turn.push(special.eos);
    }

    // Turns after BOS, each still without its speaker marker
    let turns: Vec<&[u32]> = history
        .iter()
        .map(Vec::as_slice)
        .chain(std::iter::once(last_turn.as_slice()))
        .collect();

    let total = 1 + turns.iter().map(|t| t.len() + 1).sum::<usize>();
    let mut input_ids      = Vec::with_capacity(total);
    let mut token_type_ids = Vec::with_capacity(total);

    input_ids.push(special.bos);
    token_type_ids.push(special.bos);

    for (i, turn) in turns.iter().enumerate() {
        let speaker = special.speaker_for_turn(i);
        input_ids.push(speaker);
        input_ids.extend_from_slice(turn);
        token_type_ids.extend(std::iter::repeat(speaker).take(turn.len() + 1));
    }

    let mut lm_labels = vec![IGNORE_INDEX; input_ids.len()];
    if opts.lm_labels {
        // Marker of the last turn stays masked, its content is the target
        let start = input_ids.len() - last_turn.len();
        for (label, &id) in lm_labels[start..].iter_mut().zip(&last_turn) {
            *label = i64::from(id);
        }
    }

    let instance = Instance { input_ids, token_type_ids, lm_labels };
    anyhow::ensure!(
        instance.is_aligned(),
        "Instance sequences differ in length: input_ids={}, token_type_ids={}, lm_labels={}",
        instance.input_ids.len(),
        instance.token_type_ids.len(),
        instance.lm_labels.len()
    );
    Ok(instance)
}

/// Window a dialogue and build its instance.
pub fn dialogue_to_instance(
    dialogue:    &[Vec<u32>],
    max_history: usize,
    special:     &SpecialTokens,
    opts:        InstanceOptions,
) -> Result<Instance> {
    let (history, response) = window(dialogue, max_history)
        .context("Dialogue has no utterances")?;
    build_instance(history, response, special, opts)
}

/// Build instances for every dialogue of every split.
pub fn data_process(
    max_history: usize,
    data:        &TokenizedDataset,
    tokenizer:   &dyn DialogueTokenizer,
    opts:        InstanceOptions,
) -> Result<BTreeMap<String, Vec<Instance>>> {
    anyhow::ensure!(max_history >= 1, "max_history must be at least 1");

    let special = resolve_special_tokens(tokenizer)?;
    let splits = data
        .as_map()
        .context("Tokenized dataset must map split names to dialogues")?;

    let mut datasets = BTreeMap::new();
    for (split, dialogues) in splits {
        let dialogues = dialogues
            .as_list()
            .with_context(|| format!("Split '{split}' is not a list of dialogues"))?;

        let mut instances = Vec::with_capacity(dialogues.len());
        for (index, dialogue) in dialogues.iter().enumerate() {
            let utterances = dialogue_utterances(dialogue)
                .with_context(|| format!("Split '{split}', dialogue {index}"))?;
            let instance = dialogue_to_instance(&utterances, max_history, &special, opts)
                .with_context(|| format!("Split '{split}', dialogue {index}"))?;
            instances.push(instance);
        }

        tracing::debug!("Built {} instances for split '{}'", instances.len(), split);
        datasets.insert(split.clone(), instances);
    }

    Ok(datasets)
}

fn dialogue_utterances(dialogue: &TokenizedDataset) -> Result<Vec<Vec<u32>>> {
    let turns = dialogue.as_list().context("Dialogue is not a list of utterances")?;
    turns
        .iter()
        .enumerate()
        .map(|(i, turn)| {
            turn.as_leaf()
                .cloned()
                .with_context(|| format!("Utterance {i} is not a token sequence"))
        })
        .collect()
}
