// ============================================================
// Layer 3 — Instance Domain Type
// ============================================================
// One training example built from one dialogue.
//
// Three parallel sequences, always the same length:
//   input_ids       [CLS] [speaker1] turn ... [speaker2] response [SEP]
//   token_type_ids  which speaker produced each position
//   lm_labels       -1 everywhere except the response tokens
//
// Example (BOS=1, EOS=2, speaker1=5, speaker2=6):
//   input_ids      = [1, 5, 20, 6, 30, 31, 2]
//   token_type_ids = [1, 5,  5, 6,  6,  6, 6]
//   lm_labels      = [-1,-1,-1,-1, 30, 31, 2]

use serde::{Deserialize, Serialize};

/// Label value for positions that must not contribute to the loss.
pub const IGNORE_INDEX: i64 = -1;

/// Vocabulary entries for the four fixed markers.
pub const BOS_TOKEN: &str = "[CLS]";
pub const EOS_TOKEN: &str = "[SEP]";
pub const SPEAKER1_TOKEN: &str = "[speaker1]";
pub const SPEAKER2_TOKEN: &str = "[speaker2]";

/// Marker ids in the order [BOS, EOS, speaker1, speaker2].
pub const SPECIAL_TOKENS: [&str; 4] = [BOS_TOKEN, EOS_TOKEN, SPEAKER1_TOKEN, SPEAKER2_TOKEN];

/// Marker ids resolved once per run and shared by every dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub bos:      u32,
    pub eos:      u32,
    pub speaker1: u32,
    pub speaker2: u32,
    /// Padding id used only when batching
    pub pad:      u32,
}

impl SpecialTokens {
    /// Speaker marker for the n-th turn after BOS.
    /// Even turns belong to speaker1, odd turns to speaker2.
    pub fn speaker_for_turn(&self, turn: usize) -> u32 {
        if turn % 2 == 0 { self.speaker1 } else { self.speaker2 }
    }
}

/// A fully built training example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub input_ids:      Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub lm_labels:      Vec<i64>,
}

impl Instance {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// True when all three sequences line up.
    pub fn is_aligned(&self) -> bool {
        self.input_ids.len() == self.token_type_ids.len()
            && self.input_ids.len() == self.lm_labels.len()
    }

    /// Number of positions that contribute to the loss.
    pub fn target_count(&self) -> usize {
        self.lm_labels.iter().filter(|&&l| l != IGNORE_INDEX).count()
    }
}
