// ============================================================
// Layer 3 — Dialogue Corpus
// ============================================================
// A corpus is a nested structure:
//
//   { "train": [ ["hi", "hello", "how are you"], ... ],
//     "valid": [ ... ] }
//
// split name → list of dialogues → list of utterances.
//
// Before tokenization every leaf is a String, afterwards every
// leaf is a Vec<u32> of token ids. The shape never changes, so
// both stages share one tagged tree type and only the leaf type
// differs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A nested corpus node. Externally tagged on the wire so an empty
/// utterance (`Leaf([])`) and an empty dialogue (`List([])`) stay
/// distinguishable after a save/load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueTree<L> {
    Leaf(L),
    List(Vec<DialogueTree<L>>),
    Map(BTreeMap<String, DialogueTree<L>>),
}

/// Corpus as read from disk: every leaf is an utterance string.
pub type RawDataset = DialogueTree<String>;

/// Corpus after tokenization: every leaf is a token id sequence.
pub type TokenizedDataset = DialogueTree<Vec<u32>>;

/// First few raw dialogues of each split, kept for eyeballing.
pub type RawPreview = BTreeMap<String, Vec<RawDataset>>;

impl<L> DialogueTree<L> {
    /// Rebuild the tree with every leaf passed through `f`.
    /// Lists keep their order and length, maps keep their keys.
    pub fn try_map_leaves<T, E, F>(&self, f: &mut F) -> Result<DialogueTree<T>, E>
    where
        F: FnMut(&L) -> Result<T, E>,
    {
        Ok(match self {
            DialogueTree::Leaf(leaf) => DialogueTree::Leaf(f(leaf)?),
            DialogueTree::List(items) => DialogueTree::List(
                items
                    .iter()
                    .map(|item| item.try_map_leaves(f))
                    .collect::<Result<Vec<_>, E>>()?,
            ),
            DialogueTree::Map(entries) => {
                let mut out = BTreeMap::new();
                for (key, value) in entries {
                    out.insert(key.clone(), value.try_map_leaves(f)?);
                }
                DialogueTree::Map(out)
            }
        })
    }

    /// Visit every leaf in depth-first order.
    pub fn for_each_leaf<F: FnMut(&L)>(&self, f: &mut F) {
        match self {
            DialogueTree::Leaf(leaf) => f(leaf),
            DialogueTree::List(items) => items.iter().for_each(|item| item.for_each_leaf(f)),
            DialogueTree::Map(entries) => entries.values().for_each(|v| v.for_each_leaf(f)),
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, DialogueTree<L>>> {
        match self {
            DialogueTree::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DialogueTree<L>]> {
        match self {
            DialogueTree::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&L> {
        match self {
            DialogueTree::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Number of leaves under this node.
    pub fn leaf_count(&self) -> usize {
        let mut n = 0;
        self.for_each_leaf(&mut |_| n += 1);
        n
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawDataset {
        let mut splits = BTreeMap::new();
        splits.insert(
            "train".to_string(),
            DialogueTree::List(vec![DialogueTree::List(vec![
                DialogueTree::Leaf("hi".to_string()),
                DialogueTree::Leaf("hello there".to_string()),
            ])]),
        );
        splits.insert("valid".to_string(), DialogueTree::List(Vec::new()));
        DialogueTree::Map(splits)
    }

    #[test]
    fn test_map_leaves_preserves_shape() {
        let raw = sample();
        let lengths: DialogueTree<usize> = raw
            .try_map_leaves(&mut |s: &String| Ok::<_, ()>(s.len()))
            .unwrap();

        let train = lengths.as_map().unwrap()["train"].as_list().unwrap();
        assert_eq!(train.len(), 1);
        let dialog = train[0].as_list().unwrap();
        assert_eq!(dialog[0].as_leaf(), Some(&2));
        assert_eq!(dialog[1].as_leaf(), Some(&11));

        // Empty containers survive untouched
        let valid = lengths.as_map().unwrap()["valid"].as_list().unwrap();
        assert!(valid.is_empty());
    }

    #[test]
    fn test_map_leaves_propagates_error() {
        let raw = sample();
        let result: Result<DialogueTree<()>, String> =
            raw.try_map_leaves(&mut |s: &String| {
                if s == "hello there" { Err(s.clone()) } else { Ok(()) }
            });
        assert_eq!(result.unwrap_err(), "hello there");
    }

    #[test]
    fn test_leaf_count() {
        assert_eq!(sample().leaf_count(), 2);
    }

    #[test]
    fn test_empty_leaf_and_empty_list_stay_distinct() {
        let tree: TokenizedDataset = DialogueTree::List(vec![
            DialogueTree::Leaf(Vec::new()),
            DialogueTree::List(Vec::new()),
        ]);
        let json = serde_json::to_string(&tree).unwrap();
        let back: TokenizedDataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
