// ============================================================
// Layer 4 — Dialogue Batcher
// ============================================================
// Implements Burn's Batcher trait: a Vec<Instance> of ragged
// lengths becomes three [batch_size, max_len] Int tensors.
//
// Padding:
//   input_ids, token_type_ids → pad token id
//   lm_labels                 → -1 (ignored by the loss)
//
// max_len is the longest instance in THIS batch, not in the
// whole dataset, so short batches stay small.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::instance::{Instance, IGNORE_INDEX};

// ─── DialogueBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DialogueBatch<B: Backend> {
    /// [batch_size, max_len]
    pub input_ids: Tensor<B, 2, Int>,
    /// [batch_size, max_len]
    pub token_type_ids: Tensor<B, 2, Int>,
    /// [batch_size, max_len], -1 where no loss is taken
    pub lm_labels: Tensor<B, 2, Int>,
}

// ─── DialogueBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct DialogueBatcher {
    pad_id: u32,
}

impl DialogueBatcher {
    pub fn new(pad_id: u32) -> Self {
        Self { pad_id }
    }
}

/// Flatten ragged rows into one row-major buffer of `rows * width`.
fn pad_rows<T: Copy>(rows: impl Iterator<Item = impl AsRef<[T]>>, width: usize, pad: T) -> Vec<T> {
    let mut flat = Vec::new();
    for row in rows {
        let row = row.as_ref();
        flat.extend_from_slice(row);
        flat.extend(std::iter::repeat(pad).take(width - row.len()));
    }
    flat
}

impl<B: Backend> Batcher<B, Instance, DialogueBatch<B>> for DialogueBatcher {
    fn batch(&self, items: Vec<Instance>, device: &B::Device) -> DialogueBatch<B> {
        let batch_size = items.len();
        let max_len = items.iter().map(Instance::len).max().unwrap_or(0);
        let pad = i64::from(self.pad_id);

        let widen = |ids: &Vec<u32>| ids.iter().map(|&x| i64::from(x)).collect::<Vec<i64>>();

        let input_flat = pad_rows(items.iter().map(|s| widen(&s.input_ids)), max_len, pad);
        let types_flat = pad_rows(items.iter().map(|s| widen(&s.token_type_ids)), max_len, pad);
        let label_flat = pad_rows(items.iter().map(|s| &s.lm_labels), max_len, IGNORE_INDEX);

        let to_tensor = |flat: Vec<i64>| {
            Tensor::<B, 2, Int>::from_data(TensorData::new(flat, [batch_size, max_len]), device)
        };

        DialogueBatch {
            input_ids:      to_tensor(input_flat),
            token_type_ids: to_tensor(types_flat),
            lm_labels:      to_tensor(label_flat),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    type TestBackend = NdArray;

    fn instance(ids: &[u32]) -> Instance {
        let n = ids.len();
        Instance {
            input_ids:      ids.to_vec(),
            token_type_ids: vec![7; n],
            lm_labels:      ids.iter().map(|&x| i64::from(x)).collect(),
        }
    }

    #[test]
    fn test_pads_to_longest_in_batch() {
        let device = NdArrayDevice::default();
        let batcher = DialogueBatcher::new(0);
        let batch: DialogueBatch<TestBackend> = batcher.batch(
            vec![instance(&[1, 5, 20, 2]), instance(&[1, 5, 2])],
            &device,
        );

        assert_eq!(batch.input_ids.dims(), [2, 4]);
        assert_eq!(batch.token_type_ids.dims(), [2, 4]);
        assert_eq!(batch.lm_labels.dims(), [2, 4]);

        let ids: Vec<i64> = batch.input_ids.into_data().iter::<i64>().collect();
        assert_eq!(ids, vec![1, 5, 20, 2, 1, 5, 2, 0]);

        let types: Vec<i64> = batch.token_type_ids.into_data().iter::<i64>().collect();
        assert_eq!(types, vec![7, 7, 7, 7, 7, 7, 7, 0]);

        let labels: Vec<i64> = batch.lm_labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![1, 5, 20, 2, 1, 5, 2, -1]);
    }

    #[test]
    fn test_uses_configured_pad_id() {
        let device = NdArrayDevice::default();
        let batcher = DialogueBatcher::new(9);
        let batch: DialogueBatch<TestBackend> =
            batcher.batch(vec![instance(&[1]), instance(&[1, 2, 3])], &device);

        let ids: Vec<i64> = batch.input_ids.into_data().iter::<i64>().collect();
        assert_eq!(ids, vec![1, 9, 9, 1, 2, 3]);
    }

    #[test]
    fn test_pad_rows() {
        let rows: Vec<Vec<u32>> = vec![vec![1, 2], vec![3]];
        assert_eq!(pad_rows(rows.iter(), 3, 0u32), vec![1, 2, 0, 3, 0, 0]);
    }
}
