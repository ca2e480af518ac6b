// ============================================================
// Layer 4 — Distributed Sampler
// ============================================================
// Splits a dataset between `num_replicas` training processes so
// each one sees a disjoint share of every epoch.
//
// Per epoch:
//   1. order = 0..n, shuffled with seed + epoch when enabled
//   2. order is padded by wrapping around until its length is a
//      multiple of num_replicas, so every rank gets the same
//      number of samples
//   3. rank r takes order[r], order[r + R], order[r + 2R], ...
//
// Every rank must use the same seed and call set_epoch with the
// same value, otherwise the shares overlap.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, PoisonError, RwLock,
};

use anyhow::Result;
use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

#[derive(Clone, Debug)]
pub struct DistributedSampler {
    num_replicas: usize,
    rank:         usize,
    shuffle:      bool,
    seed:         u64,
    /// Shared with every dataset wrapped by this sampler
    epoch:        Arc<AtomicU64>,
}

impl DistributedSampler {
    pub fn new(num_replicas: usize, rank: usize, shuffle: bool, seed: u64) -> Result<Self> {
        anyhow::ensure!(num_replicas >= 1, "world size must be at least 1");
        anyhow::ensure!(
            rank < num_replicas,
            "rank {rank} is outside a world of {num_replicas} processes"
        );
        Ok(Self {
            num_replicas,
            rank,
            shuffle,
            seed,
            epoch: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Select the ordering for the next pass over the data.
    pub fn set_epoch(&self, epoch: u64) {
        self.epoch.store(epoch, Ordering::SeqCst);
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_replicas(&self) -> usize {
        self.num_replicas
    }

    /// Samples this rank sees per epoch.
    pub fn num_samples(&self, dataset_len: usize) -> usize {
        dataset_len.div_ceil(self.num_replicas)
    }

    /// Dataset indices for this rank in the current epoch.
    pub fn indices(&self, dataset_len: usize) -> Vec<usize> {
        if dataset_len == 0 {
            return Vec::new();
        }

        let mut order: Vec<usize> = (0..dataset_len).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.epoch()));
            order.shuffle(&mut rng);
        }

        let total = self.num_samples(dataset_len) * self.num_replicas;
        let padded = order.iter().copied().cycle().take(total);

        padded.skip(self.rank).step_by(self.num_replicas).collect()
    }

    /// Wrap a dataset so it only exposes this rank's share.
    pub fn shard<D>(&self, dataset: D) -> ShardedDataset<D> {
        ShardedDataset {
            inner:   dataset,
            sampler: self.clone(),
            plan:    RwLock::new(None),
        }
    }
}

/// A dataset restricted to one rank's share of the current epoch.
pub struct ShardedDataset<D> {
    inner:   D,
    sampler: DistributedSampler,
    /// Index plan cached for the epoch it was built for
    plan:    RwLock<Option<(u64, Vec<usize>)>>,
}

impl<D> ShardedDataset<D> {
    fn resolve(&self, index: usize, inner_len: usize) -> Option<usize> {
        let epoch = self.sampler.epoch();
        {
            let plan = self.plan.read().unwrap_or_else(PoisonError::into_inner);
            if let Some((planned, indices)) = plan.as_ref() {
                if *planned == epoch {
                    return indices.get(index).copied();
                }
            }
        }

        let indices = self.sampler.indices(inner_len);
        let found = indices.get(index).copied();
        *self.plan.write().unwrap_or_else(PoisonError::into_inner) = Some((epoch, indices));
        found
    }
}

impl<I, D: Dataset<I>> Dataset<I> for ShardedDataset<D> {
    fn get(&self, index: usize) -> Option<I> {
        let inner_index = self.resolve(index, self.inner.len())?;
        self.inner.get(inner_index)
    }

    fn len(&self) -> usize {
        self.sampler.num_samples(self.inner.len())
    }
}
