//! Loader
//!
//! Splits row indices into mini-batches for one epoch.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, Copy)]
pub struct BatchLoader {
    pub batch_size: usize,
    pub shuffle: bool,
    pub drop_last: bool,
}

impl BatchLoader {
    pub fn new(batch_size: usize, shuffle: bool, drop_last: bool) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");
        BatchLoader {
            batch_size,
            shuffle,
            drop_last,
        }
    }

    /// Batches of `index` for one epoch, in shuffled order when `shuffle` is set.
    pub fn batches(&self, index: &[usize], rng: &mut StdRng) -> Vec<Vec<usize>> {
        let mut order = index.to_vec();
        if self.shuffle {
            order.shuffle(rng);
        }
        order
            .chunks(self.batch_size)
            .filter(|c| !self.drop_last || c.len() == self.batch_size)
            .map(|c| c.to_vec())
            .collect()
    }

    /// Number of batches per epoch for `n` rows.
    pub fn n_batches(&self, n: usize) -> usize {
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }
}
