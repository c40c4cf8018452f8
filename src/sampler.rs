//! Sampler
//!
//! Strategies for sampling rows: holding out a validation split, and drawing a
//! fixed-size training subset for very large datasets.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum SampleMethod {
    None,
    Random(f32),
    FixedSize(usize),
}

// A sampler can be used to subset the data prior to training.
pub trait Sampler {
    /// Sample the data, returning a tuple, where the first item is the samples
    /// chosen for training, and the second are the samples excluded.
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> (Vec<usize>, Vec<usize>);
}

pub struct RandomSampler {
    subsample: f32,
}

impl RandomSampler {
    pub fn new(subsample: f32) -> Self {
        RandomSampler { subsample }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let subsample = self.subsample;
        let mut chosen = Vec::new();
        let mut excluded = Vec::new();
        for i in index {
            if rng.gen::<f32>() < subsample {
                chosen.push(*i);
            } else {
                excluded.push(*i)
            }
        }
        (chosen, excluded)
    }
}

/// Chooses exactly `size` rows (or all of them when there are fewer).
pub struct FixedSizeSampler {
    size: usize,
}

impl FixedSizeSampler {
    pub fn new(size: usize) -> Self {
        FixedSizeSampler { size }
    }
}

impl Sampler for FixedSizeSampler {
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let mut shuffled = index.to_vec();
        shuffled.shuffle(rng);
        let excluded = shuffled.split_off(self.size.min(shuffled.len()));
        (shuffled, excluded)
    }
}

impl SampleMethod {
    /// Build the sampler for this method, `None` when every row is kept.
    pub fn sampler(&self) -> Option<Box<dyn Sampler>> {
        match *self {
            SampleMethod::None => None,
            SampleMethod::Random(subsample) => Some(Box::new(RandomSampler::new(subsample))),
            SampleMethod::FixedSize(size) => Some(Box::new(FixedSizeSampler::new(size))),
        }
    }
}

/// Shuffle `0..len` and cut it at `floor(len * train_fraction)`.
///
/// Returns `(train, validation)` row indices.
pub fn train_validation_split(len: usize, train_fraction: f64, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    let cut = ((len as f64) * train_fraction).floor() as usize;
    let validation = indices.split_off(cut.min(len));
    (indices, validation)
}
