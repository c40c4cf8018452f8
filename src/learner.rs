//! Weak learner
//!
//! A two-hidden-layer perceptron with a scalar output. From the second stage
//! on, a learner sees the raw features concatenated with the *middle features*
//! (second hidden layer activations) of the learner before it, normalized by
//! an input batch norm:
//!
//! ```text
//! [x | lower] -> BatchNorm (stage > 0) -> Linear -> LeakyReLU(0.1) -> BatchNorm
//!             -> Linear = middle -> ReLU -> Linear -> out
//! ```
use crate::constants::LEAKY_RELU_SLOPE;
use crate::nn::{Activation, BatchNorm1d, BatchNormCache, Linear, Mode, Param, Parameterized};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

const LEAKY: Activation = Activation::LeakyReLU {
    alpha: LEAKY_RELU_SLOPE,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakLearner {
    stage: usize,
    feature_dim: usize,
    hidden_dim: usize,
    input_norm: Option<BatchNorm1d>,
    in_layer: Linear,
    norm: BatchNorm1d,
    hidden_layer: Linear,
    out_layer: Linear,
    mode: Mode,
}

/// Output of a learner for a batch.
#[derive(Debug, Clone)]
pub struct LearnerOutput {
    /// `(rows, hidden_dim)` middle features handed to the next learner.
    pub middle: Vec<f32>,
    /// One raw score per row.
    pub out: Vec<f32>,
}

/// Activations kept from a forward pass for the backward pass.
#[derive(Debug, Clone)]
pub struct LearnerCache {
    rows: usize,
    input: Vec<f32>,
    normed_input: Option<Vec<f32>>,
    input_norm: Option<BatchNormCache>,
    leaky: Vec<f32>,
    norm: BatchNormCache,
    normed_hidden: Vec<f32>,
    relu: Vec<f32>,
}

impl WeakLearner {
    /// Create the learner for boosting stage `stage`.
    pub fn new(stage: usize, feature_dim: usize, hidden_dim: usize, rng: &mut StdRng) -> Self {
        let input_dim = if stage == 0 {
            feature_dim
        } else {
            feature_dim + hidden_dim
        };
        WeakLearner {
            stage,
            feature_dim,
            hidden_dim,
            input_norm: if stage == 0 {
                None
            } else {
                Some(BatchNorm1d::new(input_dim))
            },
            in_layer: Linear::new_with_rng(input_dim, hidden_dim, rng),
            norm: BatchNorm1d::new(hidden_dim),
            hidden_layer: Linear::new_with_rng(hidden_dim, hidden_dim, rng),
            out_layer: Linear::new_with_rng(hidden_dim, 1, rng),
            mode: Mode::Train,
        }
    }

    pub fn stage(&self) -> usize {
        self.stage
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// Whether this learner consumes the middle features of a previous learner.
    pub fn takes_lower(&self) -> bool {
        self.input_norm.is_some()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn concat_input(&self, x: &[f32], lower: Option<&[f32]>, rows: usize) -> Vec<f32> {
        assert_eq!(x.len(), rows * self.feature_dim, "learner feature shape");
        match lower {
            None => {
                assert!(!self.takes_lower(), "learner for stage {} needs lower features", self.stage);
                x.to_vec()
            }
            Some(lower) => {
                assert!(self.takes_lower(), "stage 0 learner takes no lower features");
                assert_eq!(lower.len(), rows * self.hidden_dim, "lower feature shape");
                let mut input = Vec::with_capacity(rows * (self.feature_dim + self.hidden_dim));
                for (x_row, l_row) in x
                    .chunks_exact(self.feature_dim)
                    .zip(lower.chunks_exact(self.hidden_dim))
                {
                    input.extend_from_slice(x_row);
                    input.extend_from_slice(l_row);
                }
                input
            }
        }
    }

    /// Forward pass in the current mode, keeping what `backward` needs.
    ///
    /// In `Mode::Train` batch norm layers normalize with batch statistics and
    /// update their running statistics.
    pub fn forward_cached(&mut self, x: &[f32], lower: Option<&[f32]>, rows: usize) -> (LearnerOutput, LearnerCache) {
        let input = self.concat_input(x, lower, rows);
        let mode = self.mode;
        let (normed_input, input_norm) = match self.input_norm.as_mut() {
            Some(bn) => {
                let (y, cache) = bn.forward(&input, rows, mode);
                (Some(y), Some(cache))
            }
            None => (None, None),
        };
        let layer_in = normed_input.as_deref().unwrap_or(&input[..]);
        let leaky = LEAKY.forward_slice(&self.in_layer.forward(layer_in, rows));
        let (normed_hidden, norm) = self.norm.forward(&leaky, rows, mode);
        let middle = self.hidden_layer.forward(&normed_hidden, rows);
        let relu = Activation::ReLU.forward_slice(&middle);
        let out = self.out_layer.forward(&relu, rows);
        (
            LearnerOutput { middle, out },
            LearnerCache {
                rows,
                input,
                normed_input,
                input_norm,
                leaky,
                norm,
                normed_hidden,
                relu,
            },
        )
    }

    /// Forward pass in the current mode without keeping a cache.
    pub fn forward(&mut self, x: &[f32], lower: Option<&[f32]>, rows: usize) -> LearnerOutput {
        match self.mode {
            Mode::Train => self.forward_cached(x, lower, rows).0,
            Mode::Eval => self.forward_eval(x, lower, rows),
        }
    }

    /// Inference with running batch norm statistics. Does not mutate the learner.
    pub fn forward_eval(&self, x: &[f32], lower: Option<&[f32]>, rows: usize) -> LearnerOutput {
        let input = self.concat_input(x, lower, rows);
        let input = match &self.input_norm {
            Some(bn) => bn.forward_eval(&input, rows),
            None => input,
        };
        let leaky = LEAKY.forward_slice(&self.in_layer.forward(&input, rows));
        let normed_hidden = self.norm.forward_eval(&leaky, rows);
        let middle = self.hidden_layer.forward(&normed_hidden, rows);
        let relu = Activation::ReLU.forward_slice(&middle);
        let out = self.out_layer.forward(&relu, rows);
        LearnerOutput { middle, out }
    }

    /// Backward pass, accumulating parameter gradients.
    ///
    /// * `d_middle` - gradient reaching the middle features from the next learner, if any.
    /// * `d_out` - gradient of the loss w.r.t. each row's output.
    ///
    /// Returns the gradient w.r.t. the lower features, `None` at stage 0.
    pub fn backward(&mut self, cache: &LearnerCache, d_middle: Option<&[f32]>, d_out: &[f32]) -> Option<Vec<f32>> {
        let rows = cache.rows;
        assert_eq!(d_out.len(), rows, "learner output gradient shape");

        let d_relu = self.out_layer.backward(&cache.relu, d_out, rows);
        let mut d_mid = Activation::ReLU.backward_slice(&cache.relu, &d_relu);
        if let Some(d_middle) = d_middle {
            assert_eq!(d_middle.len(), d_mid.len(), "middle feature gradient shape");
            d_mid.iter_mut().zip(d_middle).for_each(|(a, b)| *a += b);
        }
        let d_normed_hidden = self.hidden_layer.backward(&cache.normed_hidden, &d_mid, rows);
        let d_leaky = self.norm.backward(&cache.norm, &d_normed_hidden, rows);
        let d_z1 = LEAKY.backward_slice(&cache.leaky, &d_leaky);
        let layer_in = cache.normed_input.as_deref().unwrap_or(&cache.input[..]);
        let d_layer_in = self.in_layer.backward(layer_in, &d_z1, rows);

        match (self.input_norm.as_mut(), cache.input_norm.as_ref()) {
            (Some(bn), Some(bn_cache)) => {
                let d_input = bn.backward(bn_cache, &d_layer_in, rows);
                let width = self.feature_dim + self.hidden_dim;
                let mut d_lower = Vec::with_capacity(rows * self.hidden_dim);
                for row in d_input.chunks_exact(width) {
                    d_lower.extend_from_slice(&row[self.feature_dim..]);
                }
                Some(d_lower)
            }
            _ => None,
        }
    }
}

impl Parameterized for WeakLearner {
    fn visit_params(&mut self, f: &mut dyn FnMut(&mut Param)) {
        if let Some(bn) = self.input_norm.as_mut() {
            bn.visit_params(f);
        }
        self.in_layer.visit_params(f);
        self.norm.visit_params(f);
        self.hidden_layer.visit_params(f);
        self.out_layer.visit_params(f);
    }
}
