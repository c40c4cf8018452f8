//! DynamicNet
//!
//! The growing ensemble. Its prediction for a row is
//! `c0 + boost_rate * (out_0 + out_1 + ... + out_k)`, where learner `k` is fed
//! the raw features together with the middle features of learner `k - 1`.
use crate::booster::config::BoosterIO;
use crate::data::Matrix;
use crate::errors::GrowNetError;
use crate::learner::{LearnerCache, LearnerOutput, WeakLearner};
use crate::nn::{Mode, Param, Parameterized};
use crate::utils::odds;
use hashbrown::HashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rows pushed through the ensemble at once when predicting.
const PREDICT_CHUNK_ROWS: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicNet {
    /// Initial log-odds of the positive class.
    pub c0: f32,
    /// Scalar applied to the summed learner outputs. Trained in the corrective step.
    pub boost_rate: Param,
    models: Vec<WeakLearner>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Per-learner caches of a `forward_grad` pass.
#[derive(Debug)]
pub struct EnsembleCache {
    caches: Vec<LearnerCache>,
    summed_out: Vec<f32>,
}

impl DynamicNet {
    pub fn new(c0: f32, boost_rate: f32) -> Self {
        DynamicNet {
            c0,
            boost_rate: Param::new(vec![boost_rate]),
            models: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Append a trained learner.
    pub fn add(&mut self, model: WeakLearner) {
        self.models.push(model);
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[WeakLearner] {
        &self.models
    }

    pub fn boost_rate(&self) -> f32 {
        self.boost_rate.value[0]
    }

    pub fn to_train(&mut self) {
        self.models.iter_mut().for_each(|m| m.set_mode(Mode::Train));
    }

    pub fn to_eval(&mut self) {
        self.models.iter_mut().for_each(|m| m.set_mode(Mode::Eval));
    }

    fn combine(&self, summed_out: Option<Vec<f32>>, rows: usize) -> Vec<f32> {
        let br = self.boost_rate();
        match summed_out {
            None => vec![self.c0; rows],
            Some(s) => s.into_iter().map(|v| self.c0 + br * v).collect(),
        }
    }

    /// Feed each learner the middle features of the one before it.
    fn chain<F>(n_models: usize, mut step: F) -> (Option<Vec<f32>>, Option<Vec<f32>>)
    where
        F: FnMut(usize, Option<&[f32]>) -> LearnerOutput,
    {
        let mut middle: Option<Vec<f32>> = None;
        let mut summed: Option<Vec<f32>> = None;
        for k in 0..n_models {
            let output = step(k, middle.as_deref());
            summed = Some(match summed {
                None => output.out,
                Some(mut s) => {
                    s.iter_mut().zip(&output.out).for_each(|(a, b)| *a += b);
                    s
                }
            });
            middle = Some(output.middle);
        }
        (middle, summed)
    }

    /// Forward pass for a batch without keeping gradient caches.
    ///
    /// Learners in train mode normalize with batch statistics and update their
    /// running statistics. Returns the middle features of the last learner
    /// (`None` for an empty ensemble) and the ensemble score per row.
    pub fn forward(&mut self, x: &[f32], rows: usize) -> (Option<Vec<f32>>, Vec<f32>) {
        let models = &mut self.models;
        let (middle, summed) = Self::chain(models.len(), |k, lower| models[k].forward(x, lower, rows));
        (middle, self.combine(summed, rows))
    }

    /// Forward pass with running batch norm statistics for every learner.
    pub fn forward_eval(&self, x: &[f32], rows: usize) -> (Option<Vec<f32>>, Vec<f32>) {
        let (middle, summed) = Self::chain(self.models.len(), |k, lower| self.models[k].forward_eval(x, lower, rows));
        (middle, self.combine(summed, rows))
    }

    /// Forward pass that keeps what `backward` needs to reach every learner
    /// and the boost rate.
    pub fn forward_grad(&mut self, x: &[f32], rows: usize) -> (Vec<f32>, EnsembleCache) {
        let mut caches = Vec::with_capacity(self.models.len());
        let mut middle: Option<Vec<f32>> = None;
        let mut summed_out = vec![0.0; rows];
        for model in self.models.iter_mut() {
            let (output, cache) = model.forward_cached(x, middle.as_deref(), rows);
            summed_out.iter_mut().zip(&output.out).for_each(|(a, b)| *a += b);
            caches.push(cache);
            middle = Some(output.middle);
        }
        let br = self.boost_rate();
        let out = if self.models.is_empty() {
            vec![self.c0; rows]
        } else {
            summed_out.iter().map(|s| self.c0 + br * s).collect()
        };
        (out, EnsembleCache { caches, summed_out })
    }

    /// Backpropagate `d_out` (gradient w.r.t. each row's ensemble score),
    /// accumulating gradients into every learner and the boost rate.
    pub fn backward(&mut self, cache: &EnsembleCache, d_out: &[f32]) {
        assert_eq!(cache.caches.len(), self.models.len(), "ensemble cache does not match models");
        assert_eq!(d_out.len(), cache.summed_out.len(), "ensemble output gradient shape");
        self.boost_rate.ensure_grad();
        let d_br: f64 = d_out
            .iter()
            .zip(&cache.summed_out)
            .map(|(d, s)| (*d as f64) * (*s as f64))
            .sum();
        self.boost_rate.grad[0] += d_br as f32;

        let br = self.boost_rate();
        let d_learner_out: Vec<f32> = d_out.iter().map(|d| br * d).collect();
        let mut d_middle: Option<Vec<f32>> = None;
        for (model, learner_cache) in self.models.iter_mut().zip(&cache.caches).rev() {
            d_middle = model.backward(learner_cache, d_middle.as_deref(), &d_learner_out);
        }
    }

    /// Raw ensemble scores (log-odds) for every row of `data`.
    ///
    /// Learners always use their running batch norm statistics here.
    pub fn predict(&self, data: &Matrix<f32>, parallel: bool) -> Vec<f64> {
        let chunk = PREDICT_CHUNK_ROWS * data.cols;
        let predict_chunk = |x: &[f32]| -> Vec<f64> {
            let rows = x.len() / data.cols;
            let (_, out) = self.forward_eval(x, rows);
            out.into_iter().map(f64::from).collect()
        };
        if parallel {
            data.data.par_chunks(chunk).flat_map_iter(predict_chunk).collect()
        } else {
            data.data.chunks(chunk).flat_map(predict_chunk).collect()
        }
    }

    /// Probability of the positive class for every row of `data`.
    pub fn predict_proba(&self, data: &Matrix<f32>, parallel: bool) -> Vec<f64> {
        let preds = self.predict(data, parallel);
        if parallel {
            preds.par_iter().map(|p| odds(*p)).collect()
        } else {
            preds.iter().map(|p| odds(*p)).collect()
        }
    }

    /// Write the ensemble to `path` as json.
    pub fn save_ensemble<P: AsRef<Path>>(&self, path: P) -> Result<(), GrowNetError> {
        self.save_booster(path)
    }

    /// Read an ensemble written by `save_ensemble`.
    pub fn load_ensemble<P: AsRef<Path>>(path: P) -> Result<Self, GrowNetError> {
        Self::load_booster(path)
    }

    /// Insert metadata
    /// * `key` - String value for the metadata key.
    /// * `value` - value to assign to the metadata key.
    pub fn insert_metadata(&mut self, key: String, value: String) {
        self.metadata.insert(key, value);
    }

    /// Get Metadata
    /// * `key` - Get the associated value for the metadata key.
    pub fn get_metadata(&self, key: &str) -> Option<String> {
        self.metadata.get(key).cloned()
    }
}

impl Parameterized for DynamicNet {
    fn visit_params(&mut self, f: &mut dyn FnMut(&mut Param)) {
        for model in self.models.iter_mut() {
            model.visit_params(f);
        }
        f(&mut self.boost_rate);
    }
}

impl BoosterIO for DynamicNet {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::tempdir;

    fn ensemble(stages: usize, rng: &mut StdRng) -> DynamicNet {
        let mut net = DynamicNet::new(0.25, 1.0);
        for stage in 0..stages {
            net.add(WeakLearner::new(stage, 3, 4, rng));
        }
        net
    }

    /// Gradient of the last visited parameter, a learner's output bias.
    fn last_grad(model: &mut WeakLearner) -> f32 {
        let mut g = 0.0;
        model.visit_params(&mut |p| g = p.grad[0]);
        g
    }

    fn batch(rng: &mut StdRng, n: usize) -> Vec<f32> {
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn test_empty_ensemble_predicts_c0() {
        let mut net = DynamicNet::new(-0.5, 1.0);
        let (middle, out) = net.forward(&[0.0; 6], 2);
        assert!(middle.is_none());
        assert_eq!(out, vec![-0.5, -0.5]);
        assert!(net.is_empty());
    }

    #[test]
    fn test_score_is_c0_plus_scaled_sum() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut net = ensemble(3, &mut rng);
        net.boost_rate.value[0] = 0.5;
        net.to_eval();
        let x = batch(&mut rng, 5 * 3);
        let (_, out) = net.forward_eval(&x, 5);

        let o0 = net.models[0].forward_eval(&x, None, 5);
        let o1 = net.models[1].forward_eval(&x, Some(&o0.middle), 5);
        let o2 = net.models[2].forward_eval(&x, Some(&o1.middle), 5);
        for r in 0..5 {
            let expected = 0.25 + 0.5 * (o0.out[r] + o1.out[r] + o2.out[r]);
            assert_abs_diff_eq!(out[r], expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_backward_reaches_every_learner_and_boost_rate() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut net = ensemble(3, &mut rng);
        let rows = 8;
        let x = batch(&mut rng, rows * 3);
        let w: Vec<f32> = batch(&mut rng, rows);
        let loss = |net: &mut DynamicNet| -> f32 {
            let (out, _) = net.forward_grad(&x, rows);
            out.iter().zip(&w).map(|(a, b)| a * b).sum()
        };

        let (_, cache) = net.forward_grad(&x, rows);
        net.zero_grad();
        net.backward(&cache, &w);
        let analytic_br = net.boost_rate.grad[0];
        let analytic_first_bias = last_grad(&mut net.models[0]);

        let eps = 1e-3;
        net.boost_rate.value[0] += eps;
        let up = loss(&mut net);
        net.boost_rate.value[0] -= 2.0 * eps;
        let down = loss(&mut net);
        net.boost_rate.value[0] += eps;
        assert_abs_diff_eq!(analytic_br, (up - down) / (2.0 * eps), epsilon = 1e-2);

        // Output bias of learner 0 shifts every row's score by boost_rate.
        let br = net.boost_rate();
        assert_abs_diff_eq!(analytic_first_bias, br * w.iter().sum::<f32>(), epsilon = 1e-4);
    }

    #[test]
    fn test_predict_parallel_matches_serial() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut net = ensemble(2, &mut rng);
        let x = batch(&mut rng, 10 * 3);
        net.forward(&x, 10);
        net.to_eval();
        let m = Matrix::new(&x, 10, 3);
        let a = net.predict(&m, true);
        let b = net.predict(&m, false);
        assert_eq!(a, b);
        let p = net.predict_proba(&m, false);
        assert!(p.iter().all(|v| *v > 0.0 && *v < 1.0));
    }

    #[test]
    fn test_save_and_load() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut net = ensemble(2, &mut rng);
        net.insert_metadata("dataset".to_string(), "a9a".to_string());
        let dir = tempdir().unwrap();
        let path = dir.path().join("ensemble.json");
        net.save_ensemble(&path).unwrap();
        let loaded = DynamicNet::load_ensemble(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.c0, net.c0);
        assert_eq!(loaded.get_metadata("dataset"), Some("a9a".to_string()));

        let x = batch(&mut rng, 4 * 3);
        let m = Matrix::new(&x, 4, 3);
        assert_eq!(loaded.predict(&m, false), net.predict(&m, false));
    }

    #[test]
    fn test_visit_order_ends_with_boost_rate() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut net = ensemble(2, &mut rng);
        let mut last_len = 0;
        net.visit_params(&mut |p| last_len = p.len());
        assert_eq!(last_len, 1);
        let learner_params: usize = net.models.iter_mut().map(|m| m.num_params()).sum();
        assert_eq!(net.num_params(), learner_params + 1);
    }
}
