use crate::constants::{BATCH_NORM_EPS, BATCH_NORM_MOMENTUM};
use crate::nn::param::{Param, Parameterized};
use crate::nn::Mode;
use serde::{Deserialize, Serialize};

/// Batch normalization over the feature dimension of a `(rows, dim)` batch,
/// with a learned affine transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm1d {
    dim: usize,
    pub gamma: Param,
    pub beta: Param,
    pub running_mean: Vec<f32>,
    pub running_var: Vec<f32>,
}

/// Values needed by the backward pass.
#[derive(Debug, Clone)]
pub struct BatchNormCache {
    x_hat: Vec<f32>,
    inv_std: Vec<f32>,
    /// `false` when running statistics were used, which makes the
    /// normalization a constant affine map of the input.
    batch_stats: bool,
}

impl BatchNorm1d {
    pub fn new(dim: usize) -> Self {
        BatchNorm1d {
            dim,
            gamma: Param::new(vec![1.0; dim]),
            beta: Param::new(vec![0.0; dim]),
            running_mean: vec![0.0; dim],
            running_var: vec![1.0; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Forward pass that keeps a cache for `backward`.
    ///
    /// In `Mode::Train` the batch mean and biased variance normalize the batch
    /// and the running statistics move towards the batch mean and unbiased
    /// variance. A batch of a single row has no variance, so it is normalized
    /// with the running statistics instead.
    pub fn forward(&mut self, x: &[f32], rows: usize, mode: Mode) -> (Vec<f32>, BatchNormCache) {
        assert_eq!(x.len(), rows * self.dim, "batch norm input shape");
        let dim = self.dim;
        let use_batch = mode == Mode::Train && rows > 1;

        let (mean, inv_std) = if use_batch {
            let n = rows as f64;
            let mut mean = vec![0f64; dim];
            for row in x.chunks_exact(dim) {
                for j in 0..dim {
                    mean[j] += row[j] as f64;
                }
            }
            mean.iter_mut().for_each(|m| *m /= n);
            let mut var = vec![0f64; dim];
            for row in x.chunks_exact(dim) {
                for j in 0..dim {
                    let d = row[j] as f64 - mean[j];
                    var[j] += d * d;
                }
            }
            var.iter_mut().for_each(|v| *v /= n);

            for j in 0..dim {
                let unbiased = var[j] * n / (n - 1.0);
                self.running_mean[j] =
                    (1.0 - BATCH_NORM_MOMENTUM) * self.running_mean[j] + BATCH_NORM_MOMENTUM * mean[j] as f32;
                self.running_var[j] =
                    (1.0 - BATCH_NORM_MOMENTUM) * self.running_var[j] + BATCH_NORM_MOMENTUM * unbiased as f32;
            }
            let mean: Vec<f32> = mean.iter().map(|m| *m as f32).collect();
            let inv_std: Vec<f32> = var
                .iter()
                .map(|v| 1.0 / (*v as f32 + BATCH_NORM_EPS).sqrt())
                .collect();
            (mean, inv_std)
        } else {
            (self.running_mean.clone(), self.running_inv_std())
        };

        let mut x_hat = vec![0.0; x.len()];
        let mut y = vec![0.0; x.len()];
        for ((x_row, xh_row), y_row) in x
            .chunks_exact(dim)
            .zip(x_hat.chunks_exact_mut(dim))
            .zip(y.chunks_exact_mut(dim))
        {
            for j in 0..dim {
                xh_row[j] = (x_row[j] - mean[j]) * inv_std[j];
                y_row[j] = self.gamma.value[j] * xh_row[j] + self.beta.value[j];
            }
        }
        (
            y,
            BatchNormCache {
                x_hat,
                inv_std,
                batch_stats: use_batch,
            },
        )
    }

    /// Inference with the running statistics.
    pub fn forward_eval(&self, x: &[f32], rows: usize) -> Vec<f32> {
        assert_eq!(x.len(), rows * self.dim, "batch norm input shape");
        let inv_std = self.running_inv_std();
        let mut y = vec![0.0; x.len()];
        for (x_row, y_row) in x.chunks_exact(self.dim).zip(y.chunks_exact_mut(self.dim)) {
            for j in 0..self.dim {
                let x_hat = (x_row[j] - self.running_mean[j]) * inv_std[j];
                y_row[j] = self.gamma.value[j] * x_hat + self.beta.value[j];
            }
        }
        y
    }

    /// Backward pass. Accumulates `gamma` / `beta` gradients and returns `dL/dx`.
    pub fn backward(&mut self, cache: &BatchNormCache, d_y: &[f32], rows: usize) -> Vec<f32> {
        assert_eq!(d_y.len(), rows * self.dim, "batch norm upstream gradient shape");
        let dim = self.dim;
        self.gamma.ensure_grad();
        self.beta.ensure_grad();

        // Per-feature sums of dL/dx_hat and dL/dx_hat * x_hat.
        let mut sum_dxh = vec![0f32; dim];
        let mut sum_dxh_xh = vec![0f32; dim];
        for (dy_row, xh_row) in d_y.chunks_exact(dim).zip(cache.x_hat.chunks_exact(dim)) {
            for j in 0..dim {
                self.gamma.grad[j] += dy_row[j] * xh_row[j];
                self.beta.grad[j] += dy_row[j];
                let dxh = dy_row[j] * self.gamma.value[j];
                sum_dxh[j] += dxh;
                sum_dxh_xh[j] += dxh * xh_row[j];
            }
        }

        let n = rows as f32;
        let mut d_x = vec![0.0; d_y.len()];
        for ((dx_row, dy_row), xh_row) in d_x
            .chunks_exact_mut(dim)
            .zip(d_y.chunks_exact(dim))
            .zip(cache.x_hat.chunks_exact(dim))
        {
            for j in 0..dim {
                let dxh = dy_row[j] * self.gamma.value[j];
                dx_row[j] = if cache.batch_stats {
                    cache.inv_std[j] / n * (n * dxh - sum_dxh[j] - xh_row[j] * sum_dxh_xh[j])
                } else {
                    dxh * cache.inv_std[j]
                };
            }
        }
        d_x
    }

    fn running_inv_std(&self) -> Vec<f32> {
        self.running_var
            .iter()
            .map(|v| 1.0 / (v + BATCH_NORM_EPS).sqrt())
            .collect()
    }
}

impl Parameterized for BatchNorm1d {
    fn visit_params(&mut self, f: &mut dyn FnMut(&mut Param)) {
        f(&mut self.gamma);
        f(&mut self.beta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_train_mode_normalizes_batch() {
        let mut bn = BatchNorm1d::new(2);
        let x = [1.0, 10.0, 3.0, 10.0, 5.0, 10.0];
        let (y, _) = bn.forward(&x, 3, Mode::Train);
        let col0: Vec<f32> = y.iter().step_by(2).copied().collect();
        let mean: f32 = col0.iter().sum::<f32>() / 3.0;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(col0[2], 1.2247, epsilon = 1e-3);
        // Constant column normalizes to zero.
        assert_abs_diff_eq!(y[1], 0.0, epsilon = 1e-6);

        // Running stats moved by momentum: mean 3, unbiased var 4.
        assert_abs_diff_eq!(bn.running_mean[0], 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(bn.running_var[0], 0.9 + 0.4, epsilon = 1e-6);
    }

    #[test]
    fn test_eval_mode_uses_running_stats() {
        let mut bn = BatchNorm1d::new(1);
        bn.running_mean = vec![2.0];
        bn.running_var = vec![4.0];
        let y = bn.forward_eval(&[4.0], 1);
        assert_abs_diff_eq!(y[0], 1.0, epsilon = 1e-4);
        let (y_cached, cache) = bn.forward(&[4.0, 0.0], 2, Mode::Eval);
        assert_abs_diff_eq!(y_cached[0], 1.0, epsilon = 1e-4);
        assert!(!cache.batch_stats);
        assert_eq!(bn.running_mean, vec![2.0]);
    }

    #[test]
    fn test_single_row_train_batch_uses_running_stats() {
        let mut bn = BatchNorm1d::new(1);
        let (y, cache) = bn.forward(&[3.0], 1, Mode::Train);
        assert!(!cache.batch_stats);
        assert_abs_diff_eq!(y[0], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_backward_matches_finite_differences() {
        let x = vec![0.3, -1.2, 2.0, 0.7, -0.4, 1.1, 0.9, 0.2];
        let w = [0.5f32, -1.0, 2.0, 0.25, 1.5, -0.5, 0.75, 1.0];
        let loss = |bn: &mut BatchNorm1d, x: &[f32]| -> f32 {
            let (y, _) = bn.forward(x, 4, Mode::Train);
            y.iter().zip(w.iter()).map(|(a, b)| a * b).sum()
        };
        let mut bn = BatchNorm1d::new(2);
        bn.gamma.value = vec![1.5, 0.8];
        let (_, cache) = bn.forward(&x, 4, Mode::Train);
        bn.zero_grad();
        let d_x = bn.backward(&cache, &w, 4);

        let eps = 1e-2;
        for i in 0..x.len() {
            let mut xp = x.clone();
            xp[i] += eps;
            let mut xm = x.clone();
            xm[i] -= eps;
            let numeric = (loss(&mut bn, &xp) - loss(&mut bn, &xm)) / (2.0 * eps);
            assert_abs_diff_eq!(d_x[i], numeric, epsilon = 2e-2);
        }
    }
}
