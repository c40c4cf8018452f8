use crate::nn::param::{Param, Parameterized};
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Fully connected layer, `y = W x + b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Linear {
    in_dim: usize,
    out_dim: usize,
    /// Row-major matrix with shape (out_dim, in_dim).
    pub weight: Param,
    pub bias: Param,
}

impl Linear {
    /// Weights and biases drawn from `U(-1/sqrt(in_dim), 1/sqrt(in_dim))`.
    pub fn new_with_rng(in_dim: usize, out_dim: usize, rng: &mut StdRng) -> Self {
        assert!(in_dim > 0 && out_dim > 0, "layer dimensions must be > 0");
        let bound = 1.0 / (in_dim as f32).sqrt();
        let weight = (0..in_dim * out_dim).map(|_| rng.gen_range(-bound..bound)).collect();
        let bias = (0..out_dim).map(|_| rng.gen_range(-bound..bound)).collect();
        Linear {
            in_dim,
            out_dim,
            weight: Param::new(weight),
            bias: Param::new(bias),
        }
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Forward pass for a batch of `rows` inputs.
    ///
    /// Shape contract:
    /// - `input.len() == rows * in_dim`
    /// - returns `rows * out_dim` values
    pub fn forward(&self, input: &[f32], rows: usize) -> Vec<f32> {
        assert_eq!(input.len(), rows * self.in_dim, "linear input shape");
        let (in_dim, out_dim) = (self.in_dim, self.out_dim);
        let w = &self.weight.value;
        let b = &self.bias.value;
        let mut output = vec![0.0; rows * out_dim];
        output
            .par_chunks_mut(out_dim)
            .zip(input.par_chunks(in_dim))
            .for_each(|(out_row, in_row)| {
                for o in 0..out_dim {
                    let row = &w[o * in_dim..(o + 1) * in_dim];
                    let mut sum = b[o];
                    for i in 0..in_dim {
                        sum = row[i].mul_add(in_row[i], sum);
                    }
                    out_row[o] = sum;
                }
            });
        output
    }

    /// Backward pass for a batch.
    ///
    /// Gradients are *accumulated* into `weight.grad` and `bias.grad`; call
    /// `zero_grad` between optimizer steps. Returns `dL/d(input)`.
    ///
    /// * `input` - the same input passed to `forward`.
    /// * `d_output` - upstream gradient, `rows * out_dim` values.
    pub fn backward(&mut self, input: &[f32], d_output: &[f32], rows: usize) -> Vec<f32> {
        assert_eq!(input.len(), rows * self.in_dim, "linear input shape");
        assert_eq!(d_output.len(), rows * self.out_dim, "linear upstream gradient shape");
        let (in_dim, out_dim) = (self.in_dim, self.out_dim);
        self.weight.ensure_grad();
        self.bias.ensure_grad();

        self.weight
            .grad
            .par_chunks_mut(in_dim)
            .zip(self.bias.grad.par_iter_mut())
            .enumerate()
            .for_each(|(o, (gw, gb))| {
                for r in 0..rows {
                    let d = d_output[r * out_dim + o];
                    if d == 0.0 {
                        continue;
                    }
                    *gb += d;
                    let in_row = &input[r * in_dim..(r + 1) * in_dim];
                    for i in 0..in_dim {
                        gw[i] = d.mul_add(in_row[i], gw[i]);
                    }
                }
            });

        let w = &self.weight.value;
        let mut d_input = vec![0.0; rows * in_dim];
        d_input
            .par_chunks_mut(in_dim)
            .zip(d_output.par_chunks(out_dim))
            .for_each(|(d_in_row, d_out_row)| {
                for o in 0..out_dim {
                    let d = d_out_row[o];
                    if d == 0.0 {
                        continue;
                    }
                    let row = &w[o * in_dim..(o + 1) * in_dim];
                    for i in 0..in_dim {
                        d_in_row[i] = row[i].mul_add(d, d_in_row[i]);
                    }
                }
            });
        d_input
    }
}

impl Parameterized for Linear {
    fn visit_params(&mut self, f: &mut dyn FnMut(&mut Param)) {
        f(&mut self.weight);
        f(&mut self.bias);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    fn layer() -> Linear {
        let mut rng = StdRng::seed_from_u64(0);
        let mut l = Linear::new_with_rng(2, 2, &mut rng);
        l.weight.value = vec![1.0, 2.0, -1.0, 0.5];
        l.bias.value = vec![0.1, -0.2];
        l
    }

    #[test]
    fn test_init_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut l = Linear::new_with_rng(16, 4, &mut rng);
        assert!(l.weight.value.iter().all(|w| w.abs() <= 0.25));
        assert!(l.bias.value.iter().all(|b| b.abs() <= 0.25));
        assert_eq!(l.num_params(), 16 * 4 + 4);
    }

    #[test]
    fn test_forward() {
        let l = layer();
        let y = l.forward(&[1.0, 1.0, 2.0, 0.0], 2);
        for (a, b) in y.iter().zip([3.1, -0.7, 2.1, -2.2]) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_backward_accumulates() {
        let mut l = layer();
        l.zero_grad();
        let x = [1.0, 1.0, 2.0, 0.0];
        let d_in = l.backward(&x, &[1.0, 0.0, 0.0, 1.0], 2);
        // Row 0 only reaches output 0, row 1 only output 1.
        assert_eq!(l.weight.grad, vec![1.0, 1.0, 2.0, 0.0]);
        assert_eq!(l.bias.grad, vec![1.0, 1.0]);
        assert_eq!(d_in, vec![1.0, 2.0, -1.0, 0.5]);

        l.backward(&x, &[1.0, 0.0, 0.0, 1.0], 2);
        assert_eq!(l.bias.grad, vec![2.0, 2.0]);
    }
}
