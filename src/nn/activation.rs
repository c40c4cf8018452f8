//! Activation functions.
//!
//! The weak learners apply activations element-wise and keep the
//! *post-activation* output in their cache. The backward pass computes
//! `dL/dz` from `dL/dy` using that output, so no pre-activation buffer is kept.

use crate::errors::GrowNetError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Element-wise activation function.
pub enum Activation {
    ReLU,
    LeakyReLU { alpha: f32 },
}

impl Activation {
    /// Validate activation parameters.
    pub fn validate(self) -> Result<(), GrowNetError> {
        match self {
            Activation::LeakyReLU { alpha } => {
                if !(alpha.is_finite() && alpha > 0.0) {
                    return Err(GrowNetError::InvalidParameter(
                        "alpha".to_string(),
                        "a finite value > 0".to_string(),
                        alpha.to_string(),
                    ));
                }
            }
            Activation::ReLU => {}
        }
        Ok(())
    }

    #[inline]
    pub fn forward(self, x: f32) -> f32 {
        match self {
            Activation::ReLU => x.max(0.0),
            Activation::LeakyReLU { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
        }
    }

    /// Derivative of the activation expressed in terms of the output `y`.
    #[inline]
    pub fn grad_from_output(self, y: f32) -> f32 {
        match self {
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU { alpha } => {
                if y > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
        }
    }

    pub fn forward_slice(self, x: &[f32]) -> Vec<f32> {
        x.iter().map(|v| self.forward(*v)).collect()
    }

    /// Gradient w.r.t. the activation input, given its output and `dL/dy`.
    pub fn backward_slice(self, y: &[f32], d_y: &[f32]) -> Vec<f32> {
        debug_assert_eq!(y.len(), d_y.len());
        y.iter().zip(d_y).map(|(y_, d_)| self.grad_from_output(*y_) * d_).collect()
    }
}
