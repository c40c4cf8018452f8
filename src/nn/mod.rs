//! Neural network building blocks
//!
//! Only the pieces a weak learner needs: dense layers, batch normalization,
//! the two rectifier activations and an Adam optimizer. Every layer has an
//! explicit forward pass that returns a cache, and a backward pass that
//! consumes it, accumulates parameter gradients and returns the input gradient.
//!
//! All buffers are row-major `(rows, dim)` flat `f32` slices.

pub mod activation;
pub mod batch_norm;
pub mod linear;
pub mod optim;
pub mod param;

pub use activation::Activation;
pub use batch_norm::{BatchNorm1d, BatchNormCache};
pub use linear::Linear;
pub use optim::Adam;
pub use param::{Param, Parameterized};

use serde::{Deserialize, Serialize};

/// Whether batch normalization uses batch statistics (and updates its running
/// statistics) or the stored running statistics.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}
