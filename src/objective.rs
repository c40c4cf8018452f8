//! Objectives
//!
//! Pseudo-residual targets for the weak learners, the squared stage loss they
//! are fit with, and the binary cross entropy used by the corrective step.
use crate::data::Dataset;
use crate::errors::GrowNetError;
use crate::utils::{fast_f64_sum, items_to_strings, sigmoid};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Largest exponent fed to `exp` when building second order targets, keeping
/// them finite in single precision.
const MAX_EXPONENT: f32 = 80.0;

/// Which approximation of the loss gradient the next learner is fit to.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub enum ModelOrder {
    /// `y / (1 + exp(y F))`
    First,
    /// `y (1 + exp(-y F))`
    #[default]
    Second,
}

impl FromStr for ModelOrder {
    type Err = GrowNetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(ModelOrder::First),
            "second" => Ok(ModelOrder::Second),
            _ => Err(GrowNetError::ParseString(
                s.to_string(),
                "ModelOrder".to_string(),
                items_to_strings(vec!["first", "second"]),
            )),
        }
    }
}

impl ModelOrder {
    #[inline]
    pub fn target(self, y: f32, yhat: f32) -> f32 {
        match self {
            ModelOrder::First => y / (1.0 + (y * yhat).min(MAX_EXPONENT).exp()),
            ModelOrder::Second => y * (1.0 + (-y * yhat).min(MAX_EXPONENT).exp()),
        }
    }
}

/// Per-row gradient direction for labels `y` in `{-1, 1}` and ensemble scores `yhat`.
pub fn grad_direction(y: &[f32], yhat: &[f32], order: ModelOrder) -> Vec<f32> {
    assert_eq!(y.len(), yhat.len(), "labels and scores must have the same length");
    y.par_iter().zip(yhat).map(|(y_, f_)| order.target(*y_, *f_)).collect()
}

/// Squared error between the scaled learner output and its target,
/// `mean((boost_rate * out - target)^2)`.
///
/// Returns the loss and its gradient w.r.t. each `out`.
pub fn stage_loss(boost_rate: f32, out: &[f32], target: &[f32]) -> (f64, Vec<f32>) {
    assert_eq!(out.len(), target.len(), "outputs and targets must have the same length");
    let n = out.len() as f32;
    let mut total = 0f64;
    let d_out = out
        .iter()
        .zip(target)
        .map(|(o, g)| {
            let r = boost_rate * o - g;
            total += (r as f64) * (r as f64);
            2.0 * boost_rate * r / n
        })
        .collect();
    (total / out.len() as f64, d_out)
}

/// Binary cross entropy on logits.
#[derive(Default)]
pub struct LogLoss {}

impl LogLoss {
    /// Per-row loss for targets in `{0, 1}`, stable for large logits.
    #[inline]
    pub fn row_loss(t: f32, logit: f32) -> f32 {
        logit.max(0.0) - logit * t + (-logit.abs()).exp().ln_1p()
    }

    /// Weighted mean loss `sum(w l) / sum(w)` and its gradient w.r.t. each logit.
    /// Without weights every row counts once.
    pub fn calc_loss_grad(t: &[f32], logits: &[f32], sample_weight: Option<&[f32]>) -> (f64, Vec<f32>) {
        assert_eq!(t.len(), logits.len(), "targets and logits must have the same length");
        let w_sum = match sample_weight {
            Some(w) => fast_f64_sum(w),
            None => t.len() as f64,
        };
        let weight = |i: usize| sample_weight.map_or(1.0, |w| w[i]);
        let mut total = 0f64;
        let grad = t
            .iter()
            .zip(logits)
            .enumerate()
            .map(|(i, (t_, f_))| {
                let w_ = weight(i);
                total += (w_ * Self::row_loss(*t_, *f_)) as f64;
                (w_ as f64 * (sigmoid(*f_) - t_) as f64 / w_sum) as f32
            })
            .collect();
        (total / w_sum, grad)
    }

    /// Initial score: log odds of the positive class over training row counts.
    pub fn calc_init(data: &Dataset) -> Result<f64, GrowNetError> {
        let (positive, negative) = data.class_counts();
        if positive == 0 || negative == 0 {
            return Err(GrowNetError::InvalidData(format!(
                "both classes are required, found {} positive and {} negative rows",
                positive, negative
            )));
        }
        Ok((positive as f64 / negative as f64).ln())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_model_order_from_str() {
        assert_eq!("first".parse::<ModelOrder>().unwrap(), ModelOrder::First);
        assert_eq!("second".parse::<ModelOrder>().unwrap(), ModelOrder::Second);
        assert!("third".parse::<ModelOrder>().is_err());
    }

    #[test]
    fn test_grad_direction_at_zero() {
        let y = vec![1.0, -1.0];
        let f = vec![0.0, 0.0];
        assert_eq!(grad_direction(&y, &f, ModelOrder::First), vec![0.5, -0.5]);
        assert_eq!(grad_direction(&y, &f, ModelOrder::Second), vec![2.0, -2.0]);
    }

    #[test]
    fn test_grad_direction_shrinks_when_confident() {
        let g = grad_direction(&[1.0, 1.0], &[0.0, 3.0], ModelOrder::First);
        assert!(g[1] < g[0]);
        assert_abs_diff_eq!(g[1], 1.0 / (1.0 + 3f32.exp()), epsilon = 1e-6);
        // Badly wrong scores stay finite.
        let g = grad_direction(&[1.0], &[-500.0], ModelOrder::Second);
        assert!(g[0].is_finite());
    }

    #[test]
    fn test_stage_loss() {
        let (loss, d) = stage_loss(0.5, &[2.0, 0.0], &[1.0, 1.0]);
        // residuals 0 and -1
        assert_abs_diff_eq!(loss, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(d[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(d[1], -0.5, epsilon = 1e-7);
    }

    #[test]
    fn test_log_loss_matches_naive_form() {
        let t = [1.0, 0.0, 1.0];
        let f = [0.3, -1.2, 2.5];
        let (loss, _) = LogLoss::calc_loss_grad(&t, &f, None);
        let naive: f64 = t
            .iter()
            .zip(f.iter())
            .map(|(t_, f_): (&f32, &f32)| {
                let p = 1.0 / (1.0 + (-*f_ as f64).exp());
                -(*t_ as f64 * p.ln() + (1.0 - *t_ as f64) * (1.0 - p).ln())
            })
            .sum::<f64>()
            / 3.0;
        assert_abs_diff_eq!(loss, naive, epsilon = 1e-6);
        assert!(LogLoss::row_loss(1.0, 200.0).is_finite());
        assert!(LogLoss::row_loss(0.0, 200.0).is_finite());
    }

    #[test]
    fn test_log_loss_weighted_gradient() {
        let (_, g) = LogLoss::calc_loss_grad(&[1.0, 0.0], &[0.0, 0.0], Some(&[3.0, 1.0]));
        assert_abs_diff_eq!(g[0], 3.0 * -0.5 / 4.0, epsilon = 1e-7);
        assert_abs_diff_eq!(g[1], 0.5 / 4.0, epsilon = 1e-7);
    }

    #[test]
    fn test_calc_init() {
        let data = Dataset::new(vec![0.0; 4], vec![1.0, 1.0, 1.0, -1.0], 1).unwrap();
        assert_abs_diff_eq!(LogLoss::calc_init(&data).unwrap(), 3f64.ln(), epsilon = 1e-12);
        let one_class = Dataset::new(vec![0.0; 2], vec![1.0, 1.0], 1).unwrap();
        assert!(LogLoss::calc_init(&one_class).is_err());
    }
}
