//! Optimizers.
//!
//! Adam with coupled L2 weight decay: the decay term is added to the gradient
//! before the moment updates. Optimizer *state* lives outside the model and is
//! keyed by the order in which [`Parameterized::visit_params`] yields
//! parameters, so one `Adam` must always be used with the same model.

use crate::constants::{ADAM_BETA1, ADAM_BETA2, ADAM_EPS};
use crate::errors::GrowNetError;
use crate::nn::param::Parameterized;
use crate::utils::{validate_float_parameter, validate_positive_float_parameter};

#[derive(Debug, Clone)]
pub struct Adam {
    lr: f32,
    weight_decay: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    t: u64,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
}

impl Adam {
    /// Adam with the default betas `(0.9, 0.999)` and eps `1e-8`.
    pub fn new(lr: f32, weight_decay: f32) -> Result<Self, GrowNetError> {
        validate_positive_float_parameter(lr as f64, "lr")?;
        validate_float_parameter(weight_decay as f64, 0.0, f64::INFINITY, "weight_decay")?;
        Ok(Adam {
            lr,
            weight_decay,
            beta1: ADAM_BETA1,
            beta2: ADAM_BETA2,
            eps: ADAM_EPS,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        })
    }

    pub fn lr(&self) -> f32 {
        self.lr
    }

    pub fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    /// Apply one update to every parameter of `model` from its accumulated gradients.
    pub fn step<M: Parameterized + ?Sized>(&mut self, model: &mut M) {
        self.t += 1;
        let (lr, wd, beta1, beta2, eps) = (self.lr, self.weight_decay, self.beta1, self.beta2, self.eps);
        let corr1 = 1.0 - beta1.powi(self.t as i32);
        let corr2 = 1.0 - beta2.powi(self.t as i32);
        let step_size = lr / corr1;
        let corr2_sqrt = corr2.sqrt();

        let m_state = &mut self.m;
        let v_state = &mut self.v;
        let mut idx = 0;
        model.visit_params(&mut |p| {
            p.ensure_grad();
            if m_state.len() <= idx {
                m_state.push(vec![0.0; p.len()]);
                v_state.push(vec![0.0; p.len()]);
            }
            let m = &mut m_state[idx];
            let v = &mut v_state[idx];
            debug_assert_eq!(m.len(), p.len());
            for i in 0..p.value.len() {
                let g = p.grad[i] + wd * p.value[i];
                m[i] = beta1 * m[i] + (1.0 - beta1) * g;
                v[i] = beta2 * v[i] + (1.0 - beta2) * g * g;
                let denom = v[i].sqrt() / corr2_sqrt + eps;
                p.value[i] -= step_size * m[i] / denom;
            }
            idx += 1;
        });
    }
}
