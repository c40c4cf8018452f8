use serde::{Deserialize, Serialize};

/// A trainable tensor with its accumulated gradient.
///
/// Gradients are not persisted; they are re-created on the first `zero_grad`
/// after loading a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub value: Vec<f32>,
    #[serde(skip)]
    pub grad: Vec<f32>,
}

impl Param {
    pub fn new(value: Vec<f32>) -> Self {
        let grad = vec![0.0; value.len()];
        Param { value, grad }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Reset the gradient to zero, sizing it to match the value.
    pub fn zero_grad(&mut self) {
        self.grad.clear();
        self.grad.resize(self.value.len(), 0.0);
    }

    /// Make sure the gradient buffer exists without clearing it.
    pub fn ensure_grad(&mut self) {
        if self.grad.len() != self.value.len() {
            self.zero_grad();
        }
    }
}

/// Anything owning trainable parameters.
///
/// Parameters must always be visited in the same order: optimizers key their
/// state by visit position.
pub trait Parameterized {
    fn visit_params(&mut self, f: &mut dyn FnMut(&mut Param));

    fn zero_grad(&mut self) {
        self.visit_params(&mut |p| p.zero_grad());
    }

    /// Total number of scalar parameters.
    fn num_params(&mut self) -> usize {
        let mut n = 0;
        self.visit_params(&mut |p| n += p.len());
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grad_is_rebuilt_after_deserialize() {
        let p = Param::new(vec![1.0, 2.0]);
        let json = serde_json::to_string(&p).unwrap();
        let mut q: Param = serde_json::from_str(&json).unwrap();
        assert!(q.grad.is_empty());
        q.ensure_grad();
        assert_eq!(q.grad, vec![0.0, 0.0]);
        q.grad[0] = 3.0;
        q.ensure_grad();
        assert_eq!(q.grad[0], 3.0);
        q.zero_grad();
        assert_eq!(q.grad[0], 0.0);
    }
}
