use rayon::prelude::*;

use super::Optimizer;
use crate::{MlErr, Result};

pub const DEFAULT_BETA1: f32 = 0.9;
pub const DEFAULT_BETA2: f32 = 0.999;
pub const DEFAULT_EPSILON: f32 = 1e-7;

/// Adam optimization algorithm, keeps bias corrected running averages of the gradient and its
/// square for every parameter.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    v: Box<[f32]>,
    s: Box<[f32]>,
    epsilon: f32,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            v: vec![0.; len].into_boxed_slice(),
            s: vec![0.; len].into_boxed_slice(),
            epsilon,
        }
    }

    /// Creates a new `Adam` optimizer with the usual `beta1`, `beta2` and `epsilon`.
    pub fn with_learning_rate(len: usize, learning_rate: f32) -> Self {
        Self::new(
            len,
            learning_rate,
            DEFAULT_BETA1,
            DEFAULT_BETA2,
            DEFAULT_EPSILON,
        )
    }

    pub fn hyperparams(&self) -> (f32, f32, f32) {
        (self.beta1, self.beta2, self.epsilon)
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        if grad.len() != params.len() || params.len() != self.v.len() {
            return Err(MlErr::SizeMismatch {
                what: "adam state",
                got: params.len(),
                expected: self.v.len(),
            });
        }

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        params
            .par_iter_mut()
            .zip(grad.par_iter())
            .zip(self.v.par_iter_mut())
            .zip(self.s.par_iter_mut())
            .for_each(|(((p, g), v), s)| {
                *v = b1 * *v + (1. - b1) * g;
                *s = b2 * *s + (1. - b2) * g.powi(2);
                *p -= step_size * *v / (s.sqrt() + eps);
            });

        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_each_param_by_the_learning_rate() {
        let mut params = [1.0, 1.0, 1.0];
        let mut adam = Adam::with_learning_rate(3, 0.001);

        adam.update_params(&mut params, &[0.5, -2.0, 0.0]).unwrap();

        assert!((params[0] - 0.999).abs() < 1e-5);
        assert!((params[1] - 1.001).abs() < 1e-5);
        assert_eq!(params[2], 1.0);
    }

    #[test]
    fn minimizes_a_quadratic() {
        let mut params = [3.0, -4.0];
        let mut adam = Adam::with_learning_rate(2, 0.1);

        for _ in 0..500 {
            let grad = [2.0 * params[0], 2.0 * params[1]];
            adam.update_params(&mut params, &grad).unwrap();
        }

        assert!(params[0].abs() < 0.05, "{params:?}");
        assert!(params[1].abs() < 0.05, "{params:?}");
    }

    #[test]
    fn rejects_params_of_another_size() {
        let mut params = [1.0; 4];
        let mut adam = Adam::with_learning_rate(3, 0.1);
        assert!(adam.update_params(&mut params, &[0.0; 4]).is_err());
    }
}
