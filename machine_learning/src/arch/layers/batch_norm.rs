use ndarray::prelude::*;
use rand::Rng;

use super::check_width;
use crate::{MlErr, Result, arch::Phase, initialization::WeightGen};

pub const DEFAULT_MOMENTUM: f32 = 0.99;
pub const DEFAULT_EPSILON: f32 = 1e-3;

/// Batch normalization over the feature axis, `gamma * (x - mean) / sqrt(var + eps) + beta`.
///
/// The parameters are `gamma` followed by `beta`. The running mean and variance are not trained,
/// they are tracked by the layer itself and used outside of training.
#[derive(Debug, Clone)]
pub struct BatchNorm {
    dim: usize,
    momentum: f32,
    epsilon: f32,
    running_mean: Array1<f32>,
    running_var: Array1<f32>,

    // Forward metadata
    x_hat: Array2<f32>,
    inv_std: Array1<f32>,
    phase: Phase,
}

impl BatchNorm {
    pub fn new(dim: usize) -> Self {
        Self::with_hyperparams(dim, DEFAULT_MOMENTUM, DEFAULT_EPSILON)
    }

    /// Creates a new `BatchNorm` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of features.
    /// * `momentum` - How much of the running statistics is kept on each training batch.
    /// * `epsilon` - Added to the variance to avoid dividing by zero.
    pub fn with_hyperparams(dim: usize, momentum: f32, epsilon: f32) -> Self {
        Self {
            dim,
            momentum,
            epsilon,
            running_mean: Array1::zeros(dim),
            running_var: Array1::ones(dim),
            x_hat: Array2::zeros((0, dim)),
            inv_std: Array1::zeros(dim),
            phase: Phase::Eval,
        }
    }

    pub fn size(&self) -> usize {
        2 * self.dim
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn running_mean(&self) -> ArrayView1<'_, f32> {
        self.running_mean.view()
    }

    pub fn running_var(&self) -> ArrayView1<'_, f32> {
        self.running_var.view()
    }

    /// Ones for `gamma`, zeros for `beta`.
    pub fn init<R>(&self, rng: &mut R) -> Result<Vec<f32>>
    where
        R: Rng + ?Sized,
    {
        let mut params = WeightGen::Const(1.).sample(rng, self.dim)?;
        params.extend(WeightGen::Const(0.).sample(rng, self.dim)?);
        Ok(params)
    }

    pub fn forward(
        &mut self,
        params: &[f32],
        x: ArrayView2<f32>,
        phase: Phase,
    ) -> Result<Array2<f32>> {
        check_width("batch norm input", x, self.dim)?;
        let (gamma, beta) = self.view_params(params)?;

        let (mean, var) = match phase {
            Phase::Train if x.nrows() > 0 => {
                let mean = x.sum_axis(Axis(0)) / x.nrows() as f32;
                let var = x.var_axis(Axis(0), 0.);

                let m = self.momentum;
                self.running_mean = &self.running_mean * m + &mean * (1. - m);
                self.running_var = &self.running_var * m + &var * (1. - m);

                (mean, var)
            }
            _ => (self.running_mean.clone(), self.running_var.clone()),
        };

        let eps = self.epsilon;
        self.inv_std = var.mapv(|v| 1. / (v + eps).sqrt());
        self.x_hat = (&x - &mean) * &self.inv_std;
        self.phase = phase;

        Ok(&self.x_hat * &gamma + &beta)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if d.dim() != self.x_hat.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "batch norm delta",
                got: d.dim(),
                expected: self.x_hat.dim(),
            });
        }

        let (gamma, _) = self.view_params(params)?;
        let (mut dgamma, mut dbeta) = self.view_grad(grad)?;

        dgamma.assign(&(&d * &self.x_hat).sum_axis(Axis(0)));
        dbeta.assign(&d.sum_axis(Axis(0)));

        let dx_hat = &d * &gamma;

        // With running statistics the normalization is an affine map of x.
        if self.phase == Phase::Eval || d.nrows() == 0 {
            return Ok(dx_hat * &self.inv_std);
        }

        let n = d.nrows() as f32;
        let sum_dx_hat = dx_hat.sum_axis(Axis(0));
        let sum_dx_hat_x_hat = (&dx_hat * &self.x_hat).sum_axis(Axis(0));

        let dx = (dx_hat * n - &sum_dx_hat - &self.x_hat * &sum_dx_hat_x_hat) * &self.inv_std / n;
        Ok(dx)
    }

    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView1<'a, f32>, ArrayView1<'a, f32>)> {
        if params.len() != self.size() {
            return Err(MlErr::SizeMismatch {
                what: "batch norm parameters",
                got: params.len(),
                expected: self.size(),
            });
        }

        let (gamma, beta) = params.split_at(self.dim);
        Ok((ArrayView1::from(gamma), ArrayView1::from(beta)))
    }

    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut1<'a, f32>, ArrayViewMut1<'a, f32>)> {
        if grad.len() != self.size() {
            return Err(MlErr::SizeMismatch {
                what: "batch norm gradient",
                got: grad.len(),
                expected: self.size(),
            });
        }

        let (dgamma, dbeta) = grad.split_at_mut(self.dim);
        Ok((ArrayViewMut1::from(dgamma), ArrayViewMut1::from(dbeta)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_params(dim: usize) -> Vec<f32> {
        let mut params = vec![1.; dim];
        params.extend(vec![0.; dim]);
        params
    }

    #[test]
    fn training_forward_normalizes_each_feature() {
        let mut bn = BatchNorm::with_hyperparams(2, 0.99, 0.);
        let x = array![[1., 10.], [3., 30.]];

        let y = bn.forward(&identity_params(2), x.view(), Phase::Train).unwrap();
        assert_eq!(y, array![[-1., -1.], [1., 1.]]);
    }

    #[test]
    fn training_updates_running_statistics() {
        let mut bn = BatchNorm::new(1);
        let x = array![[1.], [3.]];

        bn.forward(&identity_params(1), x.view(), Phase::Train).unwrap();

        assert!((bn.running_mean()[0] - 0.02).abs() < 1e-6);
        assert!((bn.running_var()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn eval_uses_running_statistics() {
        let mut bn = BatchNorm::with_hyperparams(1, 0.99, 0.);
        let x = array![[4.], [-2.]];

        let y = bn.forward(&[2., 1.], x.view(), Phase::Eval).unwrap();
        assert_eq!(y, array![[9.], [-3.]]);
    }

    #[test]
    fn gamma_and_beta_gradients() {
        let mut bn = BatchNorm::with_hyperparams(1, 0.99, 0.);
        let x = array![[1.], [3.]];
        let params = [2., 0.5];
        bn.forward(&params, x.view(), Phase::Train).unwrap();

        let mut grad = [0.; 2];
        bn.backward(&params, &mut grad, array![[1.], [3.]]).unwrap();

        // x_hat = [-1, 1]
        assert_eq!(grad, [2., 4.]);
    }

    #[test]
    fn backward_matches_finite_differences() {
        let x = array![[0.5, -1.0], [1.5, 2.0], [-0.5, 0.3], [2.0, -0.7]];
        let r = array![[1.0, -0.3], [0.2, 0.8], [-0.6, 0.1], [0.4, 0.5]];
        let params = [1.3, 0.7, 0.1, -0.2];

        // L = Σ r · y
        let loss = |x: &Array2<f32>| {
            let mut bn = BatchNorm::new(2);
            let y = bn.forward(&params, x.view(), Phase::Train).unwrap();
            (&y * &r).sum()
        };

        let mut bn = BatchNorm::new(2);
        bn.forward(&params, x.view(), Phase::Train).unwrap();
        let mut grad = [0.; 4];
        let dx = bn.backward(&params, &mut grad, r.clone()).unwrap();

        let h = 1e-2;
        for i in 0..x.nrows() {
            for j in 0..x.ncols() {
                let mut plus = x.clone();
                plus[[i, j]] += h;
                let mut minus = x.clone();
                minus[[i, j]] -= h;

                let numeric = (loss(&plus) - loss(&minus)) / (2. * h);
                assert!(
                    (numeric - dx[[i, j]]).abs() < 1e-2,
                    "({i}, {j}): numeric {numeric}, analytic {}",
                    dx[[i, j]]
                );
            }
        }
    }
}
