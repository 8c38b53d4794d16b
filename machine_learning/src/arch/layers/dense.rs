use ndarray::prelude::*;
use rand::Rng;

use super::check_width;
use crate::{MlErr, Result, arch::activations::ActFn, initialization::WeightGen};

/// A fully connected layer, `act_fn(x · W + b)`.
///
/// Its parameters are laid out as the `(in, out)` weights in row-major order followed by the
/// `out` biases.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of input and output units.
    /// * `act_fn` - An optional activation applied to the output.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: Array2::zeros((0, dim.0)),
            z: Array2::zeros((0, dim.1)),
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Glorot uniform weights and zeroed biases.
    pub fn init<R>(&self, rng: &mut R) -> Result<Vec<f32>>
    where
        R: Rng + ?Sized,
    {
        let (fan_in, fan_out) = self.dim;
        let mut params = WeightGen::XavierUniform { fan_in, fan_out }.sample(rng, fan_in * fan_out)?;
        params.extend(WeightGen::Const(0.).sample(rng, fan_out)?);
        Ok(params)
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_width("dense input", x, self.dim.0)?;
        let (w, b) = self.view_params(params)?;

        self.z = x.dot(&w) + &b;
        self.x = x.to_owned();

        let Some(act_fn) = self.act_fn else {
            return Ok(self.z.clone());
        };

        Ok(self.z.mapv(|z| act_fn.f(z)))
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if d.dim() != self.z.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "dense delta",
                got: d.dim(),
                expected: self.z.dim(),
            });
        }

        if let Some(act_fn) = self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        dw.assign(&self.x.t().dot(&d));
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        if grad.len() != self.size {
            return Err(MlErr::SizeMismatch {
                what: "dense gradient",
                got: grad.len(),
                expected: self.size,
            });
        }

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        if params.len() != self.size {
            return Err(MlErr::SizeMismatch {
                what: "dense parameters",
                got: params.len(),
                expected: self.size,
            });
        }

        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size])?;
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..])?;
        Ok((weights, biases))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // w = [[1, 2], [3, 4], [5, 6]], b = [0.5, -0.5]
    const PARAMS: [f32; 8] = [1., 2., 3., 4., 5., 6., 0.5, -0.5];

    #[test]
    fn forward_computes_affine_map() {
        let mut dense = Dense::new((3, 2), None);
        let x = array![[1., 0., -1.], [0., 1., 0.]];

        let y = dense.forward(&PARAMS, x.view()).unwrap();
        assert_eq!(y, array![[-3.5, -4.5], [3.5, 3.5]]);
    }

    #[test]
    fn forward_applies_activation() {
        let mut dense = Dense::new((3, 2), Some(ActFn::relu()));
        let x = array![[1., 0., -1.]];

        let y = dense.forward(&PARAMS, x.view()).unwrap();
        assert_eq!(y, array![[0., 0.]]);
    }

    #[test]
    fn backward_writes_weight_and_bias_gradients() {
        let mut dense = Dense::new((3, 2), None);
        let x = array![[1., 2., 3.], [-1., 0., 1.]];
        dense.forward(&PARAMS, x.view()).unwrap();

        let mut grad = [0.; 8];
        let d = array![[1., 0.], [0., 1.]];
        let dx = dense.backward(&PARAMS, &mut grad, d).unwrap();

        // dW = xᵀ · d, db = Σ d, dx = d · Wᵀ
        assert_eq!(grad, [1., -1., 2., 0., 3., 1., 1., 1.]);
        assert_eq!(dx, array![[1., 3., 5.], [2., 4., 6.]]);
    }

    #[test]
    fn rejects_inputs_of_the_wrong_width() {
        let mut dense = Dense::new((3, 2), None);
        let x = array![[1., 2.]];
        assert!(dense.forward(&PARAMS, x.view()).is_err());
    }

    #[test]
    fn init_zeroes_the_biases() {
        let dense = Dense::new((3, 2), None);
        let params = dense.init(&mut rand::rng()).unwrap();

        assert_eq!(params.len(), dense.size());
        assert_eq!(&params[6..], [0., 0.]);
    }
}
