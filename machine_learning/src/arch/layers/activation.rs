use ndarray::{Array2, ArrayView2};

use super::check_width;
use crate::{MlErr, Result, arch::activations::ActFn};

/// A parameterless layer applying an activation function elementwise.
#[derive(Debug, Clone)]
pub struct Activation {
    dim: usize,
    act_fn: ActFn,
    z: Array2<f32>,
}

impl Activation {
    pub fn new(dim: usize, act_fn: ActFn) -> Self {
        Self {
            dim,
            act_fn,
            z: Array2::zeros((0, dim)),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn forward(&mut self, z: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_width("activation input", z, self.dim)?;

        let act_fn = self.act_fn;
        self.z = z.to_owned();
        Ok(z.mapv(|z| act_fn.f(z)))
    }

    pub fn backward(&mut self, mut d: Array2<f32>) -> Result<Array2<f32>> {
        if d.dim() != self.z.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "activation delta",
                got: d.dim(),
                expected: self.z.dim(),
            });
        }

        let act_fn = self.act_fn;
        d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        Ok(d)
    }
}
