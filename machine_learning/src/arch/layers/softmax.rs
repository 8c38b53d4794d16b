use ndarray::{Array2, ArrayView2, Zip};

use super::check_width;
use crate::{MlErr, Result};

/// Turns every row into a probability distribution, `exp(z_i) / Σ exp(z_j)`.
///
/// Probabilities are floored at `f32::MIN_POSITIVE` so that a loss dividing by them still
/// backpropagates through classes whose exponential underflowed.
#[derive(Debug, Clone)]
pub struct Softmax {
    dim: usize,
    s: Array2<f32>,
}

impl Softmax {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            s: Array2::zeros((0, dim)),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn forward(&mut self, z: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_width("softmax input", z, self.dim)?;

        let mut s = z.to_owned();
        for mut row in s.rows_mut() {
            let max = row.fold(f32::NEG_INFINITY, |acc, &z| acc.max(z));
            row.mapv_inplace(|z| (z - max).exp());
            let sum = row.sum();
            row /= sum;
            row.mapv_inplace(|s| s.max(f32::MIN_POSITIVE));
        }

        self.s = s.clone();
        Ok(s)
    }

    /// Multiplies `d` by the softmax jacobian, row by row: `s ⊙ (d - <d, s>)`.
    pub fn backward(&mut self, mut d: Array2<f32>) -> Result<Array2<f32>> {
        if d.dim() != self.s.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "softmax delta",
                got: d.dim(),
                expected: self.s.dim(),
            });
        }

        Zip::from(d.rows_mut())
            .and(self.s.rows())
            .for_each(|mut d_row, s_row| {
                let dot = d_row.dot(&s_row);
                d_row.zip_mut_with(&s_row, |d, &s| *d = s * (*d - dot));
            });

        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn rows_sum_to_one() {
        let mut softmax = Softmax::new(3);
        let z = array![[1., 2., 3.], [1000., 1000., 1000.]];

        let s = softmax.forward(z.view()).unwrap();

        for row in s.rows() {
            assert!((row.sum() - 1.).abs() < 1e-6);
        }
        assert!(s[[0, 2]] > s[[0, 1]] && s[[0, 1]] > s[[0, 0]]);
        assert!((s[[1, 0]] - 1. / 3.).abs() < 1e-6);
    }

    #[test]
    fn backward_matches_finite_differences() {
        let z = array![[0.3, -1.2, 2.0, 0.1]];
        let r = array![[1.0, 0.5, -0.25, 2.0]];

        let loss = |z: &Array2<f32>| {
            let s = Softmax::new(4).forward(z.view()).unwrap();
            (&s * &r).sum()
        };

        let mut softmax = Softmax::new(4);
        softmax.forward(z.view()).unwrap();
        let dz = softmax.backward(r.clone()).unwrap();

        let h = 1e-2;
        for j in 0..4 {
            let mut plus = z.clone();
            plus[[0, j]] += h;
            let mut minus = z.clone();
            minus[[0, j]] -= h;

            let numeric = (loss(&plus) - loss(&minus)) / (2. * h);
            assert!((numeric - dz[[0, j]]).abs() < 1e-3, "{j}: {numeric} vs {}", dz[[0, j]]);
        }
    }
}
