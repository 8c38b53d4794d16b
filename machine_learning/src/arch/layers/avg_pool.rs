use ndarray::{Array2, ArrayView2};

use super::check_width;
use crate::{MlErr, Result};

/// Non-overlapping average pooling over images flattened row-major as `(height, width, channels)`.
///
/// Windows that don't fit entirely inside the image are dropped, so the output has
/// `(height / ph, width / pw, channels)` values per row.
#[derive(Debug, Clone)]
pub struct AvgPool2d {
    shape: (usize, usize, usize),
    pool: (usize, usize),
    batch: usize,
}

impl AvgPool2d {
    /// Creates a new `AvgPool2d` layer.
    ///
    /// # Arguments
    /// * `shape` - The `(height, width, channels)` of the input images.
    /// * `pool` - The `(height, width)` of the pooling windows.
    ///
    /// # Returns
    /// An error if a window is empty or bigger than the image.
    pub fn new(shape: (usize, usize, usize), pool: (usize, usize)) -> Result<Self> {
        let (h, w, c) = shape;
        let (ph, pw) = pool;

        if ph == 0 || pw == 0 || ph > h || pw > w || c == 0 {
            return Err(MlErr::InvalidLayer(format!(
                "can't pool {shape:?} images with {pool:?} windows"
            )));
        }

        Ok(Self {
            shape,
            pool,
            batch: 0,
        })
    }

    pub fn input_dim(&self) -> usize {
        let (h, w, c) = self.shape;
        h * w * c
    }

    pub fn output_shape(&self) -> (usize, usize, usize) {
        let (h, w, c) = self.shape;
        let (ph, pw) = self.pool;
        (h / ph, w / pw, c)
    }

    pub fn output_dim(&self) -> usize {
        let (oh, ow, c) = self.output_shape();
        oh * ow * c
    }

    pub fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_width("pooling input", x, self.input_dim())?;

        let (_, w, c) = self.shape;
        let (ph, pw) = self.pool;
        let (oh, ow, _) = self.output_shape();
        let scale = 1. / (ph * pw) as f32;

        let mut out = Array2::zeros((x.nrows(), self.output_dim()));
        for (x_row, mut out_row) in x.rows().into_iter().zip(out.rows_mut()) {
            for i in 0..oh * ph {
                for j in 0..ow * pw {
                    for k in 0..c {
                        let o = ((i / ph) * ow + j / pw) * c + k;
                        out_row[o] += x_row[(i * w + j) * c + k] * scale;
                    }
                }
            }
        }

        self.batch = x.nrows();
        Ok(out)
    }

    pub fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>> {
        let expected = (self.batch, self.output_dim());
        if d.dim() != expected {
            return Err(MlErr::ShapeMismatch {
                what: "pooling delta",
                got: d.dim(),
                expected,
            });
        }

        let (_, w, c) = self.shape;
        let (ph, pw) = self.pool;
        let (oh, ow, _) = self.output_shape();
        let scale = 1. / (ph * pw) as f32;

        let mut dx = Array2::zeros((d.nrows(), self.input_dim()));
        for (d_row, mut dx_row) in d.rows().into_iter().zip(dx.rows_mut()) {
            for i in 0..oh * ph {
                for j in 0..ow * pw {
                    for k in 0..c {
                        let o = ((i / ph) * ow + j / pw) * c + k;
                        dx_row[(i * w + j) * c + k] = d_row[o] * scale;
                    }
                }
            }
        }

        Ok(dx)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn averages_each_window_per_channel() {
        // 2x4 image with 2 channels, channel 1 is channel 0 negated.
        let x = array![[
            1., -1., 2., -2., 3., -3., 4., -4., //
            5., -5., 6., -6., 7., -7., 8., -8.,
        ]];
        let mut pool = AvgPool2d::new((2, 4, 2), (2, 2)).unwrap();

        let y = pool.forward(x.view()).unwrap();
        assert_eq!(y, array![[3.5, -3.5, 5.5, -5.5]]);
    }

    #[test]
    fn drops_incomplete_windows() {
        let x = array![[1., 2., 3., 4., 5., 6., 7., 8., 9.]];
        let mut pool = AvgPool2d::new((3, 3, 1), (2, 2)).unwrap();

        let y = pool.forward(x.view()).unwrap();
        assert_eq!(y, array![[3.]]);

        let dx = pool.backward(array![[4.]]).unwrap();
        assert_eq!(dx, array![[1., 1., 0., 1., 1., 0., 0., 0., 0.]]);
    }

    #[test]
    fn rejects_windows_bigger_than_the_image() {
        assert!(AvgPool2d::new((2, 2, 1), (3, 1)).is_err());
    }
}
