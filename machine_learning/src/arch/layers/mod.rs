mod activation;
mod avg_pool;
mod batch_norm;
mod dense;
mod layer;
mod softmax;

pub use activation::Activation;
pub use avg_pool::AvgPool2d;
pub use batch_norm::BatchNorm;
pub use dense::Dense;
pub use layer::Layer;
pub use softmax::Softmax;

use ndarray::ArrayView2;

use crate::{MlErr, Result};

fn check_width(what: &'static str, x: ArrayView2<f32>, expected: usize) -> Result<()> {
    if x.ncols() != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got: x.ncols(),
            expected,
        });
    }

    Ok(())
}
