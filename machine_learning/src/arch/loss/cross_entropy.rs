use ndarray::{Array2, ArrayView2, Axis, Zip};

use super::LossFn;

/// Predictions are clipped to `[EPSILON, 1 - EPSILON]` before taking their logarithm. The
/// derivative isn't clipped, a softmax in front of this loss turns it back into `s - y`.
pub const EPSILON: f32 = 1e-7;

/// Categorical cross-entropy, `-Σ y · ln(y_pred)` averaged over the batch.
///
/// Expects one-hot (or any probability distribution) targets and predictions that are already
/// probabilities, usually the output of a softmax.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoricalCrossentropy;

impl CategoricalCrossentropy {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for CategoricalCrossentropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let batch = y_pred.len_of(Axis(0));
        if batch == 0 {
            return 0.;
        }

        let total = Zip::from(&y_pred)
            .and(&y)
            .fold(0., |acc, &p, &t| acc - t * p.clamp(EPSILON, 1. - EPSILON).ln());

        total / batch as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let batch = y_pred.len_of(Axis(0)).max(1) as f32;

        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &t| -t / (p.max(f32::MIN_POSITIVE) * batch))
    }
}
