use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::Result;

/// Whether a forward pass is part of training or of inference.
///
/// Layers with batch dependent behaviour, like batch normalization, use the statistics of the
/// current batch while training and their running statistics otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Eval,
}

/// A differentiable model whose parameters live outside of it, in a flat buffer.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Returns the amount of input matrices the model takes.
    fn num_inputs(&self) -> usize;

    /// Samples an initial set of parameters following each layer's initializer.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// A buffer of exactly `size()` parameters.
    fn init_params<R>(&self, rng: &mut R) -> Result<Vec<f32>>
    where
        R: Rng + ?Sized;

    /// Makes a forward pass through the model.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `inputs` - One `(batch, features)` matrix per model input.
    /// * `phase` - Whether the pass is part of training.
    ///
    /// # Returns
    /// The model's prediction for the batch.
    fn forward(
        &mut self,
        params: &[f32],
        inputs: &[ArrayView2<'_, f32>],
        phase: Phase,
    ) -> Result<Array2<f32>>;

    /// Backpropagates the derivative of the loss with respect to the last forward pass' output,
    /// writing the gradient of every parameter into `grad`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters, the same ones given to `forward`.
    /// * `grad` - A buffer of `size()` values to write the gradient into.
    /// * `d` - The derivative of the loss with respect to the prediction.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()>;
}
