use crate::Result;

/// An optimization algorithm, decides how the parameters move given their gradient.
pub trait Optimizer: Send {
    /// Updates the parameters according to the algorithm's learning rule.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient of the loss with respect to `params`.
    ///
    /// # Returns
    /// An error if `params` and `grad` differ in length or the optimizer holds state for a
    /// different amount of parameters.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;

    /// Returns the learning rate of the optimizer.
    fn learning_rate(&self) -> f32;
}

impl<T: Optimizer + ?Sized> Optimizer for Box<T> {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        (**self).update_params(params, grad)
    }

    fn learning_rate(&self) -> f32 {
        (**self).learning_rate()
    }
}
