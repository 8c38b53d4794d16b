use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Model, Phase, layers::Layer};
use crate::{
    MlErr, Result,
    param_manager::{BackIter, FrontIter},
};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance, or an error if a layer's input doesn't match the previous
    /// layer's output.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();

        if layers.is_empty() {
            return Err(MlErr::InvalidLayer("a sequential needs at least one layer".into()));
        }

        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].output_dim() != pair[1].input_dim() {
                return Err(MlErr::InvalidLayer(format!(
                    "layer {} outputs {} features but layer {} takes {}",
                    i,
                    pair[0].output_dim(),
                    i + 1,
                    pair[1].input_dim()
                )));
            }
        }

        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, Layer::input_dim)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, Layer::output_dim)
    }

    /// Makes a forward pass through the network, taking the parameters of every layer from
    /// `front`.
    ///
    /// # Arguments
    /// * `front` - The iterator over the parameters, positioned at this model's first layer.
    /// * `x` - The input data.
    /// * `phase` - Whether the pass is part of training.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward_from(
        &mut self,
        front: &mut FrontIter<'_>,
        x: ArrayView2<f32>,
        phase: Phase,
    ) -> Result<Array2<f32>> {
        let mut layers = self.layers.iter_mut();
        let Some(first) = layers.next() else {
            return Ok(x.to_owned());
        };

        let params = front.next(first.size())?;
        let mut y = first.forward(params, x, phase)?;

        for layer in layers {
            let params = front.next(layer.size())?;
            y = layer.forward(params, y.view(), phase)?;
        }

        Ok(y)
    }

    /// Backpropagates `d` through the network, taking the parameters and gradient of every layer
    /// from `back`.
    ///
    /// # Arguments
    /// * `back` - The iterator over the parameters, positioned at this model's last layer.
    /// * `d` - The derivative of the loss with respect to this model's output.
    ///
    /// # Returns
    /// The derivative of the loss with respect to this model's input.
    pub fn backward_from(&mut self, back: &mut BackIter<'_>, mut d: Array2<f32>) -> Result<Array2<f32>> {
        for layer in self.layers.iter_mut().rev() {
            let (params, grad) = back.next(layer.size())?;
            d = layer.backward(params, grad, d)?;
        }

        Ok(d)
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn init_params<R>(&self, rng: &mut R) -> Result<Vec<f32>>
    where
        R: Rng + ?Sized,
    {
        let mut params = Vec::with_capacity(self.size());
        for layer in &self.layers {
            params.extend(layer.init(rng)?);
        }

        Ok(params)
    }

    fn forward(
        &mut self,
        params: &[f32],
        inputs: &[ArrayView2<'_, f32>],
        phase: Phase,
    ) -> Result<Array2<f32>> {
        let [x] = inputs else {
            return Err(MlErr::InputCountMismatch {
                got: inputs.len(),
                expected: 1,
            });
        };

        let mut front = FrontIter::new(params);
        let y = self.forward_from(&mut front, x.view(), phase)?;
        front.finish()?;
        Ok(y)
    }

    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()> {
        let mut back = BackIter::new(params, grad)?;
        self.backward_from(&mut back, d)?;
        back.finish()
    }
}
