use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Activation, AvgPool2d, BatchNorm, Dense, Softmax};
use crate::{
    Result,
    arch::{Phase, activations::ActFn},
};

#[derive(Debug, Clone)]
pub enum Layer {
    Dense(Dense),
    BatchNorm(BatchNorm),
    Activation(Activation),
    Softmax(Softmax),
    AvgPool2d(AvgPool2d),
}

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    pub fn batch_norm(dim: usize) -> Self {
        Self::BatchNorm(BatchNorm::new(dim))
    }

    pub fn relu(dim: usize) -> Self {
        Self::Activation(Activation::new(dim, ActFn::relu()))
    }

    pub fn softmax(dim: usize) -> Self {
        Self::Softmax(Softmax::new(dim))
    }

    pub fn avg_pool_2d(shape: (usize, usize, usize), pool: (usize, usize)) -> Result<Self> {
        Ok(Self::AvgPool2d(AvgPool2d::new(shape, pool)?))
    }

    /// Returns the amount of trainable parameters of the layer.
    pub fn size(&self) -> usize {
        match self {
            Self::Dense(l) => l.size(),
            Self::BatchNorm(l) => l.size(),
            Self::Activation(_) | Self::Softmax(_) | Self::AvgPool2d(_) => 0,
        }
    }

    /// Returns the amount of features each input row must have.
    pub fn input_dim(&self) -> usize {
        match self {
            Self::Dense(l) => l.dim().0,
            Self::BatchNorm(l) => l.dim(),
            Self::Activation(l) => l.dim(),
            Self::Softmax(l) => l.dim(),
            Self::AvgPool2d(l) => l.input_dim(),
        }
    }

    /// Returns the amount of features of each output row.
    pub fn output_dim(&self) -> usize {
        match self {
            Self::Dense(l) => l.dim().1,
            Self::BatchNorm(l) => l.dim(),
            Self::Activation(l) => l.dim(),
            Self::Softmax(l) => l.dim(),
            Self::AvgPool2d(l) => l.output_dim(),
        }
    }

    pub fn init<R>(&self, rng: &mut R) -> Result<Vec<f32>>
    where
        R: Rng + ?Sized,
    {
        match self {
            Self::Dense(l) => l.init(rng),
            Self::BatchNorm(l) => l.init(rng),
            Self::Activation(_) | Self::Softmax(_) | Self::AvgPool2d(_) => Ok(Vec::new()),
        }
    }

    pub fn forward(
        &mut self,
        params: &[f32],
        x: ArrayView2<f32>,
        phase: Phase,
    ) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.forward(params, x),
            Self::BatchNorm(l) => l.forward(params, x, phase),
            Self::Activation(l) => l.forward(x),
            Self::Softmax(l) => l.forward(x),
            Self::AvgPool2d(l) => l.forward(x),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.backward(params, grad, d),
            Self::BatchNorm(l) => l.backward(params, grad, d),
            Self::Activation(l) => l.backward(d),
            Self::Softmax(l) => l.backward(d),
            Self::AvgPool2d(l) => l.backward(d),
        }
    }
}
