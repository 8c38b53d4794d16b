use serde::{Deserialize, Serialize};

use crate::{
    metrics::Metric,
    optimization::adam::{DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_EPSILON},
};

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Adam {
        learning_rate: f32,
        #[serde(default = "default_beta1")]
        beta1: f32,
        #[serde(default = "default_beta2")]
        beta2: f32,
        #[serde(default = "default_epsilon")]
        epsilon: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
}

impl OptimizerSpec {
    /// Adam with the usual `beta1`, `beta2` and `epsilon`.
    pub fn adam(learning_rate: f32) -> Self {
        Self::Adam {
            learning_rate,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
        }
    }

    pub fn learning_rate(&self) -> f32 {
        match *self {
            Self::Adam { learning_rate, .. } | Self::GradientDescent { learning_rate } => {
                learning_rate
            }
        }
    }
}

fn default_beta1() -> f32 {
    DEFAULT_BETA1
}

fn default_beta2() -> f32 {
    DEFAULT_BETA2
}

fn default_epsilon() -> f32 {
    DEFAULT_EPSILON
}

/// The specification for the `LossFn` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFnSpec {
    Mse,
    CategoricalCrossentropy,
}

/// Everything needed to turn a model into a `Trainer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileSpec {
    pub optimizer: OptimizerSpec,
    pub loss: LossFnSpec,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub seed: Option<u64>,
}
