use log::debug;
use rand::{SeedableRng, rngs::StdRng};

use super::{CompileSpec, LossFnSpec, OptimizerSpec, Trainer};
use crate::{
    Result,
    arch::{
        Model,
        loss::{CategoricalCrossentropy, LossFn, Mse},
    },
    optimization::{Adam, GradientDescent, Optimizer},
};

/// The trainer built by `TrainerBuilder`, with the optimizer and loss chosen at runtime.
pub type BoxedTrainer<M> = Trainer<M, Box<dyn Optimizer>, Box<dyn LossFn>>;

/// Builds `Trainer`s given a specification.
#[derive(Debug, Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `Trainer` following a spec, initializing the model's parameters.
    ///
    /// # Arguments
    /// * `model` - The model to train.
    /// * `spec` - The specification for the trainer.
    ///
    /// # Returns
    /// The trainer or an error if the parameters couldn't be initialized.
    pub fn build<M: Model>(&self, model: M, spec: &CompileSpec) -> Result<BoxedTrainer<M>> {
        let mut rng = self.generate_rng(spec.seed);
        let params = model.init_params(&mut rng)?;
        debug!("initialized {} parameters", params.len());

        let optimizer = self.resolve_optimizer(spec.optimizer, params.len());
        let loss_fn = self.resolve_loss(spec.loss);

        Trainer::new(model, params, optimizer, loss_fn, spec.clone())
    }

    fn resolve_optimizer(&self, spec: OptimizerSpec, len: usize) -> Box<dyn Optimizer> {
        match spec {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Box::new(Adam::new(len, learning_rate, beta1, beta2, epsilon)),
            OptimizerSpec::GradientDescent { learning_rate } => {
                Box::new(GradientDescent::new(learning_rate))
            }
        }
    }

    fn resolve_loss(&self, spec: LossFnSpec) -> Box<dyn LossFn> {
        match spec {
            LossFnSpec::Mse => Box::new(Mse::new()),
            LossFnSpec::CategoricalCrossentropy => Box::new(CategoricalCrossentropy::new()),
        }
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
