use std::num::NonZeroUsize;

use log::{debug, info};
use ndarray::{Array2, ArrayView2};

use super::{CompileSpec, EpochStats, Evaluation, History};
use crate::{
    MlErr, Result,
    arch::{Model, Phase, loss::LossFn},
    dataset::{Batch, Sequence},
    metrics::Metric,
    optimization::Optimizer,
    param_manager::ParamManager,
};

/// A model `Trainer`. Contains the relevant components needed for training a model, including
/// the model itself and its parameters.
pub struct Trainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    model: M,
    param_manager: ParamManager,
    optimizer: O,
    loss_fn: L,
    spec: CompileSpec,
}

impl<M, O, L> Trainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    /// Returns a new `Trainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `params` - The model's initial parameters.
    /// * `optimizer` - The optimizer used on every batch.
    /// * `loss_fn` - Measures the difference between a model's output and the expected one.
    /// * `spec` - The spec the other components were built from.
    ///
    /// # Returns
    /// An error if `params` doesn't hold exactly the model's amount of parameters.
    pub fn new(model: M, params: Vec<f32>, optimizer: O, loss_fn: L, spec: CompileSpec) -> Result<Self> {
        if params.len() != model.size() {
            return Err(MlErr::SizeMismatch {
                what: "model parameters",
                got: params.len(),
                expected: model.size(),
            });
        }

        Ok(Self {
            model,
            param_manager: ParamManager::new(params),
            optimizer,
            loss_fn,
            spec,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn params(&self) -> &[f32] {
        self.param_manager.params()
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// Returns the spec this trainer was compiled with.
    pub fn spec(&self) -> &CompileSpec {
        &self.spec
    }

    /// Trains the model for `epochs` passes over `train`.
    ///
    /// # Arguments
    /// * `train` - The training batches.
    /// * `epochs` - The amount of passes over `train`.
    /// * `validation` - Batches evaluated at the end of every epoch.
    ///
    /// # Returns
    /// The loss and metrics of every epoch.
    pub fn fit<S>(
        &mut self,
        train: &mut S,
        epochs: NonZeroUsize,
        validation: Option<&dyn Sequence>,
    ) -> Result<History>
    where
        S: Sequence + ?Sized,
    {
        if train.is_empty() {
            return Err(MlErr::EmptySequence("training"));
        }

        let epochs = epochs.get();
        let nbatches = train.len();
        let mut history = History::default();

        for epoch in 1..=epochs {
            let mut running = Running::new(self.spec.metrics.len());

            for i in 0..nbatches {
                let batch = train.get(i)?;
                let stats = self.train_batch(&batch)?;
                debug!(
                    "epoch {epoch}/{epochs} batch {}/{nbatches}: loss {:.4}",
                    i + 1,
                    stats.loss
                );
                running.push(&stats, batch.len());
            }

            train.on_epoch_end();

            let stats = EpochStats {
                epoch,
                train: running.finish(&self.spec.metrics),
                validation: validation.map(|seq| self.evaluate(seq)).transpose()?,
            };

            info!("epoch {epoch}/{epochs}: {}", describe(&stats));
            history.epochs.push(stats);
        }

        Ok(history)
    }

    /// Computes the loss and metrics of the model over a whole sequence, without training.
    pub fn evaluate<S>(&mut self, sequence: &S) -> Result<Evaluation>
    where
        S: Sequence + ?Sized,
    {
        if sequence.is_empty() {
            return Err(MlErr::EmptySequence("evaluation"));
        }

        let mut running = Running::new(self.spec.metrics.len());

        for i in 0..sequence.len() {
            let batch = sequence.get(i)?;
            let y_pred = self.predict(&batch.input_views())?;
            check_targets(&y_pred, &batch.targets)?;

            let stats = self.measure(y_pred.view(), batch.targets.view());
            running.push(&stats, batch.len());
        }

        Ok(running.finish(&self.spec.metrics))
    }

    /// Runs the model in inference mode.
    ///
    /// # Arguments
    /// * `inputs` - One matrix per model input.
    pub fn predict(&mut self, inputs: &[ArrayView2<'_, f32>]) -> Result<Array2<f32>> {
        self.model
            .forward(self.param_manager.params(), inputs, Phase::Eval)
    }

    /// Makes a single optimization step over a batch.
    ///
    /// # Returns
    /// The loss and metrics of the batch, measured before the step.
    pub fn train_batch(&mut self, batch: &Batch) -> Result<Evaluation> {
        let inputs = batch.input_views();

        self.param_manager.zero_grad();
        let y_pred = self
            .model
            .forward(self.param_manager.params(), &inputs, Phase::Train)?;
        check_targets(&y_pred, &batch.targets)?;

        let stats = self.measure(y_pred.view(), batch.targets.view());
        let d = self.loss_fn.loss_prime(y_pred.view(), batch.targets.view());

        let (params, grad) = self.param_manager.split_mut();
        self.model.backward(params, grad, d)?;
        self.param_manager.optimize(&mut self.optimizer)?;

        Ok(stats)
    }

    fn measure(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Evaluation {
        Evaluation {
            loss: self.loss_fn.loss(y_pred, y),
            metrics: self
                .spec
                .metrics
                .iter()
                .map(|metric| (*metric, metric.compute(y_pred, y)))
                .collect(),
        }
    }
}

fn check_targets(y_pred: &Array2<f32>, y: &Array2<f32>) -> Result<()> {
    if y_pred.dim() != y.dim() {
        return Err(MlErr::ShapeMismatch {
            what: "targets",
            got: y.dim(),
            expected: y_pred.dim(),
        });
    }

    Ok(())
}

fn describe(stats: &EpochStats) -> String {
    let mut line = format!("loss {:.4}", stats.train.loss);

    for (metric, value) in &stats.train.metrics {
        line.push_str(&format!(" {metric} {value:.4}"));
    }

    if let Some(validation) = &stats.validation {
        line.push_str(&format!(" val_loss {:.4}", validation.loss));
        for (metric, value) in &validation.metrics {
            line.push_str(&format!(" val_{metric} {value:.4}"));
        }
    }

    line
}

/// Sample weighted averages of the loss and metrics over many batches.
struct Running {
    loss: f32,
    metrics: Vec<f32>,
    samples: usize,
}

impl Running {
    fn new(nmetrics: usize) -> Self {
        Self {
            loss: 0.,
            metrics: vec![0.; nmetrics],
            samples: 0,
        }
    }

    fn push(&mut self, stats: &Evaluation, samples: usize) {
        let weight = samples as f32;
        self.loss += stats.loss * weight;
        for (acc, (_, value)) in self.metrics.iter_mut().zip(&stats.metrics) {
            *acc += value * weight;
        }
        self.samples += samples;
    }

    fn finish(self, metrics: &[Metric]) -> Evaluation {
        let total = self.samples.max(1) as f32;

        Evaluation {
            loss: self.loss / total,
            metrics: metrics
                .iter()
                .copied()
                .zip(self.metrics.into_iter().map(|value| value / total))
                .collect(),
        }
    }
}
