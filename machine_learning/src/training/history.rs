use crate::metrics::Metric;

/// The loss and metrics of a model over a whole sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub loss: f32,
    pub metrics: Vec<(Metric, f32)>,
}

impl Evaluation {
    /// Returns the value of a metric, if it was computed.
    pub fn metric(&self, metric: Metric) -> Option<f32> {
        self.metrics
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|&(_, value)| value)
    }
}

/// What happened during an epoch of training.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub train: Evaluation,
    pub validation: Option<Evaluation>,
}

/// The stats of every epoch of a `fit` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub epochs: Vec<EpochStats>,
}

impl History {
    /// Returns the training loss of every epoch.
    pub fn losses(&self) -> Vec<f32> {
        self.epochs.iter().map(|stats| stats.train.loss).collect()
    }

    pub fn last(&self) -> Option<&EpochStats> {
        self.epochs.last()
    }
}
