use std::fmt;

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// A metric reported while training, next to the loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Fraction of rows whose highest prediction matches the highest target.
    Accuracy,
}

impl Metric {
    /// Computes the metric over a batch.
    ///
    /// # Arguments
    /// * `y_pred` - The model's prediction.
    /// * `y` - The expected output.
    pub fn compute(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        match self {
            Metric::Accuracy => categorical_accuracy(y_pred, y),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn categorical_accuracy(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
    if y_pred.nrows() == 0 {
        return 0.;
    }

    let hits = y_pred
        .rows()
        .into_iter()
        .zip(y.rows())
        .filter(|(p, t)| argmax(*p) == argmax(*t))
        .count();

    hits as f32 / y_pred.nrows() as f32
}

/// Index of the first maximum of a row.
pub fn argmax(row: ArrayView1<f32>) -> Option<usize> {
    row.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, max)) if max >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn accuracy_counts_matching_argmaxes() {
        let y_pred = array![[0.7, 0.2, 0.1], [0.1, 0.1, 0.8], [0.3, 0.4, 0.3], [0.9, 0.05, 0.05]];
        let y = array![[1., 0., 0.], [0., 0., 1.], [1., 0., 0.], [0., 1., 0.]];

        assert_eq!(Metric::Accuracy.compute(y_pred.view(), y.view()), 0.5);
    }

    #[test]
    fn argmax_picks_the_first_maximum() {
        assert_eq!(argmax(array![1., 3., 3.].view()), Some(1));
        assert_eq!(argmax(ArrayView1::from(&[] as &[f32])), None);
    }

    #[test]
    fn deserializes_from_its_name() {
        let metrics: Vec<Metric> = serde_json::from_str(r#"["accuracy"]"#).unwrap();
        assert_eq!(metrics, [Metric::Accuracy]);
        assert_eq!(Metric::Accuracy.to_string(), "accuracy");
    }
}
