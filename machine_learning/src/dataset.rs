use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{MlErr, Result};

/// A batch of samples, one matrix per model input plus the expected outputs.
#[derive(Debug, Clone)]
pub struct Batch {
    pub inputs: Vec<Array2<f32>>,
    pub targets: Array2<f32>,
}

impl Batch {
    pub fn new(inputs: Vec<Array2<f32>>, targets: Array2<f32>) -> Self {
        Self { inputs, targets }
    }

    /// Returns the amount of samples in the batch.
    pub fn len(&self) -> usize {
        self.targets.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows every input matrix.
    pub fn input_views(&self) -> Vec<ArrayView2<'_, f32>> {
        self.inputs.iter().map(|x| x.view()).collect()
    }
}

/// A source of batches addressed by index, iterated once per epoch.
pub trait Sequence {
    /// Returns the amount of batches in an epoch.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads the `index`-th batch of the epoch.
    ///
    /// # Arguments
    /// * `index` - A batch index lower than `len()`.
    fn get(&self, index: usize) -> Result<Batch>;

    /// Called once every batch of an epoch was consumed.
    fn on_epoch_end(&mut self) {}
}

/// An in-memory dataset of single input samples.
///
/// Every row of `data` holds `x_size` input values followed by `y_size` target values.
#[derive(Debug, Clone)]
pub struct Dataset {
    data: Vec<f32>,
    x_size: usize,
    y_size: usize,
    order: Vec<usize>,
    batch_size: NonZeroUsize,
    rng: Option<StdRng>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `data` - The samples, row by row.
    /// * `x_size` - The amount of input values per row.
    /// * `y_size` - The amount of target values per row.
    /// * `batch_size` - The amount of samples per batch.
    ///
    /// # Returns
    /// An error if `data` can't be split in rows of `x_size + y_size` values.
    pub fn new(
        data: Vec<f32>,
        x_size: usize,
        y_size: usize,
        batch_size: NonZeroUsize,
    ) -> Result<Self> {
        let row_size = x_size + y_size;
        if row_size == 0 || data.len() % row_size != 0 {
            return Err(MlErr::SizeMismatch {
                what: "dataset rows",
                got: data.len(),
                expected: row_size,
            });
        }

        let order = (0..data.len() / row_size).collect();

        Ok(Self {
            data,
            x_size,
            y_size,
            order,
            batch_size,
            rng: None,
        })
    }

    /// Shuffles the samples at the end of every epoch, using a random number generator seeded
    /// from `seed`.
    pub fn shuffled(mut self, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        self.order.shuffle(&mut rng);
        self.rng = Some(rng);
        self
    }

    /// Returns the amount of samples.
    pub fn samples(&self) -> usize {
        self.order.len()
    }

    /// Reorders the samples randomly.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
    }

    fn rows(&self) -> Result<ArrayView2<'_, f32>> {
        let row_size = self.x_size + self.y_size;
        Ok(ArrayView2::from_shape((self.samples(), row_size), &self.data)?)
    }
}

impl Sequence for Dataset {
    fn len(&self) -> usize {
        self.samples().div_ceil(self.batch_size.get())
    }

    fn get(&self, index: usize) -> Result<Batch> {
        let batch_size = self.batch_size.get();
        let start = index * batch_size;
        if start >= self.samples() {
            return Err(MlErr::SizeMismatch {
                what: "batch index",
                got: index,
                expected: self.len(),
            });
        }

        let end = (start + batch_size).min(self.samples());
        let rows = self.rows()?.select(Axis(0), &self.order[start..end]);
        let (x, y) = rows.view().split_at(Axis(1), self.x_size);

        Ok(Batch::new(vec![x.to_owned()], y.to_owned()))
    }

    fn on_epoch_end(&mut self) {
        if let Some(rng) = self.rng.as_mut() {
            self.order.shuffle(rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn dataset(batch_size: usize) -> Dataset {
        let data = vec![
            0., 0., 0., //
            0., 1., 1., //
            1., 0., 1., //
            1., 1., 0., //
            2., 2., 2., //
        ];
        Dataset::new(data, 2, 1, NonZeroUsize::new(batch_size).unwrap()).unwrap()
    }

    #[test]
    fn batches_cover_every_sample_once() {
        let ds = dataset(2);
        assert_eq!(ds.len(), 3);

        let first = ds.get(0).unwrap();
        assert_eq!(first.inputs[0], array![[0., 0.], [0., 1.]]);
        assert_eq!(first.targets, array![[0.], [1.]]);

        let last = ds.get(2).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last.inputs[0], array![[2., 2.]]);

        assert!(ds.get(3).is_err());
    }

    #[test]
    fn rejects_ragged_data() {
        let batch_size = NonZeroUsize::new(1).unwrap();
        assert!(Dataset::new(vec![1., 2., 3., 4.], 2, 1, batch_size).is_err());
    }

    #[test]
    fn shuffling_keeps_rows_together() {
        let mut ds = dataset(5).shuffled(3);
        ds.on_epoch_end();

        let batch = ds.get(0).unwrap();
        let mut targets: Vec<f32> = batch.targets.iter().copied().collect();
        targets.sort_by(f32::total_cmp);
        assert_eq!(targets, [0., 0., 1., 1., 2.]);

        for (x, y) in batch.inputs[0].rows().into_iter().zip(batch.targets.rows()) {
            let expected = if x[0] == 2. { 2. } else { (x[0] as u8 ^ x[1] as u8) as f32 };
            assert_eq!(y[0], expected);
        }
    }
}
