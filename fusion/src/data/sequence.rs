use std::{num::NonZeroUsize, path::Path};

use log::{debug, info};
use machine_learning::{
    MlErr,
    dataset::{Batch, Sequence},
};
use ndarray::{Array2, ArrayD};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use rayon::prelude::*;

use super::{Manifest, Record};
use crate::{FusionErr, Result, config::InputShapes};

/// Batches of the samples listed in a CSV manifest, labeled by person.
///
/// Arrays are read from disk every time a batch is requested, so the dataset doesn't need to fit
/// in memory.
#[derive(Debug)]
pub struct PersonIdSequence {
    manifest: Manifest,
    batch_size: NonZeroUsize,
    num_classes: usize,
    dims: [usize; 4],
    order: Vec<usize>,
    rng: Option<StdRng>,
}

impl PersonIdSequence {
    /// Opens the manifest at `csv`.
    ///
    /// # Arguments
    /// * `csv` - The manifest file.
    /// * `batch_size` - The amount of samples per batch, the last one may be smaller.
    /// * `num_classes` - The width of the one hot targets.
    /// * `shapes` - The shape of a sample of every input.
    /// * `shuffle` - Whether the samples are shuffled every epoch.
    /// * `seed` - Seeds the shuffling, taken from the OS when missing.
    pub fn open<P: AsRef<Path>>(
        csv: P,
        batch_size: NonZeroUsize,
        num_classes: usize,
        shapes: &InputShapes,
        shuffle: bool,
        seed: Option<u64>,
    ) -> Result<Self> {
        let manifest = Manifest::read(csv, num_classes)?;
        info!(
            "{}: {} samples",
            manifest.path().display(),
            manifest.len()
        );

        let dims: [usize; 4] = shapes.ordered().map(|(_, shape)| shape.iter().product());
        let mut order: Vec<usize> = (0..manifest.len()).collect();

        let rng = shuffle.then(|| {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            order.shuffle(&mut rng);
            rng
        });

        Ok(Self {
            manifest,
            batch_size,
            num_classes,
            dims,
            order,
            rng,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Returns the amount of samples.
    pub fn samples(&self) -> usize {
        self.order.len()
    }

    fn load_batch(&self, index: usize) -> Result<Batch> {
        let batch_size = self.batch_size.get();
        let start = index * batch_size;
        if start >= self.samples() {
            return Err(MlErr::SizeMismatch {
                what: "batch index",
                got: index,
                expected: Sequence::len(self),
            }
            .into());
        }

        let end = (start + batch_size).min(self.samples());
        let records: Vec<&Record> = self.order[start..end]
            .iter()
            .map(|&i| &self.manifest.records()[i])
            .collect();

        let samples = records
            .par_iter()
            .map(|record| self.load_sample(record))
            .collect::<Result<Vec<_>>>()?;

        let rows = samples.len();
        let mut inputs: Vec<Array2<f32>> = self
            .dims
            .iter()
            .map(|&dim| Array2::zeros((rows, dim)))
            .collect();

        for (row, sample) in samples.iter().enumerate() {
            for (input, values) in inputs.iter_mut().zip(sample) {
                input
                    .row_mut(row)
                    .iter_mut()
                    .zip(values)
                    .for_each(|(x, v)| *x = *v);
            }
        }

        let mut targets = Array2::zeros((rows, self.num_classes));
        for (row, record) in records.iter().enumerate() {
            targets[[row, record.person_id]] = 1.;
        }

        debug!("loaded batch {index} with {rows} samples");
        Ok(Batch::new(inputs, targets))
    }

    fn load_sample(&self, record: &Record) -> Result<Vec<Vec<f32>>> {
        record
            .paths
            .iter()
            .zip(self.dims)
            .map(|(path, dim)| read_flat(path, dim))
            .collect()
    }
}

/// Reads a `.npy` array of `f32`, flattened in row major order.
fn read_flat(path: &Path, expected: usize) -> Result<Vec<f32>> {
    let array: ArrayD<f32> = ndarray_npy::read_npy(path).map_err(|source| FusionErr::Npy {
        path: path.to_path_buf(),
        source,
    })?;

    if array.len() != expected {
        return Err(FusionErr::SampleSize {
            path: path.to_path_buf(),
            got: array.len(),
            expected,
        });
    }

    Ok(array.iter().copied().collect())
}

impl Sequence for PersonIdSequence {
    fn len(&self) -> usize {
        self.samples().div_ceil(self.batch_size.get())
    }

    fn get(&self, index: usize) -> machine_learning::Result<Batch> {
        Ok(self.load_batch(index)?)
    }

    fn on_epoch_end(&mut self) {
        if let Some(rng) = self.rng.as_mut() {
            self.order.shuffle(rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use ndarray::{ArrayD, IxDyn};
    use tempfile::TempDir;

    use super::*;

    fn shapes() -> InputShapes {
        InputShapes {
            face: vec![2, 2, 1],
            palm_print: vec![3],
            audio: vec![1, 2],
            signature: vec![2, 1],
        }
    }

    /// Writes `n` samples whose values are all equal to their index, labeled `index % 3`.
    fn write_dataset(dir: &Path, n: usize) -> PathBuf {
        let mut csv = String::from("face,palm_print,audio,signature,person_id\n");

        for i in 0..n {
            let mut row = Vec::new();
            for (name, shape) in shapes().ordered() {
                let file = format!("{name}_{i}.npy");
                let len = shape.iter().product();
                let array = ArrayD::from_shape_vec(IxDyn(shape), vec![i as f32; len]).unwrap();
                ndarray_npy::write_npy(dir.join(&file), &array).unwrap();
                row.push(file);
            }
            row.push((i % 3).to_string());
            csv.push_str(&row.join(","));
            csv.push('\n');
        }

        let path = dir.join("train.csv");
        fs::write(&path, csv).unwrap();
        path
    }

    fn open(path: &Path, batch_size: usize, shuffle: bool) -> PersonIdSequence {
        let batch_size = NonZeroUsize::new(batch_size).unwrap();
        PersonIdSequence::open(path, batch_size, 3, &shapes(), shuffle, Some(5)).unwrap()
    }

    #[test]
    fn batches_hold_every_input_and_one_hot_targets() {
        let dir = TempDir::new().unwrap();
        let seq = open(&write_dataset(dir.path(), 5), 2, false);

        assert_eq!(seq.len(), 3);

        let batch = seq.get(0).unwrap();
        assert_eq!(batch.inputs.len(), 4);
        assert_eq!(batch.inputs[0].dim(), (2, 4));
        assert_eq!(batch.inputs[1].dim(), (2, 3));
        assert_eq!(batch.inputs[2].dim(), (2, 2));
        assert_eq!(batch.inputs[3].dim(), (2, 2));
        assert!(batch.inputs[1].row(1).iter().all(|x| *x == 1.));
        assert_eq!(batch.targets, ndarray::array![[1., 0., 0.], [0., 1., 0.]]);

        let last = seq.get(2).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last.targets, ndarray::array![[0., 1., 0.]]);

        assert!(seq.get(3).is_err());
    }

    #[test]
    fn shuffling_keeps_samples_with_their_labels() {
        let dir = TempDir::new().unwrap();
        let mut seq = open(&write_dataset(dir.path(), 6), 6, true);
        seq.on_epoch_end();

        let batch = seq.get(0).unwrap();
        let mut seen = Vec::new();
        for (row, target) in batch.inputs[0].rows().into_iter().zip(batch.targets.rows()) {
            let i = row[0] as usize;
            assert_eq!(target[i % 3], 1.);
            seen.push(i);
        }

        seen.sort_unstable();
        assert_eq!(seen, [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn mis_sized_arrays_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(dir.path(), 2);

        let array = ArrayD::from_shape_vec(IxDyn(&[5]), vec![0f32; 5]).unwrap();
        ndarray_npy::write_npy(dir.path().join("audio_1.npy"), &array).unwrap();

        let seq = open(&path, 2, false);
        let err = seq.get(0).unwrap_err();
        assert!(err.to_string().contains("audio_1.npy"), "{err}");
    }

    #[test]
    fn missing_arrays_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(dir.path(), 1);
        fs::remove_file(dir.path().join("face_0.npy")).unwrap();

        assert!(open(&path, 1, false).get(0).is_err());
    }

    #[test]
    fn missing_manifest_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = PersonIdSequence::open(
            dir.path().join("val.csv"),
            NonZeroUsize::MIN,
            3,
            &shapes(),
            false,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, FusionErr::Io { .. }));
    }
}
