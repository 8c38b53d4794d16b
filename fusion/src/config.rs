use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use machine_learning::{
    metrics::Metric,
    training::{CompileSpec, LossFnSpec, OptimizerSpec},
};
use serde::{Deserialize, Serialize};

use crate::{FusionErr, Result};

pub const DEFAULT_TRAIN_CSV: &str = "datasets/train.csv";
pub const DEFAULT_VAL_CSV: &str = "datasets/val.csv";
pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_EPOCHS: usize = 2;
pub const DEFAULT_LEARNING_RATE: f32 = 0.001;
pub const DEFAULT_NUM_CLASSES: usize = 300;
pub const DEFAULT_FUSION_UNITS: usize = 64;

/// The shape of a single sample of every modality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputShapes {
    pub face: Vec<usize>,
    pub palm_print: Vec<usize>,
    pub audio: Vec<usize>,
    pub signature: Vec<usize>,
}

impl Default for InputShapes {
    fn default() -> Self {
        Self {
            face: vec![224, 224, 3],
            palm_print: vec![90, 90, 1],
            audio: vec![9, 13, 1],
            signature: vec![1000, 5],
        }
    }
}

impl InputShapes {
    /// Returns the shapes in the order the model takes its inputs.
    pub fn ordered(&self) -> [(&'static str, &[usize]); 4] {
        [
            ("face", self.face.as_slice()),
            ("palm_print", self.palm_print.as_slice()),
            ("audio", self.audio.as_slice()),
            ("signature", self.signature.as_slice()),
        ]
    }
}

/// Configuration of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub train_csv: PathBuf,
    pub val_csv: PathBuf,
    pub batch_size: NonZeroUsize,
    pub epochs: NonZeroUsize,
    pub learning_rate: f32,
    pub loss: LossFnSpec,
    pub metrics: Vec<Metric>,
    pub num_classes: usize,
    pub fusion_units: usize,
    pub inputs: InputShapes,
    pub shuffle: bool,
    pub validate: bool,
    pub seed: Option<u64>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            train_csv: PathBuf::from(DEFAULT_TRAIN_CSV),
            val_csv: PathBuf::from(DEFAULT_VAL_CSV),
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            epochs: NonZeroUsize::new(DEFAULT_EPOCHS).unwrap_or(NonZeroUsize::MIN),
            learning_rate: DEFAULT_LEARNING_RATE,
            loss: LossFnSpec::CategoricalCrossentropy,
            metrics: vec![Metric::Accuracy],
            num_classes: DEFAULT_NUM_CLASSES,
            fusion_units: DEFAULT_FUSION_UNITS,
            inputs: InputShapes::default(),
            shuffle: true,
            validate: true,
            seed: None,
        }
    }
}

impl FusionConfig {
    /// Loads a configuration from a JSON file, missing fields take their default value.
    ///
    /// # Errors
    /// Returns an error if the file can't be read, parsed or holds invalid values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| FusionErr::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values serde can't.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(FusionErr::InvalidConfig(reason));

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.) {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if self.num_classes == 0 {
            return invalid("num_classes must be positive".into());
        }
        if self.fusion_units == 0 {
            return invalid("fusion_units must be positive".into());
        }

        for (name, shape) in self.inputs.ordered() {
            if shape.is_empty() || shape.contains(&0) {
                return invalid(format!("{name} shape {shape:?} has no values"));
            }
        }

        Ok(())
    }

    /// Returns the optimizer, loss and metrics the model is compiled with.
    pub fn compile_spec(&self) -> CompileSpec {
        CompileSpec {
            optimizer: OptimizerSpec::adam(self.learning_rate),
            loss: self.loss,
            metrics: self.metrics.clone(),
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_the_reference_run() {
        let config = FusionConfig::default();

        assert_eq!(config.batch_size.get(), 32);
        assert_eq!(config.epochs.get(), 2);
        assert_eq!(config.num_classes, 300);
        assert_eq!(config.train_csv, Path::new("datasets/train.csv"));
        assert_eq!(config.val_csv, Path::new("datasets/val.csv"));
        assert_eq!(config.inputs.face, [224, 224, 3]);
        assert_eq!(config.inputs.signature, [1000, 5]);

        let spec = config.compile_spec();
        assert_eq!(spec.optimizer, OptimizerSpec::adam(0.001));
        assert_eq!(spec.loss, LossFnSpec::CategoricalCrossentropy);
        assert_eq!(spec.metrics, [Metric::Accuracy]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "epochs": 5, "seed": 7, "inputs": {{ "audio": [4, 4, 1] }} }}"#
        )
        .unwrap();

        let config = FusionConfig::load(file.path()).unwrap();
        assert_eq!(config.epochs.get(), 5);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.inputs.audio, [4, 4, 1]);
        assert_eq!(config.inputs.face, [224, 224, 3]);
        assert_eq!(config.batch_size.get(), 32);
    }

    #[test]
    fn load_rejects_zero_batch_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "batch_size": 0 }}"#).unwrap();

        assert!(matches!(
            FusionConfig::load(file.path()),
            Err(FusionErr::Config(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let config = FusionConfig {
            learning_rate: -1.,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = FusionConfig::default();
        config.inputs.palm_print = vec![90, 0, 1];
        assert!(config.validate().is_err());
    }
}
