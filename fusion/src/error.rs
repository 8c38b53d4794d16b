use std::{error::Error, fmt, io, path::PathBuf};

use machine_learning::MlErr;
use ndarray_npy::ReadNpyError;

/// The fusion module's result type.
pub type Result<T> = std::result::Result<T, FusionErr>;

/// Failures while configuring, loading data for, or training the fusion model.
#[derive(Debug)]
pub enum FusionErr {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Config(serde_json::Error),
    InvalidConfig(String),
    Manifest {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    Npy {
        path: PathBuf,
        source: ReadNpyError,
    },
    SampleSize {
        path: PathBuf,
        got: usize,
        expected: usize,
    },
    Ml(MlErr),
}

impl FusionErr {
    pub(crate) fn manifest(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FusionErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FusionErr::Io { path, source } => {
                write!(f, "io error on '{}': {source}", path.display())
            }
            FusionErr::Config(e) => write!(f, "invalid config file: {e}"),
            FusionErr::InvalidConfig(reason) => write!(f, "invalid config: {reason}"),
            FusionErr::Manifest { path, line, reason } => {
                write!(f, "{}:{line}: {reason}", path.display())
            }
            FusionErr::Npy { path, source } => {
                write!(f, "can't read array '{}': {source}", path.display())
            }
            FusionErr::SampleSize {
                path,
                got,
                expected,
            } => write!(
                f,
                "array '{}' has {got} values, expected {expected}",
                path.display()
            ),
            FusionErr::Ml(e) => write!(f, "{e}"),
        }
    }
}

impl Error for FusionErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FusionErr::Io { source, .. } => Some(source),
            FusionErr::Config(e) => Some(e),
            FusionErr::Npy { source, .. } => Some(source),
            FusionErr::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for FusionErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<serde_json::Error> for FusionErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}

/// Boundary conversion for the `Sequence` trait, which reports machine learning errors.
impl From<FusionErr> for MlErr {
    fn from(value: FusionErr) -> Self {
        match value {
            FusionErr::Ml(e) => e,
            other => MlErr::dataset(other),
        }
    }
}
