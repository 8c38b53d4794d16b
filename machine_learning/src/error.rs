use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    ShapeMismatch {
        what: &'static str,
        got: (usize, usize),
        expected: (usize, usize),
    },
    InputCountMismatch {
        got: usize,
        expected: usize,
    },
    InvalidInit(String),
    InvalidLayer(String),
    EmptySequence(&'static str),
    Dataset(Box<dyn Error + Send + Sync>),
}

impl MlErr {
    /// Wraps an error produced by a `Sequence` implementation.
    ///
    /// # Arguments
    /// * `err` - The underlying data loading error.
    pub fn dataset<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Dataset(Box::new(err))
    }
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a shape mismatch in {what}, got {got:?} and expected {expected:?}"
            ),
            MlErr::InputCountMismatch { got, expected } => {
                write!(f, "The model takes {expected} inputs but was given {got}")
            }
            MlErr::InvalidInit(reason) => write!(f, "Invalid weight initialization: {reason}"),
            MlErr::InvalidLayer(reason) => write!(f, "Invalid layer: {reason}"),
            MlErr::EmptySequence(which) => write!(f, "The {which} sequence has no batches"),
            MlErr::Dataset(e) => write!(f, "Failed to load a batch: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Dataset(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<ndarray::ShapeError> for MlErr {
    fn from(value: ndarray::ShapeError) -> Self {
        Self::InvalidLayer(value.to_string())
    }
}
