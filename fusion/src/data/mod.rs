//! Loading the biometric datasets listed in CSV manifests.

mod manifest;
mod sequence;

pub use manifest::{LABEL_COLUMN, Manifest, Record};
pub use sequence::PersonIdSequence;
