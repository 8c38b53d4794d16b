//! Feature extractors for every biometric modality.
//!
//! Each one flattens its sample, optionally pools it down and runs it through a small stack of
//! dense layers, ending in a fixed size embedding that the fusion head concatenates.

use machine_learning::arch::{Sequential, activations::ActFn, layers::Layer};

use crate::{FusionErr, Result};

pub const FACE_EMBEDDING: usize = 128;
pub const PALM_PRINT_EMBEDDING: usize = 64;
pub const AUDIO_EMBEDDING: usize = 32;
pub const SIGNATURE_EMBEDDING: usize = 32;

/// A single input branch of the fusion model.
#[derive(Debug, Clone)]
pub struct Branch {
    pub name: &'static str,
    pub input_shape: Vec<usize>,
    pub output_dim: usize,
    pub net: Sequential,
}

impl Branch {
    fn new(name: &'static str, input_shape: &[usize], layers: Vec<Layer>) -> Result<Self> {
        let net = Sequential::new(layers)?;

        Ok(Self {
            name,
            input_shape: input_shape.to_vec(),
            output_dim: net.output_dim(),
            net,
        })
    }

    /// Returns the amount of values of a flattened sample.
    pub fn input_dim(&self) -> usize {
        self.input_shape.iter().product()
    }
}

/// Face images, `(height, width, channels)`.
pub fn base_face_model(input_shape: &[usize]) -> Result<Branch> {
    let (h, w, c) = image_shape("face", input_shape)?;
    let pool = Layer::avg_pool_2d((h, w, c), ((h / 28).max(1), (w / 28).max(1)))?;
    let pooled = pool.output_dim();

    let layers = vec![
        pool,
        Layer::dense((pooled, 256), Some(ActFn::relu())),
        Layer::dense((256, FACE_EMBEDDING), Some(ActFn::relu())),
    ];
    Branch::new("face", input_shape, layers)
}

/// Palm print scans, `(height, width, channels)`.
pub fn base_palm_print_model(input_shape: &[usize]) -> Result<Branch> {
    let (h, w, c) = image_shape("palm_print", input_shape)?;
    let pool = Layer::avg_pool_2d((h, w, c), ((h / 30).max(1), (w / 30).max(1)))?;
    let pooled = pool.output_dim();

    let layers = vec![
        pool,
        Layer::dense((pooled, 128), Some(ActFn::relu())),
        Layer::dense((128, PALM_PRINT_EMBEDDING), Some(ActFn::relu())),
    ];
    Branch::new("palm_print", input_shape, layers)
}

/// Audio features, small enough to go straight into the dense stack.
pub fn base_audio_model(input_shape: &[usize]) -> Result<Branch> {
    let dim = flat_dim("audio", input_shape)?;

    let layers = vec![
        Layer::dense((dim, 64), Some(ActFn::relu())),
        Layer::dense((64, AUDIO_EMBEDDING), Some(ActFn::relu())),
    ];
    Branch::new("audio", input_shape, layers)
}

/// Pen trajectories, `(timesteps, features)`. Consecutive timesteps are averaged together.
pub fn base_signature_model(input_shape: &[usize]) -> Result<Branch> {
    let (steps, features, c) = image_shape("signature", input_shape)?;
    let pool = Layer::avg_pool_2d((steps, features, c), ((steps / 100).max(1), 1))?;
    let pooled = pool.output_dim();

    let layers = vec![
        pool,
        Layer::dense((pooled, 128), Some(ActFn::relu())),
        Layer::dense((128, SIGNATURE_EMBEDDING), Some(ActFn::relu())),
    ];
    Branch::new("signature", input_shape, layers)
}

fn flat_dim(name: &str, shape: &[usize]) -> Result<usize> {
    match shape.iter().product::<usize>() {
        0 => Err(FusionErr::InvalidConfig(format!(
            "{name} shape {shape:?} has no values"
        ))),
        dim => Ok(dim),
    }
}

/// Reads a shape as `(height, width, channels)`. Missing trailing axes are 1 and extra ones are
/// folded into the channels.
fn image_shape(name: &str, shape: &[usize]) -> Result<(usize, usize, usize)> {
    flat_dim(name, shape)?;

    Ok(match shape {
        [] => (1, 1, 1),
        [h] => (*h, 1, 1),
        [h, w] => (*h, *w, 1),
        [h, w, rest @ ..] => (*h, *w, rest.iter().product()),
    })
}

#[cfg(test)]
mod tests {
    use machine_learning::arch::Model;

    use super::*;

    #[test]
    fn embeddings_have_fixed_sizes() {
        let face = base_face_model(&[224, 224, 3]).unwrap();
        let palm = base_palm_print_model(&[90, 90, 1]).unwrap();
        let audio = base_audio_model(&[9, 13, 1]).unwrap();
        let signature = base_signature_model(&[1000, 5]).unwrap();

        assert_eq!(face.output_dim, FACE_EMBEDDING);
        assert_eq!(palm.output_dim, PALM_PRINT_EMBEDDING);
        assert_eq!(audio.output_dim, AUDIO_EMBEDDING);
        assert_eq!(signature.output_dim, SIGNATURE_EMBEDDING);

        assert_eq!(face.net.input_dim(), 224 * 224 * 3);
        assert_eq!(palm.net.input_dim(), 90 * 90);
        assert_eq!(audio.net.input_dim(), 9 * 13);
        assert_eq!(signature.net.input_dim(), 1000 * 5);
    }

    #[test]
    fn pooling_shrinks_large_inputs() {
        let face = base_face_model(&[224, 224, 3]).unwrap();
        // 8x8 windows over 224x224 leave 28x28x3 values.
        assert_eq!(face.net.layers()[0].output_dim(), 28 * 28 * 3);

        let signature = base_signature_model(&[1000, 5]).unwrap();
        assert_eq!(signature.net.layers()[0].output_dim(), 100 * 5);
    }

    #[test]
    fn small_inputs_are_not_pooled() {
        let face = base_face_model(&[6, 6, 3]).unwrap();
        assert_eq!(face.net.layers()[0].output_dim(), 6 * 6 * 3);
        assert!(face.net.size() > 0);
    }

    #[test]
    fn empty_shapes_are_rejected() {
        assert!(base_audio_model(&[9, 0, 1]).is_err());
        assert!(base_face_model(&[0, 224, 3]).is_err());
    }
}
