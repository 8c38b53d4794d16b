use log::debug;
use machine_learning::{
    MlErr,
    arch::{Model, Phase, Sequential, concat, layers::Layer, split},
    param_manager::{BackIter, FrontIter},
};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::{
    Result,
    config::FusionConfig,
    submodels::{
        Branch, base_audio_model, base_face_model, base_palm_print_model, base_signature_model,
    },
};

/// The names of the model's inputs, in the order `forward` takes them.
pub const INPUT_NAMES: [&str; 4] = ["face", "palm_print", "audio", "signature"];

/// Cascade fusion of the four biometric branches.
///
/// Audio and signature embeddings are merged first, the result is merged with the palm print
/// embedding and that with the face embedding, which feeds the softmax classifier:
///
/// ```text
/// merge_1 = relu(bn(dense(audio ++ signature)))
/// merge_2 = relu(bn(dense(palm_print ++ merge_1)))
/// output  = softmax(dense(bn(face ++ merge_2)))
/// ```
///
/// Parameters are laid out as the four branches in input order followed by the three merge
/// blocks.
#[derive(Debug, Clone)]
pub struct FusionModel {
    face: Branch,
    palm_print: Branch,
    audio: Branch,
    signature: Branch,
    merge_1: Sequential,
    merge_2: Sequential,
    output: Sequential,
    num_classes: usize,
}

impl FusionModel {
    pub fn new(config: &FusionConfig) -> Result<Self> {
        config.validate()?;

        let shapes = &config.inputs;
        let face = base_face_model(&shapes.face)?;
        let palm_print = base_palm_print_model(&shapes.palm_print)?;
        let audio = base_audio_model(&shapes.audio)?;
        let signature = base_signature_model(&shapes.signature)?;

        let units = config.fusion_units;
        let merge_1 = Sequential::new([
            Layer::dense((audio.output_dim + signature.output_dim, units), None),
            Layer::batch_norm(units),
            Layer::relu(units),
        ])?;
        let merge_2 = Sequential::new([
            Layer::dense((palm_print.output_dim + units, units), None),
            Layer::batch_norm(units),
            Layer::relu(units),
        ])?;

        let fused = face.output_dim + units;
        let output = Sequential::new([
            Layer::batch_norm(fused),
            Layer::dense((fused, config.num_classes), None),
            Layer::softmax(config.num_classes),
        ])?;

        let model = Self {
            face,
            palm_print,
            audio,
            signature,
            merge_1,
            merge_2,
            output,
            num_classes: config.num_classes,
        };
        debug!("fusion model with {} parameters", model.size());

        Ok(model)
    }

    /// Returns every input's name and sample shape, in the order `forward` takes them.
    pub fn inputs(&self) -> [(&'static str, &[usize]); 4] {
        self.branches()
            .map(|branch| (branch.name, branch.input_shape.as_slice()))
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn branches(&self) -> [&Branch; 4] {
        [&self.face, &self.palm_print, &self.audio, &self.signature]
    }

    fn check_inputs(&self, inputs: &[ArrayView2<'_, f32>]) -> machine_learning::Result<()> {
        if inputs.len() != INPUT_NAMES.len() {
            return Err(MlErr::InputCountMismatch {
                got: inputs.len(),
                expected: INPUT_NAMES.len(),
            });
        }

        let rows = inputs[0].nrows();
        for (x, branch) in inputs.iter().zip(self.branches()) {
            let expected = (rows, branch.input_dim());
            if x.dim() != expected {
                return Err(MlErr::ShapeMismatch {
                    what: branch.name,
                    got: x.dim(),
                    expected,
                });
            }
        }

        Ok(())
    }
}

impl Model for FusionModel {
    fn size(&self) -> usize {
        let branches: usize = self.branches().iter().map(|b| b.net.size()).sum();
        branches + self.merge_1.size() + self.merge_2.size() + self.output.size()
    }

    fn num_inputs(&self) -> usize {
        INPUT_NAMES.len()
    }

    fn init_params<R>(&self, rng: &mut R) -> machine_learning::Result<Vec<f32>>
    where
        R: Rng + ?Sized,
    {
        let mut params = Vec::with_capacity(self.size());
        for net in self.branches().map(|b| &b.net) {
            params.extend(net.init_params(rng)?);
        }
        params.extend(self.merge_1.init_params(rng)?);
        params.extend(self.merge_2.init_params(rng)?);
        params.extend(self.output.init_params(rng)?);

        Ok(params)
    }

    fn forward(
        &mut self,
        params: &[f32],
        inputs: &[ArrayView2<'_, f32>],
        phase: Phase,
    ) -> machine_learning::Result<Array2<f32>> {
        self.check_inputs(inputs)?;
        let mut front = FrontIter::new(params);

        let face = self.face.net.forward_from(&mut front, inputs[0], phase)?;
        let palm_print = self.palm_print.net.forward_from(&mut front, inputs[1], phase)?;
        let audio = self.audio.net.forward_from(&mut front, inputs[2], phase)?;
        let signature = self.signature.net.forward_from(&mut front, inputs[3], phase)?;

        let x = concat(&[audio.view(), signature.view()])?;
        let merge_1 = self.merge_1.forward_from(&mut front, x.view(), phase)?;

        let x = concat(&[palm_print.view(), merge_1.view()])?;
        let merge_2 = self.merge_2.forward_from(&mut front, x.view(), phase)?;

        let x = concat(&[face.view(), merge_2.view()])?;
        let y = self.output.forward_from(&mut front, x.view(), phase)?;

        front.finish()?;
        Ok(y)
    }

    fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> machine_learning::Result<()> {
        let mut back = BackIter::new(params, grad)?;
        let units = self.merge_2.output_dim();

        let d = self.output.backward_from(&mut back, d)?;
        let [d_face, d_merge_2] = split_pair(d.view(), self.face.output_dim, units)?;

        let d = self.merge_2.backward_from(&mut back, d_merge_2)?;
        let [d_palm_print, d_merge_1] = split_pair(d.view(), self.palm_print.output_dim, units)?;

        let d = self.merge_1.backward_from(&mut back, d_merge_1)?;
        let [d_audio, d_signature] =
            split_pair(d.view(), self.audio.output_dim, self.signature.output_dim)?;

        self.signature.net.backward_from(&mut back, d_signature)?;
        self.audio.net.backward_from(&mut back, d_audio)?;
        self.palm_print.net.backward_from(&mut back, d_palm_print)?;
        self.face.net.backward_from(&mut back, d_face)?;

        back.finish()
    }
}

fn split_pair(
    d: ArrayView2<'_, f32>,
    left: usize,
    right: usize,
) -> machine_learning::Result<[Array2<f32>; 2]> {
    let mut parts = split(d, &[left, right])?.into_iter();

    match (parts.next(), parts.next()) {
        (Some(l), Some(r)) => Ok([l, r]),
        _ => Err(MlErr::SizeMismatch {
            what: "split deltas",
            got: 0,
            expected: 2,
        }),
    }
}
