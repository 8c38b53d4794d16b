use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use fusion::{FusionConfig, FusionErr, config::InputShapes};
use machine_learning::{metrics::Metric, training::LossFnSpec};
use ndarray::{ArrayD, IxDyn};
use tempfile::TempDir;

const CLASSES: usize = 3;

fn shapes() -> InputShapes {
    InputShapes {
        face: vec![4, 4, 1],
        palm_print: vec![3, 3, 1],
        audio: vec![2, 3, 1],
        signature: vec![10, 2],
    }
}

/// Writes a manifest of `n` samples into `dir`, every modality of a sample is filled with a value
/// that depends on its class.
fn write_split(dir: &Path, name: &str, n: usize) -> PathBuf {
    let arrays = dir.join(name);
    fs::create_dir_all(&arrays).unwrap();

    let mut csv = String::from("person_id,face,palm_print,audio,signature\n");
    for i in 0..n {
        let class = i % CLASSES;
        let value = class as f32 - 1. + 0.05 * (i % 4) as f32;

        let mut row = vec![class.to_string()];
        for (input, shape) in shapes().ordered() {
            let len = shape.iter().product();
            let array = ArrayD::from_shape_vec(IxDyn(shape), vec![value; len]).unwrap();

            let file = format!("{name}/{input}_{i}.npy");
            ndarray_npy::write_npy(dir.join(&file), &array).unwrap();
            row.push(file);
        }

        csv.push_str(&row.join(","));
        csv.push('\n');
    }

    let path = dir.join(format!("{name}.csv"));
    fs::write(&path, csv).unwrap();
    path
}

fn config(dir: &Path) -> FusionConfig {
    FusionConfig {
        train_csv: write_split(dir, "train", 12),
        val_csv: write_split(dir, "val", 6),
        batch_size: NonZeroUsize::new(4).unwrap(),
        epochs: NonZeroUsize::new(40).unwrap(),
        learning_rate: 0.01,
        num_classes: CLASSES,
        fusion_units: 8,
        inputs: shapes(),
        seed: Some(11),
        ..Default::default()
    }
}

#[test]
fn training_lowers_the_loss() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    assert_eq!(config.loss, LossFnSpec::CategoricalCrossentropy);

    let history = fusion::train(&config).unwrap();
    assert_eq!(history.epochs.len(), 40);

    let first = &history.epochs[0];
    let last = history.last().unwrap();
    assert!(
        last.train.loss < first.train.loss,
        "loss went from {} to {}",
        first.train.loss,
        last.train.loss
    );

    let accuracy = last.train.metric(Metric::Accuracy).unwrap();
    assert!((0.0..=1.0).contains(&accuracy));

    let validation = last.validation.as_ref().unwrap();
    assert!(validation.loss.is_finite());
    assert!(validation.metric(Metric::Accuracy).is_some());
}

#[test]
fn validation_can_be_skipped() {
    let dir = TempDir::new().unwrap();
    let config = FusionConfig {
        val_csv: dir.path().join("missing.csv"),
        validate: false,
        epochs: NonZeroUsize::new(2).unwrap(),
        ..config(dir.path())
    };

    let history = fusion::train(&config).unwrap();
    assert_eq!(history.epochs.len(), 2);
    assert!(history.epochs.iter().all(|e| e.validation.is_none()));
}

#[test]
fn missing_validation_manifest_fails() {
    let dir = TempDir::new().unwrap();
    let config = FusionConfig {
        val_csv: dir.path().join("missing.csv"),
        ..config(dir.path())
    };

    assert!(matches!(fusion::train(&config), Err(FusionErr::Io { .. })));
}

#[test]
fn labels_outside_the_model_are_rejected() {
    let dir = TempDir::new().unwrap();
    let config = FusionConfig {
        num_classes: 2,
        ..config(dir.path())
    };

    assert!(matches!(
        fusion::train(&config),
        Err(FusionErr::Manifest { .. })
    ));
}
