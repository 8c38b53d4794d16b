pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod submodels;

use log::info;
use machine_learning::{
    dataset::Sequence,
    training::{History, TrainerBuilder},
};

pub use config::FusionConfig;
pub use data::PersonIdSequence;
pub use error::{FusionErr, Result};
pub use model::FusionModel;

/// Builds the fusion model described by `config` and trains it on its training manifest.
///
/// # Errors
/// Returns a `FusionErr` if the config is invalid, a manifest or array can't be read, or
/// training fails.
pub fn train(config: &FusionConfig) -> Result<History> {
    config.validate()?;

    let model = FusionModel::new(config)?;
    let mut trainer = TrainerBuilder::new().build(model, &config.compile_spec())?;
    info!("compiled model with {} parameters", trainer.params().len());

    let mut train_ds = PersonIdSequence::open(
        &config.train_csv,
        config.batch_size,
        config.num_classes,
        &config.inputs,
        config.shuffle,
        config.seed,
    )?;

    let val_ds = config
        .validate
        .then(|| {
            PersonIdSequence::open(
                &config.val_csv,
                config.batch_size,
                config.num_classes,
                &config.inputs,
                false,
                None,
            )
        })
        .transpose()?;

    info!(
        "training for {} epochs, {} batches of {} samples each",
        config.epochs,
        train_ds.len(),
        config.batch_size
    );

    let history = trainer.fit(
        &mut train_ds,
        config.epochs,
        val_ds.as_ref().map(|ds| ds as &dyn Sequence),
    )?;

    Ok(history)
}
