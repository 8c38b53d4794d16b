mod builder;
mod history;
mod specs;
mod trainer;

pub use builder::{BoxedTrainer, TrainerBuilder};
pub use history::{EpochStats, Evaluation, History};
pub use specs::{CompileSpec, LossFnSpec, OptimizerSpec};
pub use trainer::Trainer;
