pub mod arch;
pub mod dataset;
pub mod error;
pub mod initialization;
pub mod metrics;
pub mod optimization;
pub mod param_manager;
pub mod training;

pub use error::{MlErr, Result};
pub use param_manager::ParamManager;
