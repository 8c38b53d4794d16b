pub mod activations;
mod concat;
pub mod layers;
pub mod loss;
mod model;
mod sequential;

pub use concat::{concat, split};
pub use model::{Model, Phase};
pub use sequential::Sequential;
