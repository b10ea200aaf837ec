pub mod context;
pub mod trait_step;

pub use context::RunContext;
pub use trait_step::{ProductionStep, ProductionStepFactory};
