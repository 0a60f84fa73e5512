// Neural network layers built on the graph engine.

pub mod module;
pub mod normalization;
pub mod parameter;
pub mod running_stats;


pub use module::Module;
pub use normalization::{GroupNorm, RunningGroupNorm};
pub use parameter::Parameter;
pub use running_stats::{RunningStats, update_running_stats};
