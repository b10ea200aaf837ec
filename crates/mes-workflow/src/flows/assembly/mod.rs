pub mod assembly_flow;
pub mod steps;

pub use assembly_flow::{assembly_workplan, inspection_workplan};
