pub mod workplan_factory;

pub use workplan_factory::WorkplanFactory;
