//! mes-workflow: procesos de fabricación sobre el motor `flow`
//!
//! Define los pasos de producción (montaje, inspección, embalaje) como tipos
//! registrables en `flow::StepRegistry`, los workplans de ejemplo del
//! proceso de montaje, persistencia en disco para workplans y snapshots, y
//! conductores que resuelven el trabajo pendiente de una ejecución (en el
//! hilo actual, en lote con rayon o con un equipo en otro hilo).
//!
//! ```rust
//! use flow::{Engine, EngineConfig, NodeClassification};
//! use mes_workflow::{production_registry, run_to_completion, ProcessType, RunContext, WorkplanFactory};
//! use std::sync::Arc;
//!
//! let workplan = WorkplanFactory::create(ProcessType::Assembly).unwrap();
//! let mut engine = Engine::new(Arc::new(workplan),
//!                              Arc::new(RunContext::new()),
//!                              Arc::new(production_registry().unwrap()),
//!                              EngineConfig::default()).unwrap();
//! let place = run_to_completion(&mut engine, |_| 0).unwrap();
//! assert_eq!(place.classification, NodeClassification::END);
//! ```

pub mod driver;
pub mod errors;
pub mod factory;
pub mod flows;
pub mod persistence;
pub mod process_type;
pub mod registry;
pub mod step;

pub use driver::{run_batch, run_to_completion, run_with_equipment};
pub use errors::WorkflowError;
pub use factory::WorkplanFactory;
pub use persistence::{FileSnapshotStore, FileWorkplanRepository};
pub use process_type::ProcessType;
pub use registry::production_registry;
pub use step::{ProductionStep, ProductionStepFactory, RunContext};
