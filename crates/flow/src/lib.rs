//! Crate `flow` — motor de ejecución de workplans de manufactura
//!
//! Un workplan es un grafo declarativo y versionado de conectores (plazas) y
//! pasos (transiciones). El motor lo instancia y ejecuta con semántica de
//! red de Petri basada en tokens: bifurcación paralela (`split`), barrera de
//! unión (`join`), subworkflows anidados, suspensión a la espera de trabajo
//! externo, pausa con captura exacta del estado y predicción del resultado
//! antes de que la ejecución termine.
//!
//! Diseño resumido:
//! - Arenas indexadas (`Vec` + `IndexMap<ElementId, usize>`): los ciclos del
//!   grafo no requieren referencias compartidas.
//! - Propagación monohilo sobre una cola de trabajo explícita (`Agenda`).
//! - Trabajo externo = token retenido + `Engine::resume`, también desde otro
//!   hilo a través de `EngineHandle`.
//! - Despacho de pasos por registro (`StepRegistry`), resuelto al cargar.
//!
//! Ejemplo rápido:
//! ```rust
//! use flow::{DefaultContext, Engine, EngineConfig, NodeClassification, RunStatus, Step, StepRegistry, Workplan};
//! use std::sync::Arc;
//!
//! let mut wp = Workplan::new("demo");
//! let start = wp.add_connector("start", NodeClassification::START).unwrap();
//! let end = wp.add_connector("end", NodeClassification::END).unwrap();
//! wp.add_step(Step::new("pass", "forward").input(start).output(end)).unwrap();
//!
//! let mut engine = Engine::new(Arc::new(wp),
//!                              Arc::new(DefaultContext),
//!                              Arc::new(StepRegistry::with_builtins()),
//!                              EngineConfig::default()).unwrap();
//! assert!(matches!(engine.start().unwrap(), RunStatus::Completed(_)));
//! ```
pub mod agenda;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod instantiator;
pub mod place;
pub mod predictor;
pub mod repository;
pub mod service;
pub mod snapshot;
pub mod stubs;
pub mod token;
pub mod transition;
pub mod validator;
pub mod workplan;

pub use config::*;
pub use context::*;
pub use engine::*;
pub use errors::*;
pub use instantiator::*;
pub use place::Place;
pub use predictor::PathPredictor;
pub use repository::*;
pub use service::*;
pub use snapshot::*;
pub use stubs::*;
pub use token::Token;
pub use transition::{kinds, FireOutcome, PendingWork, StepFactory, StepRegistry, Transition, TransitionIo,
                     TransitionLogic};
pub use validator::*;
pub use workplan::*;
