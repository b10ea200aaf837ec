// Archivo: pass.rs
// Propósito: transición genérica que resuelve su resultado de forma síncrona
// con el índice configurado en el paso.
use super::registry::{kinds, StepFactory, StepRegistry};
use super::{FireOutcome, TransitionIo, TransitionLogic};
use crate::config::EngineConfig;
use crate::context::WorkplanContext;
use crate::errors::{FlowError, Result};
use crate::workplan::Step;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parámetros del paso `pass`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassParameters {
    /// Índice de salida por la que se emite el token.
    #[serde(default)]
    pub result: usize,
}

/// Consume un token de cualquier entrada y lo emite en `result`.
///
/// También es la transición que reemplaza a un paso desactivado por el
/// contexto.
#[derive(Debug, Clone)]
pub struct PassTransition {
    result: usize,
}

impl PassTransition {
    pub fn new(result: usize) -> Self {
        Self { result }
    }
}

impl TransitionLogic for PassTransition {
    fn fire(&mut self, io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        let Some((input, token)) = io.first_available() else {
            return Ok(FireOutcome::Idle);
        };
        io.ensure_output(self.result)?;
        io.take(input, &token);
        io.emit(self.result, token)?;
        Ok(FireOutcome::Fired)
    }
}

pub struct PassFactory;

impl StepFactory for PassFactory {
    fn kind(&self) -> &str {
        kinds::PASS
    }

    fn validate(&self, step: &Step, _registry: &StepRegistry) -> Result<()> {
        let params: PassParameters = step.parameters_as()?;
        if params.result >= step.outputs.len() {
            return Err(FlowError::Configuration(format!("el paso '{}' usa la salida {} pero sólo tiene {}",
                                                        step.name,
                                                        params.result,
                                                        step.outputs.len())));
        }
        Ok(())
    }

    fn create(&self,
              step: &Step,
              _context: &Arc<dyn WorkplanContext>,
              _registry: &Arc<StepRegistry>,
              _config: &EngineConfig)
              -> Result<Box<dyn TransitionLogic>> {
        let params: PassParameters = step.parameters_as()?;
        Ok(Box::new(PassTransition::new(params.result)))
    }
}
