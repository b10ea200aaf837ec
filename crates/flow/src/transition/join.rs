// Archivo: join.rs
// Propósito: fan-in con barrera. Dispara sólo cuando todas las entradas tienen
// un token de la misma bifurcación y emite el original una sola vez.
use super::registry::{kinds, StepFactory, StepRegistry};
use super::{FireOutcome, TransitionIo, TransitionLogic};
use crate::config::EngineConfig;
use crate::context::WorkplanContext;
use crate::errors::{FlowError, Result};
use crate::token::Token;
use crate::workplan::Step;
use log::warn;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct JoinTransition;

impl JoinTransition {
    /// Busca un `lineage` presente en todas las entradas y devuelve el token
    /// correspondiente de cada una.
    fn find_match(io: &TransitionIo<'_>) -> Option<Vec<Token>> {
        let candidates: Vec<_> = io.tokens(0).iter().filter_map(Token::lineage).collect();
        candidates.into_iter().find_map(|lineage| {
                                  (0..io.input_count()).map(|i| {
                                                           io.tokens(i)
                                                             .iter()
                                                             .find(|t| t.lineage() == Some(lineage))
                                                             .cloned()
                                                       })
                                                       .collect::<Option<Vec<_>>>()
                              })
    }
}

impl TransitionLogic for JoinTransition {
    fn fire(&mut self, io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        let Some(matched) = Self::find_match(io) else {
            if (0..io.input_count()).any(|i| io.tokens(i).iter().any(|t| !t.is_split())) {
                warn!("join {} recibió un token que no proviene de un split", io.step_id());
            }
            return Ok(FireOutcome::Idle);
        };
        let original = matched[0].original()
                                 .cloned()
                                 .ok_or_else(|| FlowError::Execution("token de rama sin original".into()))?;
        io.ensure_output(0)?;
        for (input, token) in matched.iter().enumerate() {
            io.take(input, token);
        }
        io.emit(0, original)?;
        Ok(FireOutcome::Fired)
    }
}

pub struct JoinFactory;

impl StepFactory for JoinFactory {
    fn kind(&self) -> &str {
        kinds::JOIN
    }

    fn validate(&self, step: &Step, _registry: &StepRegistry) -> Result<()> {
        if step.inputs.is_empty() || step.outputs.len() != 1 {
            return Err(FlowError::Configuration(format!("join '{}' requiere al menos 1 entrada y 1 salida \
                                                         (tiene {} y {})",
                                                        step.name,
                                                        step.inputs.len(),
                                                        step.outputs.len())));
        }
        if step.inputs.iter().any(Option::is_none) {
            return Err(FlowError::Configuration(format!("join '{}' tiene entradas sin conectar", step.name)));
        }
        Ok(())
    }

    fn create(&self,
              _step: &Step,
              _context: &Arc<dyn WorkplanContext>,
              _registry: &Arc<StepRegistry>,
              _config: &EngineConfig)
              -> Result<Box<dyn TransitionLogic>> {
        Ok(Box::new(JoinTransition))
    }

    fn skippable(&self) -> bool {
        false
    }
}
