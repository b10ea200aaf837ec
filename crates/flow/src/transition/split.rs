// Archivo: split.rs
// Propósito: fan-out. Un token de entrada se convierte en un token de rama
// por cada salida, todos con el mismo `lineage`.
use super::registry::{kinds, StepFactory, StepRegistry};
use super::{FireOutcome, TransitionIo, TransitionLogic};
use crate::config::EngineConfig;
use crate::context::WorkplanContext;
use crate::errors::{FlowError, Result};
use crate::token::Token;
use crate::workplan::Step;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct SplitTransition;

impl TransitionLogic for SplitTransition {
    fn fire(&mut self, io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        let Some((input, token)) = io.first_available() else {
            return Ok(FireOutcome::Idle);
        };
        // todas las ramas o ninguna
        for output in 0..io.output_count() {
            io.ensure_output(output)?;
        }
        io.take(input, &token);
        let lineage = Uuid::new_v4();
        for output in 0..io.output_count() {
            io.emit(output, Token::split(&token, lineage, output))?;
        }
        Ok(FireOutcome::Fired)
    }
}

pub struct SplitFactory;

impl StepFactory for SplitFactory {
    fn kind(&self) -> &str {
        kinds::SPLIT
    }

    fn validate(&self, step: &Step, _registry: &StepRegistry) -> Result<()> {
        if step.inputs.len() != 1 || step.outputs.is_empty() {
            return Err(FlowError::Configuration(format!("split '{}' requiere 1 entrada y al menos 1 salida \
                                                         (tiene {} y {})",
                                                        step.name,
                                                        step.inputs.len(),
                                                        step.outputs.len())));
        }
        Ok(())
    }

    fn create(&self,
              _step: &Step,
              _context: &Arc<dyn WorkplanContext>,
              _registry: &Arc<StepRegistry>,
              _config: &EngineConfig)
              -> Result<Box<dyn TransitionLogic>> {
        Ok(Box::new(SplitTransition))
    }

    fn skippable(&self) -> bool {
        false
    }
}
