// Archivo: task.rs
// Propósito: transición que representa trabajo real (equipos, operarios).
// Retiene el token hasta que un llamador externo informa el resultado.
use super::registry::{StepFactory, StepRegistry};
use super::{FireOutcome, PendingWork, TransitionIo, TransitionLogic};
use crate::config::EngineConfig;
use crate::context::WorkplanContext;
use crate::errors::{FlowError, Result};
use crate::snapshot::HolderState;
use crate::token::Token;
use crate::workplan::{ElementId, Step};
use log::debug;
use std::sync::Arc;

/// Paso con trabajo externo. Procesa un token a la vez; mientras retiene uno,
/// los siguientes esperan en la plaza de entrada.
#[derive(Debug, Clone)]
pub struct TaskTransition {
    step_id: ElementId,
    name: String,
    kind: String,
    outcomes: Vec<String>,
    held: Vec<Token>,
}

impl TaskTransition {
    pub fn new(step: &Step) -> Self {
        let outcomes = if step.output_descriptions.is_empty() {
            (0..step.outputs.len()).map(|i| format!("output-{}", i)).collect()
        } else {
            step.output_descriptions.iter().map(|d| d.name.clone()).collect()
        };
        Self { step_id: step.id,
               name: step.name.clone(),
               kind: step.kind.clone(),
               outcomes,
               held: Vec::new() }
    }
}

impl TransitionLogic for TaskTransition {
    fn fire(&mut self, io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        if !self.held.is_empty() {
            return Ok(FireOutcome::Idle);
        }
        let Some((input, token)) = io.first_available() else {
            return Ok(FireOutcome::Idle);
        };
        io.take(input, &token);
        debug!("paso {} ({}) espera resultado externo", self.step_id, self.name);
        self.held.push(token);
        Ok(FireOutcome::Held)
    }

    fn held(&self) -> &[Token] {
        &self.held
    }

    fn capture(&mut self) -> Result<HolderState> {
        Ok(HolderState::Task)
    }

    fn restore(&mut self, tokens: Vec<Token>, state: HolderState) -> Result<()> {
        match state {
            HolderState::Task => {
                self.held = tokens;
                Ok(())
            }
            other => Err(FlowError::Precondition(format!("estado {:?} no aplica al paso {}", other, self.step_id))),
        }
    }

    fn resume(&mut self, path: &[ElementId], result: usize, io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        if !path.is_empty() {
            return Err(FlowError::NotFound(format!("el paso {} no contiene {:?}", self.step_id, path)));
        }
        if self.held.is_empty() {
            return Err(FlowError::Precondition(format!("el paso {} ({}) no tiene trabajo pendiente",
                                                       self.step_id, self.name)));
        }
        // validar antes de soltar el token: nunca se pierde
        io.ensure_output(result)?;
        let token = self.held.remove(0);
        debug!("paso {} ({}) termina con resultado {}", self.step_id, self.name, result);
        io.emit(result, token)?;
        Ok(FireOutcome::Fired)
    }

    fn pending_work(&self, path: &[ElementId], out: &mut Vec<PendingWork>) {
        out.extend(self.held.iter().map(|token| PendingWork { path: path.to_vec(),
                                                               step_name: self.name.clone(),
                                                               kind: self.kind.clone(),
                                                               token: token.clone(),
                                                               outcomes: self.outcomes.clone() }));
    }
}

/// Fábrica de pasos con trabajo externo. El mismo tipo de transición sirve
/// para cualquier `kind` de producción sin lógica propia en el motor.
pub struct TaskFactory {
    kind: String,
}

impl TaskFactory {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

impl StepFactory for TaskFactory {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn validate(&self, step: &Step, _registry: &StepRegistry) -> Result<()> {
        if step.outputs.is_empty() {
            return Err(FlowError::Configuration(format!("el paso '{}' no tiene salidas", step.name)));
        }
        Ok(())
    }

    fn create(&self,
              step: &Step,
              _context: &Arc<dyn WorkplanContext>,
              _registry: &Arc<StepRegistry>,
              _config: &EngineConfig)
              -> Result<Box<dyn TransitionLogic>> {
        Ok(Box::new(TaskTransition::new(step)))
    }
}
