// Archivo: subworkflow.rs
// Propósito: composición jerárquica. El paso ejecuta un workplan interno en un
// motor anidado que le pertenece en exclusiva y traduce la salida interna
// alcanzada a una de sus salidas externas.
use super::registry::{kinds, StepFactory, StepRegistry};
use super::{FireOutcome, PendingWork, TransitionIo, TransitionLogic};
use crate::config::EngineConfig;
use crate::context::WorkplanContext;
use crate::engine::{Engine, EngineState, RunStatus};
use crate::errors::{FlowError, Result};
use crate::snapshot::HolderState;
use crate::token::Token;
use crate::workplan::{ElementId, Step, Workplan};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Parámetros del paso `subworkflow`: el blueprint interno completo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubworkflowParameters {
    pub workplan: Workplan,
}

/// Traduce el conector de salida interno alcanzado al índice de salida
/// externo, según los `mapping_value` de las descripciones del paso.
#[derive(Debug, Clone, Default)]
pub struct IndexResolver {
    indexes: HashMap<ElementId, usize>,
}

impl IndexResolver {
    pub fn from_step(step: &Step) -> Self {
        let indexes = step.output_descriptions
                          .iter()
                          .enumerate()
                          .map(|(index, d)| (d.mapping_value, index))
                          .collect();
        Self { indexes }
    }

    pub fn resolve(&self, exit: ElementId) -> Option<usize> {
        self.indexes.get(&exit).copied()
    }
}

pub struct SubworkflowTransition {
    step_id: ElementId,
    workplan: Arc<Workplan>,
    context: Arc<dyn WorkplanContext>,
    registry: Arc<StepRegistry>,
    config: EngineConfig,
    resolver: IndexResolver,
    held: Vec<Token>,
    nested: Option<Box<Engine>>,
}

impl SubworkflowTransition {
    pub fn new(step: &Step,
               workplan: Workplan,
               context: Arc<dyn WorkplanContext>,
               registry: Arc<StepRegistry>,
               config: EngineConfig)
               -> Self {
        Self { step_id: step.id,
               workplan: Arc::new(workplan),
               context,
               registry,
               config,
               resolver: IndexResolver::from_step(step),
               held: Vec::new(),
               nested: None }
    }

    fn build_engine(&self) -> Result<Box<Engine>> {
        Ok(Box::new(Engine::new(self.workplan.clone(),
                                self.context.clone(),
                                self.registry.clone(),
                                self.config.clone())?))
    }

    /// Emite el token retenido si el motor anidado terminó.
    fn settle(&mut self, status: RunStatus, io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        match status {
            RunStatus::Suspended => Ok(FireOutcome::Held),
            RunStatus::Completed(place) => {
                let output = self.resolver
                                 .resolve(place.id)
                                 .ok_or_else(|| FlowError::UnresolvedOutput { step: self.step_id,
                                                                              detail: format!("la salida interna {} ({}) \
                                                                                               no tiene mapeo",
                                                                                              place.id, place.name) })?;
                io.ensure_output(output)?;
                let token = self.held
                                .pop()
                                .ok_or_else(|| FlowError::Execution("subworkflow sin token retenido".into()))?;
                self.nested = None;
                debug!("subworkflow {} termina en {} -> salida {}", self.step_id, place.name, output);
                io.emit(output, token)?;
                Ok(FireOutcome::Fired)
            }
        }
    }
}

impl TransitionLogic for SubworkflowTransition {
    fn fire(&mut self, io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        if !self.held.is_empty() {
            return Ok(FireOutcome::Idle);
        }
        let Some((input, token)) = io.first_available() else {
            return Ok(FireOutcome::Idle);
        };
        let mut engine = self.build_engine()?;
        io.take(input, &token);
        self.held.push(token.clone());
        let status = engine.start_with(token)?;
        self.nested = Some(engine);
        self.settle(status, io)
    }

    fn held(&self) -> &[Token] {
        &self.held
    }

    fn capture(&mut self) -> Result<HolderState> {
        let mut engine = self.nested
                             .take()
                             .ok_or_else(|| FlowError::Precondition(format!("subworkflow {} sin motor anidado",
                                                                            self.step_id)))?;
        let snapshot = engine.pause()?;
        Ok(HolderState::Subworkflow { snapshot: Box::new(snapshot) })
    }

    fn restore(&mut self, tokens: Vec<Token>, state: HolderState) -> Result<()> {
        match state {
            HolderState::Subworkflow { snapshot } => {
                let mut engine = self.build_engine()?;
                engine.restore(*snapshot)?;
                self.held = tokens;
                self.nested = Some(engine);
                Ok(())
            }
            other => Err(FlowError::Precondition(format!("estado {:?} no aplica al subworkflow {}",
                                                         other, self.step_id))),
        }
    }

    fn continue_restored(&mut self, io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        let status = match self.nested.as_mut() {
            Some(engine) if engine.state() == EngineState::Restored => engine.start()?,
            _ => return Ok(FireOutcome::Idle),
        };
        self.settle(status, io)
    }

    fn resume(&mut self, path: &[ElementId], result: usize, io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        let engine = self.nested
                         .as_mut()
                         .ok_or_else(|| FlowError::Precondition(format!("el subworkflow {} no está en ejecución",
                                                                        self.step_id)))?;
        let status = engine.resume(path, result)?;
        self.settle(status, io)
    }

    fn pending_work(&self, path: &[ElementId], out: &mut Vec<PendingWork>) {
        if let Some(engine) = &self.nested {
            engine.collect_pending(path, out);
        }
    }
}

pub struct SubworkflowFactory;

impl StepFactory for SubworkflowFactory {
    fn kind(&self) -> &str {
        kinds::SUBWORKFLOW
    }

    fn validate(&self, step: &Step, registry: &StepRegistry) -> Result<()> {
        if step.inputs.len() != 1 {
            return Err(FlowError::Configuration(format!("subworkflow '{}' requiere exactamente 1 entrada",
                                                        step.name)));
        }
        if step.output_descriptions.len() != step.outputs.len() {
            return Err(FlowError::Configuration(format!("subworkflow '{}' necesita una descripción por salida",
                                                        step.name)));
        }
        let params: SubworkflowParameters = step.parameters_as()?;
        registry.check(&params.workplan)?;
        let resolver = IndexResolver::from_step(step);
        for exit in params.workplan
                          .connectors()
                          .iter()
                          .filter(|c| c.classification.completes_run())
        {
            if resolver.resolve(exit.id).is_none() {
                return Err(FlowError::Configuration(format!("subworkflow '{}': la salida interna '{}' ({}) no \
                                                             está mapeada",
                                                            step.name, exit.name, exit.id)));
            }
        }
        Ok(())
    }

    fn create(&self,
              step: &Step,
              context: &Arc<dyn WorkplanContext>,
              registry: &Arc<StepRegistry>,
              config: &EngineConfig)
              -> Result<Box<dyn TransitionLogic>> {
        let params: SubworkflowParameters = step.parameters_as()?;
        Ok(Box::new(SubworkflowTransition::new(step,
                                               params.workplan,
                                               context.clone(),
                                               registry.clone(),
                                               config.clone())))
    }
}
