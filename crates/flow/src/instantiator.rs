// Archivo: instantiator.rs
// Propósito: ligar un workplan a un conjunto nuevo de plazas y transiciones
// para una ejecución.
use crate::config::EngineConfig;
use crate::context::WorkplanContext;
use crate::errors::{FlowError, Result};
use crate::place::Place;
use crate::transition::{PassTransition, StepRegistry, Transition, TransitionLogic};
use crate::workplan::{ElementId, Workplan};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::sync::Arc;

/// Plazas y transiciones de una ejecución, en arenas indexadas por posición.
pub struct Instance {
    pub places: Vec<Place>,
    pub transitions: Vec<Transition>,
    pub place_index: IndexMap<ElementId, usize>,
    pub transition_index: IndexMap<ElementId, usize>,
}

impl Instance {
    /// Plazas clasificadas como `END` o `FAILED`.
    pub fn end_places(&self) -> impl Iterator<Item = &Place> + '_ {
        self.places.iter().filter(|p| p.classification().is_terminal())
    }
}

pub struct Instantiator;

impl Instantiator {
    /// Crea una plaza por conector y una transición por paso.
    ///
    /// Todas las transiciones reciben el mismo `context` y la configuración
    /// del motor (los subworkflows la heredan). Los pasos que el
    /// contexto desactiva se sustituyen por un `PassTransition` hacia su salida
    /// por defecto. Falla sin devolver nada parcial si un slot referencia un
    /// conector inexistente o un tipo de paso no está registrado.
    pub fn instantiate(workplan: &Workplan,
                       context: &Arc<dyn WorkplanContext>,
                       registry: &Arc<StepRegistry>,
                       config: &EngineConfig)
                       -> Result<Instance> {
        registry.check(workplan)?;

        let mut place_index = IndexMap::with_capacity(workplan.connectors().len());
        let mut places = Vec::with_capacity(workplan.connectors().len());
        for (index, connector) in workplan.connectors().iter().enumerate() {
            if place_index.insert(connector.id, index).is_some() {
                return Err(FlowError::Configuration(format!("id de conector duplicado: {}", connector.id)));
            }
            places.push(Place::new(connector, index));
        }

        let resolve = |step_name: &str, slots: &[Option<ElementId>]| -> Result<Vec<Option<usize>>> {
            slots.iter()
                 .map(|slot| match slot {
                     None => Ok(None),
                     Some(id) => place_index.get(id).copied().map(Some).ok_or_else(|| {
                                                                          FlowError::Configuration(format!(
                                    "el paso '{}' referencia el conector inexistente {}",
                                    step_name, id
                                ))
                                                                      }),
                 })
                 .collect()
        };

        let mut transition_index = IndexMap::with_capacity(workplan.steps().len());
        let mut transitions = Vec::with_capacity(workplan.steps().len());
        for (index, step) in workplan.steps().iter().enumerate() {
            if place_index.contains_key(&step.id) || transition_index.insert(step.id, index).is_some() {
                return Err(FlowError::Configuration(format!("id de paso duplicado: {}", step.id)));
            }
            let inputs = resolve(&step.name, &step.inputs)?;
            let outputs = resolve(&step.name, &step.outputs)?;
            let factory = registry.factory(&step.kind)?;
            let disabled = context.is_disabled(step);
            let logic: Box<dyn TransitionLogic> = if disabled && factory.skippable() {
                info!("paso {} ({}) desactivado: salida {}", step.id, step.name, step.default_output());
                Box::new(PassTransition::new(step.default_output()))
            } else {
                if disabled {
                    warn!("el paso {} ({}) es estructural y no puede desactivarse", step.id, step.name);
                }
                factory.create(step, context, registry, config)?
            };
            transitions.push(Transition::new(step, inputs, outputs, context.clone(), logic));
        }

        debug!("workplan {} v{} instanciado: {} plazas, {} transiciones",
               workplan.name(),
               workplan.version(),
               places.len(),
               transitions.len());
        Ok(Instance { places,
                      transitions,
                      place_index,
                      transition_index })
    }
}
