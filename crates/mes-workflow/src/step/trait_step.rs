use crate::errors::WorkflowError;
use flow::errors::{FlowError, Result as FlowResult};
use flow::transition::TaskTransition;
use flow::{EngineConfig, OutputDescription, Step, StepFactory, StepRegistry, TransitionLogic, WorkplanContext};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// Trait que representa un tipo de paso de producción.
///
/// Cada implementación declara su `KIND` (la clave con la que el workplan lo
/// referencia), sus parámetros tipados y las salidas que puede tomar. El
/// trabajo real lo hace un equipo u operario fuera del motor: en ejecución el
/// paso retiene el token hasta que alguien informa el índice de salida.
pub trait ProductionStep: Send + Sync + 'static {
  type Parameters: Serialize + DeserializeOwned + Default + Send + Sync;

  /// Clave del tipo de paso
  const KIND: &'static str;

  /// Salidas del paso en orden de índice.
  fn outputs() -> Vec<OutputDescription>;

  /// Validacion de parámetros al cargar el workplan. Debe retornar
  /// `WorkflowError::Validation` si no se cumplen.
  fn validate(_params: &Self::Parameters) -> Result<(), WorkflowError> {
    Ok(())
  }

  /// Construye un `Step` sin cablear con los parámetros y las descripciones
  /// de salida de este tipo.
  fn step(name: impl Into<String>, params: &Self::Parameters) -> Result<Step, WorkflowError> {
    let mut step = Step::new(Self::KIND, name).with_parameters(serde_json::to_value(params)?);
    for description in Self::outputs() {
      step = step.describe(description);
    }
    Ok(step)
  }
}

/// Adapta un `ProductionStep` al registro del motor.
pub struct ProductionStepFactory<S> {
  _marker: PhantomData<fn() -> S>,
}

impl<S: ProductionStep> ProductionStepFactory<S> {
  pub fn new() -> Self {
    Self { _marker: PhantomData }
  }
}

impl<S: ProductionStep> Default for ProductionStepFactory<S> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S: ProductionStep> StepFactory for ProductionStepFactory<S> {
  fn kind(&self) -> &str {
    S::KIND
  }

  fn validate(&self, step: &Step, _registry: &StepRegistry) -> FlowResult<()> {
    let expected = S::outputs().len();
    if step.outputs.len() != expected {
      return Err(FlowError::Configuration(format!("el paso '{}' ({}) requiere {} salidas y tiene {}",
                                                  step.name,
                                                  S::KIND,
                                                  expected,
                                                  step.outputs.len())));
    }
    if step.inputs.is_empty() {
      return Err(FlowError::Configuration(format!("el paso '{}' no tiene entradas", step.name)));
    }
    let params: S::Parameters = step.parameters_as()?;
    S::validate(&params).map_err(|e| FlowError::Configuration(format!("paso '{}': {}", step.name, e)))
  }

  fn create(&self,
            step: &Step,
            _context: &Arc<dyn WorkplanContext>,
            _registry: &Arc<StepRegistry>,
            _config: &EngineConfig)
            -> FlowResult<Box<dyn TransitionLogic>> {
    Ok(Box::new(TaskTransition::new(step)))
  }
}
