use crate::errors::WorkflowError;
use crate::step::ProductionStep;
use flow::OutputDescription;
use serde::{Deserialize, Serialize};

/// Parámetros de un montaje en estación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyParameters {
  pub station: String,
  /// Par de apriete en newton-metro.
  pub torque_nm: f64,
}

impl Default for AssemblyParameters {
  fn default() -> Self {
    AssemblyParameters { station: "estacion-1".to_string(),
                         torque_nm: 12.0 }
  }
}

/// Montaje de un subconjunto. Salidas: `assembled` (0) y `assembly-failed` (1).
pub struct AssemblyStep;

impl ProductionStep for AssemblyStep {
  type Parameters = AssemblyParameters;

  const KIND: &'static str = "assembly";

  fn outputs() -> Vec<OutputDescription> {
    vec![OutputDescription::success("assembled"), OutputDescription::failure("assembly-failed")]
  }

  fn validate(params: &AssemblyParameters) -> Result<(), WorkflowError> {
    if params.station.trim().is_empty() {
      return Err(WorkflowError::Validation("la estación de montaje está vacía".into()));
    }
    // también rechaza NaN
    if !(params.torque_nm > 0.0) {
      return Err(WorkflowError::Validation(format!("par de apriete inválido: {}", params.torque_nm)));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_non_positive_torque() {
    let params = AssemblyParameters { torque_nm: 0.0,
                                      ..Default::default() };
    assert!(matches!(AssemblyStep::validate(&params), Err(WorkflowError::Validation(_))));
    assert!(AssemblyStep::validate(&AssemblyParameters::default()).is_ok());
  }
}
