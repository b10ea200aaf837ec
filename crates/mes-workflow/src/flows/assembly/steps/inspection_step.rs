use crate::errors::WorkflowError;
use crate::step::ProductionStep;
use flow::OutputDescription;
use serde::{Deserialize, Serialize};

/// Parámetros de la inspección: comprobaciones a realizar y tolerancia
/// dimensional admitida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionParameters {
  pub checks: Vec<String>,
  pub tolerance_mm: f64,
}

impl Default for InspectionParameters {
  fn default() -> Self {
    InspectionParameters { checks: vec!["visual".to_string(), "dimensional".to_string()],
                           tolerance_mm: 0.05 }
  }
}

pub struct InspectionStep;

impl ProductionStep for InspectionStep {
  type Parameters = InspectionParameters;

  const KIND: &'static str = "inspection";

  fn outputs() -> Vec<OutputDescription> {
    vec![OutputDescription::success("passed"), OutputDescription::failure("failed")]
  }

  fn validate(params: &InspectionParameters) -> Result<(), WorkflowError> {
    if params.checks.is_empty() {
      return Err(WorkflowError::Validation("la inspección no define comprobaciones".into()));
    }
    if !(params.tolerance_mm >= 0.0) {
      return Err(WorkflowError::Validation(format!("tolerancia inválida: {}", params.tolerance_mm)));
    }
    Ok(())
  }
}
