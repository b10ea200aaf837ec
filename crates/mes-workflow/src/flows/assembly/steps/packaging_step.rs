use crate::errors::WorkflowError;
use crate::step::ProductionStep;
use flow::OutputDescription;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagingParameters {
  pub box_size: String,
  pub units_per_box: u32,
}

impl Default for PackagingParameters {
  fn default() -> Self {
    PackagingParameters { box_size: "M".to_string(),
                          units_per_box: 1 }
  }
}

/// Embalaje final. Una sola salida: `packed`.
pub struct PackagingStep;

impl ProductionStep for PackagingStep {
  type Parameters = PackagingParameters;

  const KIND: &'static str = "packaging";

  fn outputs() -> Vec<OutputDescription> {
    vec![OutputDescription::success("packed")]
  }

  fn validate(params: &PackagingParameters) -> Result<(), WorkflowError> {
    if params.units_per_box == 0 {
      return Err(WorkflowError::Validation("units_per_box debe ser mayor que 0".into()));
    }
    Ok(())
  }
}
