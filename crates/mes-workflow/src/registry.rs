use crate::errors::WorkflowError;
use crate::flows::assembly::steps::{AssemblyStep, InspectionStep, PackagingStep};
use crate::step::ProductionStepFactory;
use flow::StepRegistry;

/// Registro con los tipos integrados del motor más los pasos de producción
/// de este crate.
pub fn production_registry() -> Result<StepRegistry, WorkflowError> {
  let mut registry = StepRegistry::with_builtins();
  registry.register(ProductionStepFactory::<AssemblyStep>::new())?;
  registry.register(ProductionStepFactory::<InspectionStep>::new())?;
  registry.register(ProductionStepFactory::<PackagingStep>::new())?;
  Ok(registry)
}
