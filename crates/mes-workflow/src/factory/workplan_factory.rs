use crate::errors::WorkflowError;
use crate::flows::assembly::{assembly_workplan, inspection_workplan};
use crate::process_type::ProcessType;
use flow::{Workplan, WorkplanRepository};
use std::collections::HashMap;
use uuid::Uuid;

/// Fábrica de workplans de proceso.
///
/// Crea los blueprints de ejemplo por tipo de proceso y lista los que ya
/// están en un repositorio. El tipo de proceso se deduce del nombre del
/// workplan.
pub struct WorkplanFactory;

impl WorkplanFactory {
  /// Crea un borrador (estado `New`) del proceso indicado.
  pub fn create(process: ProcessType) -> Result<Workplan, WorkflowError> {
    match process {
      ProcessType::Assembly => assembly_workplan(),
      ProcessType::Inspection => inspection_workplan(),
      ProcessType::Unknown => Err(WorkflowError::Validation("tipo de proceso desconocido".into())),
    }
  }

  /// Lista todos los workplans del repositorio y su tipo de proceso.
  pub fn catalog<R>(repo: &R) -> Result<HashMap<Uuid, ProcessType>, WorkflowError>
    where R: WorkplanRepository + ?Sized
  {
    let mut out = HashMap::new();
    for id in repo.list_workplan_ids()? {
      let process = match repo.load_workplan(&id) {
        Ok(wp) => wp.name().parse::<ProcessType>().unwrap_or_default(),
        Err(_) => ProcessType::Unknown,
      };
      out.insert(id, process);
    }
    Ok(out)
  }
}
