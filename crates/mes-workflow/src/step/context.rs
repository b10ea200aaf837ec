use flow::{Step, WorkplanContext};
use std::collections::HashSet;
use uuid::Uuid;

/// Contexto de una ejecución de producción.
///
/// Identifica la orden que se fabrica y permite omitir pasos por nombre o por
/// tipo sin tocar el workplan publicado. El mismo contexto llega a los
/// subworkflows anidados.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
  run_id: Uuid,
  disabled_names: HashSet<String>,
  disabled_kinds: HashSet<String>,
}

impl RunContext {
  pub fn new() -> Self {
    Self { run_id: Uuid::new_v4(),
           ..Default::default() }
  }

  pub fn with_run_id(run_id: Uuid) -> Self {
    Self { run_id,
           ..Default::default() }
  }

  pub fn run_id(&self) -> Uuid {
    self.run_id
  }

  /// Omite el paso con ese nombre.
  pub fn disable_step(mut self, name: impl Into<String>) -> Self {
    self.disabled_names.insert(name.into());
    self
  }

  /// Omite todos los pasos de ese tipo.
  pub fn disable_kind(mut self, kind: impl Into<String>) -> Self {
    self.disabled_kinds.insert(kind.into());
    self
  }
}

impl WorkplanContext for RunContext {
  fn is_disabled(&self, step: &Step) -> bool {
    self.disabled_names.contains(&step.name) || self.disabled_kinds.contains(&step.kind)
  }
}
