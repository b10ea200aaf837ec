// Archivo: registry.rs
// Propósito: registro explícito que asocia el `kind` declarado por un paso con
// la fábrica de su transición. Se consulta al cargar el workplan, no por
// reflexión en tiempo de ejecución.
use super::{JoinFactory, PassFactory, SplitFactory, SubworkflowFactory, TaskFactory, TransitionLogic};
use crate::config::EngineConfig;
use crate::context::WorkplanContext;
use crate::errors::{FlowError, Result};
use crate::workplan::{Step, Workplan};
use indexmap::IndexMap;
use std::sync::Arc;

/// Claves de los tipos de paso integrados.
pub mod kinds {
    pub const PASS: &str = "pass";
    pub const TASK: &str = "task";
    pub const SPLIT: &str = "split";
    pub const JOIN: &str = "join";
    pub const SUBWORKFLOW: &str = "subworkflow";
}

/// Fábrica de transiciones para un tipo de paso.
pub trait StepFactory: Send + Sync {
    /// Clave con la que los pasos declaran este tipo.
    fn kind(&self) -> &str;

    /// Comprobación de carga: forma de slots, parámetros, etc.
    fn validate(&self, _step: &Step, _registry: &StepRegistry) -> Result<()> {
        Ok(())
    }

    /// Crea la lógica de la transición para una ejecución. `config` es la
    /// configuración del motor que la ejecuta.
    fn create(&self,
              step: &Step,
              context: &Arc<dyn WorkplanContext>,
              registry: &Arc<StepRegistry>,
              config: &EngineConfig)
              -> Result<Box<dyn TransitionLogic>>;

    /// Si el contexto puede desactivar pasos de este tipo. Los tipos
    /// estructurales (split/join) no se omiten.
    fn skippable(&self) -> bool {
        true
    }
}

/// Registro de tipos de paso.
pub struct StepRegistry {
    factories: IndexMap<String, Arc<dyn StepFactory>>,
}

impl StepRegistry {
    /// Registro vacío.
    pub fn new() -> Self {
        Self { factories: IndexMap::new() }
    }

    /// Registro con los tipos integrados: pass, task, split, join y
    /// subworkflow.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [Arc<dyn StepFactory>; 5] = [Arc::new(PassFactory),
                                                   Arc::new(TaskFactory::new(kinds::TASK)),
                                                   Arc::new(SplitFactory),
                                                   Arc::new(JoinFactory),
                                                   Arc::new(SubworkflowFactory)];
        for factory in builtins {
            registry.factories.insert(factory.kind().to_string(), factory);
        }
        registry
    }

    /// Registra una fábrica. Un `kind` repetido es un conflicto.
    pub fn register<F>(&mut self, factory: F) -> Result<()>
        where F: StepFactory + 'static
    {
        let kind = factory.kind().to_string();
        if self.factories.contains_key(&kind) {
            return Err(FlowError::Conflict(format!("el tipo de paso '{}' ya está registrado", kind)));
        }
        self.factories.insert(kind, Arc::new(factory));
        Ok(())
    }

    pub fn factory(&self, kind: &str) -> Result<&Arc<dyn StepFactory>> {
        self.factories
            .get(kind)
            .ok_or_else(|| FlowError::Configuration(format!("tipo de paso desconocido: '{}'", kind)))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(|k| k.as_str())
    }

    /// Verifica que todos los pasos del workplan tienen un tipo conocido y
    /// una configuración aceptada por su fábrica.
    pub fn check(&self, workplan: &Workplan) -> Result<()> {
        for step in workplan.steps() {
            self.factory(&step.kind)?.validate(step, self)?;
        }
        Ok(())
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_kind_is_rejected() {
        let mut registry = StepRegistry::with_builtins();
        let err = registry.register(TaskFactory::new(kinds::TASK)).unwrap_err();
        assert!(matches!(err, FlowError::Conflict(_)));
        registry.register(TaskFactory::new("inspection")).expect("nuevo tipo");
        assert!(registry.kinds().any(|k| k == "inspection"));
    }

    #[test]
    fn unknown_kind_fails_check() {
        let mut wp = Workplan::new("unknown");
        let start = wp.add_connector("start", crate::workplan::NodeClassification::START).unwrap();
        wp.add_step(Step::new("welding", "weld").input(start)).unwrap();
        let err = StepRegistry::with_builtins().check(&wp).unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));
    }
}
