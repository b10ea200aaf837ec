// Archivo: context.rs
// Propósito: contexto por ejecución que el llamador pasa al instanciar un
// workplan. Permite desactivar pasos sin modificar el blueprint.
use crate::workplan::Step;

/// Contexto de una ejecución. La misma instancia (`Arc`) llega a todas las
/// transiciones creadas para esa ejecución.
pub trait WorkplanContext: Send + Sync {
    /// `true` si el paso debe omitirse en esta ejecución.
    fn is_disabled(&self, _step: &Step) -> bool {
        false
    }
}

/// Contexto sin pasos desactivados.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultContext;

impl WorkplanContext for DefaultContext {}
