// Archivo: errors.rs
// Propósito: definir los errores del motor de workplans y el alias Result<T>
// usado por las APIs del crate.
use crate::workplan::ElementId;
use thiserror::Error;

/// Errores comunes del motor.
///
/// - `NotFound`: entidad no encontrada (conector, paso, workplan, snapshot).
/// - `Conflict`: conflicto de versión o de estado del workplan.
/// - `Storage`: error al acceder al almacenamiento.
/// - `Configuration`: errores estructurales detectados al cargar o instanciar.
/// - `UnresolvedOutput`: una transición no pudo resolver su salida.
/// - `Precondition`: uso incorrecto de la API (pause/restore/resume).
/// - `Execution`: fallo durante la propagación de tokens.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Entidad no encontrada.
    #[error("No encontrado: {0}")]
    NotFound(String),
    /// Conflicto optimista (version/expected mismatch) o workplan inmutable.
    #[error("Conflicto: {0}")]
    Conflict(String),
    /// Error genérico de almacenamiento.
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
    /// Workplan mal formado: conector inexistente, tipo de paso desconocido,
    /// parámetros inválidos.
    #[error("Error de configuración: {0}")]
    Configuration(String),
    /// El resultado calculado por un paso no corresponde a ninguna salida.
    #[error("Salida no resoluble en el paso {step}: {detail}")]
    UnresolvedOutput { step: ElementId, detail: String },
    /// Precondición violada por el llamador.
    #[error("Precondición violada: {0}")]
    Precondition(String),
    /// Fallo de ejecución durante la propagación.
    #[error("Error de ejecución: {0}")]
    Execution(String),
    /// Error de serialización/deserialización JSON.
    #[error("Error de serialización: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Otro tipo de error.
    #[error("Otro: {0}")]
    Other(String),
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, FlowError>;
