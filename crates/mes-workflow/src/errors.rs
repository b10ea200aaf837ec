use thiserror::Error;

// Errores comunes de la capa de producción.
//
// Centraliza los errores que pueden ocurrir al construir workplans de
// proceso, registrar pasos y conducir ejecuciones: errores del motor
// (`FlowError`), validaciones y errores de serializacion.
#[derive(Error, Debug)]
pub enum WorkflowError {
  /// Errores originados por el motor o la persistencia del crate `flow`.
  #[error("Error de flujo: {0}")]
  Flow(#[from] flow::errors::FlowError),

  /// Errores de serializacion/deserializacion JSON.
  #[error("Error de serializacion: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Errores de validacion local (parámetros de paso, tipo de proceso
  /// desconocido, ejecución bloqueada).
  #[error("Error de validacion: {0}")]
  Validation(String),

  /// Error generico: captura otros tipos de errores no tipados.
  #[error("Otro error: {0}")]
  Other(String),
}
