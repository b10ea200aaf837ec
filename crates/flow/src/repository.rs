// Archivo: repository.rs
// Propósito: definir los contratos de persistencia del motor:
// `WorkplanRepository` (blueprints versionados) y `SnapshotStore` (capturas
// de ejecuciones pausadas).
use crate::errors::{FlowError, Result};
use crate::snapshot::Snapshot;
use crate::workplan::{Workplan, WorkplanState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadatos de un snapshot persistido.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub id: Uuid,
    /// Ejecución a la que pertenece el snapshot.
    pub run_id: Uuid,
    pub workplan_id: Uuid,
    pub workplan_version: u32,
    pub created_at: DateTime<Utc>,
}

/// Repositorio de workplans versionados.
///
/// Control optimista: guardar una versión anterior a la última conocida, o
/// cambiar el contenido de una versión ya publicada, devuelve
/// `FlowError::Conflict`. El historial publicado nunca se modifica; sólo se
/// admite su cambio de estado (por ejemplo `Released` -> `Revoked`).
pub trait WorkplanRepository: Send + Sync {
    /// Persiste `workplan` y devuelve la versión guardada.
    fn save_workplan(&self, workplan: &Workplan) -> Result<u32>;

    /// Última versión del workplan.
    fn load_workplan(&self, workplan_id: &Uuid) -> Result<Workplan>;

    /// Versión concreta del workplan.
    fn load_version(&self, workplan_id: &Uuid, version: u32) -> Result<Workplan>;

    /// Versiones guardadas, en orden ascendente.
    fn versions(&self, workplan_id: &Uuid) -> Result<Vec<u32>>;

    fn list_workplan_ids(&self) -> Result<Vec<Uuid>>;
}

/// Almacén de snapshots de ejecuciones.
pub trait SnapshotStore: Send + Sync {
    /// Guarda el snapshot de la ejecución `run_id` y devuelve su id.
    fn save_snapshot(&self, run_id: &Uuid, snapshot: &Snapshot) -> Result<Uuid>;

    /// Metadatos del snapshot más reciente de la ejecución, si existe.
    fn load_latest_snapshot(&self, run_id: &Uuid) -> Result<Option<SnapshotMeta>>;

    /// Carga un snapshot por id.
    fn load_snapshot(&self, snapshot_id: &Uuid) -> Result<(Snapshot, SnapshotMeta)>;
}

/// Regla de sobrescritura de una versión ya guardada.
///
/// Un borrador (`New`) puede reemplazarse libremente. Una versión publicada
/// sólo admite pasar a `Revoked` con la misma forma; cualquier otro guardado
/// sobre ella es `FlowError::Conflict`.
pub fn ensure_overwrite_allowed(stored: &Workplan, incoming: &Workplan) -> Result<()> {
    match (stored.state(), incoming.state()) {
        (WorkplanState::New, _) => Ok(()),
        (WorkplanState::Released, WorkplanState::Revoked) if stored.fingerprint()? == incoming.fingerprint()? => Ok(()),
        (current, next) => Err(FlowError::Conflict(format!("workplan {} v{} está en estado {:?}; no se puede guardar \
                                                             como {:?}, cree una nueva versión",
                                                            incoming.id(),
                                                            incoming.version(),
                                                            current,
                                                            next))),
    }
}
