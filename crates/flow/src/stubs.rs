// Archivo: stubs.rs
// Propósito: implementaciones en memoria para pruebas y wiring rápido.
//
// Guardan los documentos serializados en JSON, igual que lo haría un
// almacenamiento real, para que las pruebas ejerciten el round trip. No son
// durables.
use crate::errors::{FlowError, Result};
use crate::repository::{ensure_overwrite_allowed, SnapshotMeta, SnapshotStore, WorkplanRepository};
use crate::snapshot::Snapshot;
use crate::workplan::Workplan;
use chrono::Utc;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Helper para mapear `Mutex::lock()` en un `Result` con
/// `FlowError::Storage`.
fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    m.lock().map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))
}

/// Repositorio de workplans en memoria: id -> versión -> JSON.
#[derive(Debug, Default)]
pub struct InMemoryWorkplanRepository {
    workplans: Mutex<HashMap<Uuid, BTreeMap<u32, String>>>,
}

impl InMemoryWorkplanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkplanRepository for InMemoryWorkplanRepository {
    fn save_workplan(&self, workplan: &Workplan) -> Result<u32> {
        let mut workplans = lock(&self.workplans)?;
        let versions = workplans.entry(workplan.id()).or_default();
        if let Some((&latest, _)) = versions.last_key_value() {
            if workplan.version() < latest {
                return Err(FlowError::Conflict(format!("workplan {}: versión {} obsoleta (última {})",
                                                       workplan.id(),
                                                       workplan.version(),
                                                       latest)));
            }
        }
        if let Some(json) = versions.get(&workplan.version()) {
            ensure_overwrite_allowed(&Workplan::from_json(json)?, workplan)?;
        }
        versions.insert(workplan.version(), workplan.to_json()?);
        debug!("workplan {} v{} guardado ({:?})", workplan.id(), workplan.version(), workplan.state());
        Ok(workplan.version())
    }

    fn load_workplan(&self, workplan_id: &Uuid) -> Result<Workplan> {
        let workplans = lock(&self.workplans)?;
        let json = workplans.get(workplan_id)
                            .and_then(|v| v.last_key_value())
                            .map(|(_, json)| json)
                            .ok_or_else(|| FlowError::NotFound(format!("workplan {}", workplan_id)))?;
        Workplan::from_json(json)
    }

    fn load_version(&self, workplan_id: &Uuid, version: u32) -> Result<Workplan> {
        let workplans = lock(&self.workplans)?;
        let json = workplans.get(workplan_id)
                            .and_then(|v| v.get(&version))
                            .ok_or_else(|| FlowError::NotFound(format!("workplan {} v{}", workplan_id, version)))?;
        Workplan::from_json(json)
    }

    fn versions(&self, workplan_id: &Uuid) -> Result<Vec<u32>> {
        let workplans = lock(&self.workplans)?;
        workplans.get(workplan_id)
                 .map(|v| v.keys().copied().collect())
                 .ok_or_else(|| FlowError::NotFound(format!("workplan {}", workplan_id)))
    }

    fn list_workplan_ids(&self) -> Result<Vec<Uuid>> {
        let workplans = lock(&self.workplans)?;
        let mut ids: Vec<Uuid> = workplans.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Almacén de snapshots en memoria, en orden de guardado.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<Vec<(SnapshotMeta, String)>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.snapshots)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save_snapshot(&self, run_id: &Uuid, snapshot: &Snapshot) -> Result<Uuid> {
        let meta = SnapshotMeta { id: Uuid::new_v4(),
                                  run_id: *run_id,
                                  workplan_id: snapshot.workplan_id,
                                  workplan_version: snapshot.workplan_version,
                                  created_at: Utc::now() };
        let id = meta.id;
        lock(&self.snapshots)?.push((meta, snapshot.to_json()?));
        debug!("snapshot {} guardado para la ejecución {}", id, run_id);
        Ok(id)
    }

    fn load_latest_snapshot(&self, run_id: &Uuid) -> Result<Option<SnapshotMeta>> {
        let snapshots = lock(&self.snapshots)?;
        Ok(snapshots.iter()
                    .rev()
                    .map(|(meta, _)| meta)
                    .find(|meta| meta.run_id == *run_id)
                    .cloned())
    }

    fn load_snapshot(&self, snapshot_id: &Uuid) -> Result<(Snapshot, SnapshotMeta)> {
        let snapshots = lock(&self.snapshots)?;
        let (meta, json) = snapshots.iter()
                                    .find(|(meta, _)| meta.id == *snapshot_id)
                                    .ok_or_else(|| FlowError::NotFound(format!("snapshot {}", snapshot_id)))?;
        Ok((Snapshot::from_json(json)?, meta.clone()))
    }
}
