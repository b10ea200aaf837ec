// file_store.rs
//
// Persistencia en disco para workplans y snapshots. Cada documento es un
// fichero JSON; la estructura de directorios es:
//
//   <raíz>/workplans/<workplan_id>/<versión>.json
//   <raíz>/snapshots/<snapshot_id>.json
//
// Las escrituras de un mismo proceso se serializan con un mutex; no hay
// bloqueo entre procesos.
use crate::errors::WorkflowError;
use chrono::Utc;
use flow::errors::{FlowError, Result as FlowResult};
use flow::{ensure_overwrite_allowed, Snapshot, SnapshotMeta, SnapshotStore, Workplan, WorkplanRepository};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

fn lock<T>(m: &Mutex<T>) -> FlowResult<MutexGuard<'_, T>> {
  m.lock().map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))
}

fn storage(path: &Path, e: io::Error) -> FlowError {
  FlowError::Storage(format!("{}: {}", path.display(), e))
}

/// Lee un fichero; `Ok(None)` si no existe.
fn read_optional(path: &Path) -> FlowResult<Option<String>> {
  match fs::read_to_string(path) {
    Ok(s) => Ok(Some(s)),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(storage(path, e)),
  }
}

/// Escribe vía fichero temporal + rename para no dejar documentos a medias.
fn write_atomic(path: &Path, contents: &str) -> FlowResult<()> {
  let tmp = path.with_extension("json.tmp");
  fs::write(&tmp, contents).map_err(|e| storage(&tmp, e))?;
  fs::rename(&tmp, path).map_err(|e| storage(path, e))
}

/// Ficheros `.json` de un directorio; vacío si el directorio no existe.
fn json_files(dir: &Path) -> FlowResult<Vec<PathBuf>> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(storage(dir, e)),
  };
  let mut files = Vec::new();
  for entry in entries {
    let path = entry.map_err(|e| storage(dir, e))?.path();
    if path.extension().is_some_and(|ext| ext == "json") {
      files.push(path);
    }
  }
  Ok(files)
}

/// Repositorio de workplans versionados en disco. Mismas reglas de conflicto
/// que `flow::InMemoryWorkplanRepository` (`ensure_overwrite_allowed`).
#[derive(Debug)]
pub struct FileWorkplanRepository {
  root: PathBuf,
  write: Mutex<()>,
}

impl FileWorkplanRepository {
  /// Abre (o crea) el repositorio bajo `dir`.
  pub fn open(dir: impl AsRef<Path>) -> Result<Self, WorkflowError> {
    let root = dir.as_ref().join("workplans");
    fs::create_dir_all(&root).map_err(|e| storage(&root, e))?;
    Ok(Self { root,
              write: Mutex::new(()) })
  }

  fn workplan_dir(&self, id: &Uuid) -> PathBuf {
    self.root.join(id.to_string())
  }

  fn version_path(&self, id: &Uuid, version: u32) -> PathBuf {
    self.workplan_dir(id).join(format!("{}.json", version))
  }
}

impl WorkplanRepository for FileWorkplanRepository {
  fn save_workplan(&self, workplan: &Workplan) -> FlowResult<u32> {
    let _guard = lock(&self.write)?;
    let id = workplan.id();
    if let Some(latest) = self.versions(&id).ok().and_then(|v| v.last().copied()) {
      if workplan.version() < latest {
        return Err(FlowError::Conflict(format!("workplan {}: versión {} obsoleta (última {})",
                                               id,
                                               workplan.version(),
                                               latest)));
      }
    }
    let path = self.version_path(&id, workplan.version());
    if let Some(json) = read_optional(&path)? {
      ensure_overwrite_allowed(&Workplan::from_json(&json)?, workplan)?;
    }
    let dir = self.workplan_dir(&id);
    fs::create_dir_all(&dir).map_err(|e| storage(&dir, e))?;
    write_atomic(&path, &workplan.to_json()?)?;
    debug!("workplan {} v{} guardado en {}", id, workplan.version(), path.display());
    Ok(workplan.version())
  }

  fn load_workplan(&self, workplan_id: &Uuid) -> FlowResult<Workplan> {
    let latest = self.versions(workplan_id)?
                     .last()
                     .copied()
                     .ok_or_else(|| FlowError::NotFound(format!("workplan {}", workplan_id)))?;
    self.load_version(workplan_id, latest)
  }

  fn load_version(&self, workplan_id: &Uuid, version: u32) -> FlowResult<Workplan> {
    let json = read_optional(&self.version_path(workplan_id, version))?
                 .ok_or_else(|| FlowError::NotFound(format!("workplan {} v{}", workplan_id, version)))?;
    Workplan::from_json(&json)
  }

  fn versions(&self, workplan_id: &Uuid) -> FlowResult<Vec<u32>> {
    let mut versions: Vec<u32> = json_files(&self.workplan_dir(workplan_id))?
                                   .iter()
                                   .filter_map(|p| p.file_stem().and_then(|s| s.to_str()))
                                   .filter_map(|s| s.parse().ok())
                                   .collect();
    if versions.is_empty() {
      return Err(FlowError::NotFound(format!("workplan {}", workplan_id)));
    }
    versions.sort_unstable();
    Ok(versions)
  }

  fn list_workplan_ids(&self) -> FlowResult<Vec<Uuid>> {
    let entries = fs::read_dir(&self.root).map_err(|e| storage(&self.root, e))?;
    let mut ids = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|e| storage(&self.root, e))?;
      if let Some(id) = entry.file_name().to_str().and_then(|s| Uuid::parse_str(s).ok()) {
        ids.push(id);
      }
    }
    ids.sort();
    Ok(ids)
  }
}

/// Documento persistido por `FileSnapshotStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSnapshot {
  meta: SnapshotMeta,
  /// Orden de guardado; decide cuál es el último de una ejecución.
  sequence: u64,
  snapshot: Snapshot,
}

/// Almacén de snapshots en disco, un fichero por snapshot.
#[derive(Debug)]
pub struct FileSnapshotStore {
  root: PathBuf,
  write: Mutex<()>,
}

impl FileSnapshotStore {
  pub fn open(dir: impl AsRef<Path>) -> Result<Self, WorkflowError> {
    let root = dir.as_ref().join("snapshots");
    fs::create_dir_all(&root).map_err(|e| storage(&root, e))?;
    Ok(Self { root,
              write: Mutex::new(()) })
  }

  fn path(&self, id: &Uuid) -> PathBuf {
    self.root.join(format!("{}.json", id))
  }

  fn read_all(&self) -> FlowResult<Vec<StoredSnapshot>> {
    let mut out = Vec::new();
    for path in json_files(&self.root)? {
      let json = fs::read_to_string(&path).map_err(|e| storage(&path, e))?;
      out.push(serde_json::from_str(&json)?);
    }
    Ok(out)
  }

  /// Número de snapshots guardados.
  pub fn len(&self) -> Result<usize, WorkflowError> {
    Ok(json_files(&self.root)?.len())
  }

  pub fn is_empty(&self) -> Result<bool, WorkflowError> {
    Ok(self.len()? == 0)
  }
}

impl SnapshotStore for FileSnapshotStore {
  fn save_snapshot(&self, run_id: &Uuid, snapshot: &Snapshot) -> FlowResult<Uuid> {
    let _guard = lock(&self.write)?;
    let sequence = self.read_all()?.iter().map(|s| s.sequence).max().map_or(0, |s| s + 1);
    let meta = SnapshotMeta { id: Uuid::new_v4(),
                              run_id: *run_id,
                              workplan_id: snapshot.workplan_id,
                              workplan_version: snapshot.workplan_version,
                              created_at: Utc::now() };
    let id = meta.id;
    let doc = StoredSnapshot { meta,
                               sequence,
                               snapshot: snapshot.clone() };
    write_atomic(&self.path(&id), &serde_json::to_string_pretty(&doc)?)?;
    debug!("snapshot {} (#{}) guardado para la ejecución {}", id, sequence, run_id);
    Ok(id)
  }

  fn load_latest_snapshot(&self, run_id: &Uuid) -> FlowResult<Option<SnapshotMeta>> {
    Ok(self.read_all()?
           .into_iter()
           .filter(|s| s.meta.run_id == *run_id)
           .max_by_key(|s| s.sequence)
           .map(|s| s.meta))
  }

  fn load_snapshot(&self, snapshot_id: &Uuid) -> FlowResult<(Snapshot, SnapshotMeta)> {
    let json = read_optional(&self.path(snapshot_id))?
                 .ok_or_else(|| FlowError::NotFound(format!("snapshot {}", snapshot_id)))?;
    let doc: StoredSnapshot = serde_json::from_str(&json)?;
    Ok((doc.snapshot, doc.meta))
  }
}
