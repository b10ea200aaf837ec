// Archivo: service.rs
// Propósito: implementar `FlowService`, una capa orquestadora que publica
// workplans y arranca, suspende y reanuda ejecuciones contra el repositorio
// y el almacén de snapshots. Debe invocarse desde la capa de aplicación
// (CLI, workers).
use crate::config::EngineConfig;
use crate::context::WorkplanContext;
use crate::engine::{Engine, RunStatus};
use crate::errors::{FlowError, Result};
use crate::repository::{SnapshotStore, WorkplanRepository};
use crate::transition::StepRegistry;
use crate::validator::{validate, ValidationAspects};
use crate::workplan::{Workplan, WorkplanState};
use log::info;
use std::sync::Arc;
use uuid::Uuid;

/// Ejecución viva: su id, el motor y el estado tras la última ráfaga.
pub struct Run {
    pub id: Uuid,
    pub engine: Engine,
    pub status: RunStatus,
}

/// Servicio de alto nivel sobre workplans y ejecuciones.
pub struct FlowService<R, S>
    where R: WorkplanRepository,
          S: SnapshotStore
{
    repo: Arc<R>,
    snapshots: Arc<S>,
    registry: Arc<StepRegistry>,
    config: EngineConfig,
}

impl<R, S> FlowService<R, S>
    where R: WorkplanRepository,
          S: SnapshotStore
{
    pub fn new(repo: Arc<R>, snapshots: Arc<S>, registry: Arc<StepRegistry>, config: EngineConfig) -> Self {
        Self { repo,
               snapshots,
               registry,
               config }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn registry(&self) -> &Arc<StepRegistry> {
        &self.registry
    }

    /// Guarda un borrador (estado `New`).
    pub fn save_draft(&self, workplan: &Workplan) -> Result<u32> {
        self.repo.save_workplan(workplan)
    }

    /// Valida y publica la última versión del workplan.
    ///
    /// Falla con `Configuration` si el registro no acepta algún paso o si el
    /// validador encuentra problemas.
    pub fn publish(&self, workplan_id: &Uuid) -> Result<u32> {
        let mut workplan = self.repo.load_workplan(workplan_id)?;
        self.registry.check(&workplan)?;
        let report = validate(&workplan, ValidationAspects::ALL);
        if !report.success {
            return Err(FlowError::Configuration(report.print(&workplan)));
        }
        workplan.release()?;
        let version = self.repo.save_workplan(&workplan)?;
        info!("workplan {} v{} publicado", workplan.name(), version);
        Ok(version)
    }

    /// Arranca una ejecución de la última versión publicada.
    pub fn start_run(&self, workplan_id: &Uuid, context: Arc<dyn WorkplanContext>) -> Result<Run> {
        self.start_run_with(workplan_id, context, |_| {})
    }

    /// Como `start_run`; `attach` recibe el motor antes de la primera ráfaga
    /// para registrar monitores.
    pub fn start_run_with<F>(&self, workplan_id: &Uuid, context: Arc<dyn WorkplanContext>, attach: F) -> Result<Run>
        where F: FnOnce(&mut Engine)
    {
        let workplan = self.repo.load_workplan(workplan_id)?;
        if workplan.state() != WorkplanState::Released {
            return Err(FlowError::Precondition(format!("el workplan {} v{} no está publicado ({:?})",
                                                       workplan.name(),
                                                       workplan.version(),
                                                       workplan.state())));
        }
        let mut engine = self.engine_for(workplan, context)?;
        attach(&mut engine);
        let status = engine.start()?;
        let id = Uuid::new_v4();
        info!("ejecución {} iniciada: {:?}", id, status);
        Ok(Run { id, engine, status })
    }

    /// Pausa la ejecución y guarda su snapshot. Devuelve el id del snapshot.
    pub fn suspend_run(&self, run: &mut Run) -> Result<Uuid> {
        let snapshot = run.engine.pause()?;
        let snapshot_id = self.snapshots.save_snapshot(&run.id, &snapshot)?;
        info!("ejecución {} suspendida en snapshot {}", run.id, snapshot_id);
        Ok(snapshot_id)
    }

    /// Reconstruye la ejecución `run_id` desde su último snapshot y la
    /// continúa. Usa la versión del workplan con la que se pausó.
    pub fn resume_run(&self, run_id: &Uuid, context: Arc<dyn WorkplanContext>) -> Result<Run> {
        self.resume_run_with(run_id, context, |_| {})
    }

    /// Como `resume_run`, con `attach` aplicado antes de restaurar.
    pub fn resume_run_with<F>(&self, run_id: &Uuid, context: Arc<dyn WorkplanContext>, attach: F) -> Result<Run>
        where F: FnOnce(&mut Engine)
    {
        let meta = self.snapshots
                       .load_latest_snapshot(run_id)?
                       .ok_or_else(|| FlowError::NotFound(format!("snapshot de la ejecución {}", run_id)))?;
        let (snapshot, meta) = self.snapshots.load_snapshot(&meta.id)?;
        let workplan = self.repo.load_version(&meta.workplan_id, meta.workplan_version)?;
        let mut engine = self.engine_for(workplan, context)?;
        attach(&mut engine);
        engine.restore(snapshot)?;
        let status = engine.start()?;
        info!("ejecución {} reanudada: {:?}", run_id, status);
        Ok(Run { id: *run_id,
                 engine,
                 status })
    }

    fn engine_for(&self, workplan: Workplan, context: Arc<dyn WorkplanContext>) -> Result<Engine> {
        Engine::new(Arc::new(workplan), context, self.registry.clone(), self.config.clone())
    }
}
