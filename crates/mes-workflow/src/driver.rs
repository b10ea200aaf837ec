// driver.rs
//
// Conductores de ejecución: resuelven el trabajo pendiente de un motor hasta
// que la ejecución termina. La decisión (índice de salida) la toma un
// callback que representa al operario o al equipo.
use crate::errors::WorkflowError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use flow::{CompletedPlace, ElementId, Engine, EngineConfig, EngineState, PendingWork, RunStatus, StepRegistry, Token,
           Workplan, WorkplanContext};
use log::{debug, info};
use rayon::prelude::*;
use std::sync::Arc;
use std::thread;

/// Arranca (o continúa) el motor según su estado.
fn begin(engine: &mut Engine) -> Result<RunStatus, WorkflowError> {
  match engine.state() {
    EngineState::Created | EngineState::Restored => Ok(engine.start()?),
    EngineState::Suspended => Ok(engine.process_commands()?),
    other => Err(WorkflowError::Validation(format!("no se puede conducir un motor en estado {:?}", other))),
  }
}

fn blocked(engine: &Engine) -> WorkflowError {
  WorkflowError::Validation(format!("la ejecución de {} está bloqueada sin trabajo pendiente",
                                    engine.workplan().name()))
}

/// Conduce la ejecución en el hilo actual. Resuelve el trabajo pendiente de
/// uno en uno, en el orden de `Engine::pending_work`.
pub fn run_to_completion<F>(engine: &mut Engine, mut decide: F) -> Result<CompletedPlace, WorkflowError>
  where F: FnMut(&PendingWork) -> usize
{
  let mut status = begin(engine)?;
  loop {
    match status {
      RunStatus::Completed(place) => return Ok(place),
      RunStatus::Suspended => {
        let pending = engine.pending_work();
        let work = pending.first().ok_or_else(|| blocked(engine))?;
        let result = decide(work);
        debug!("{} ({:?}) -> {}", work.step_name, work.path, result);
        status = engine.resume(&work.path, result)?;
      }
    }
  }
}

/// Ejecuta una orden por contexto en paralelo sobre el pool de rayon. Cada
/// orden tiene su propio motor; el workplan y el registro se comparten.
pub fn run_batch<F>(workplan: Arc<Workplan>,
                    contexts: Vec<Arc<dyn WorkplanContext>>,
                    registry: Arc<StepRegistry>,
                    config: EngineConfig,
                    decide: F)
                    -> Vec<Result<CompletedPlace, WorkflowError>>
  where F: Fn(&PendingWork) -> usize + Send + Sync
{
  info!("lote de {} órdenes para {}", contexts.len(), workplan.name());
  contexts.into_par_iter()
          .map(|context| -> Result<CompletedPlace, WorkflowError> {
            let mut engine = Engine::new(workplan.clone(), context, registry.clone(), config.clone())?;
            run_to_completion(&mut engine, &decide)
          })
          .collect()
}

type WorkKey = (Vec<ElementId>, Token);

/// Conduce la ejecución con un equipo que trabaja en otro hilo.
///
/// El equipo recibe cada trabajo pendiente por un canal, informa el
/// resultado con `EngineHandle::resume` y avisa de que terminó. El hilo
/// dueño del motor aplica las órdenes con `Engine::process_commands`.
pub fn run_with_equipment<F>(engine: &mut Engine, equipment: F) -> Result<CompletedPlace, WorkflowError>
  where F: Fn(&PendingWork) -> usize + Send + 'static
{
  let handle = engine.handle();
  let (job_tx, job_rx) = unbounded::<PendingWork>();
  let (done_tx, done_rx) = unbounded::<WorkKey>();
  let worker = thread::spawn(move || {
    for work in job_rx.iter() {
      let result = equipment(&work);
      let key = (work.path.clone(), work.token.clone());
      if handle.resume(work.path, result).is_err() || done_tx.send(key).is_err() {
        break;
      }
    }
  });

  let outcome = drive(engine, &job_tx, &done_rx);
  drop(job_tx);
  worker.join()
        .map_err(|_| WorkflowError::Other("el hilo del equipo terminó con pánico".into()))?;
  outcome
}

fn drive(engine: &mut Engine, jobs: &Sender<PendingWork>, done: &Receiver<WorkKey>) -> Result<CompletedPlace, WorkflowError> {
  let mut status = begin(engine)?;
  let mut in_flight: Vec<WorkKey> = Vec::new();
  loop {
    if let RunStatus::Completed(place) = status {
      return Ok(place);
    }
    for work in engine.pending_work() {
      let key = (work.path.clone(), work.token.clone());
      if !in_flight.contains(&key) {
        in_flight.push(key);
        jobs.send(work)
            .map_err(|_| WorkflowError::Other("el equipo se desconectó".into()))?;
      }
    }
    if in_flight.is_empty() {
      return Err(blocked(engine));
    }
    let key = done.recv()
                  .map_err(|_| WorkflowError::Other("el equipo se desconectó".into()))?;
    in_flight.retain(|k| *k != key);
    status = engine.process_commands()?;
  }
}
