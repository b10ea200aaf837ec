// Ejemplo: una orden de montaje conducida por un "equipo" en otro hilo,
// con el predictor anunciando el resultado en cuanto queda determinado.
use flow::{Engine, EngineConfig, PathPredictor};
use mes_workflow::{production_registry, run_with_equipment, ProcessType, RunContext, WorkflowError, WorkplanFactory};
use std::sync::Arc;

fn main() -> Result<(), WorkflowError> {
  let workplan = Arc::new(WorkplanFactory::create(ProcessType::Assembly)?);
  let mut engine = Engine::new(workplan.clone(),
                               Arc::new(RunContext::new()),
                               Arc::new(production_registry()?),
                               EngineConfig::from_env())?;
  engine.on_transition_triggered(|t| println!("-> {} ({})", t.name, t.kind));
  let predictor = PathPredictor::new(workplan).on_prediction(|c| println!("predicción: {}", c));
  engine.add_monitor(Box::new(predictor));

  let place = run_with_equipment(&mut engine, |work| {
                println!("equipo trabajando en {} {:?}", work.step_name, work.outcomes);
                0
              })?;
  println!("terminado en {} ({})", place.name, place.classification);
  Ok(())
}
