#![allow(dead_code)]

use flow::transition::SubworkflowParameters;
use flow::{DefaultContext, ElementId, Engine, EngineConfig, NodeClassification, OutputDescription, Step, StepRegistry,
           Workplan, WorkplanContext};
use std::sync::{Arc, Mutex};

pub fn engine_for(wp: &Workplan) -> Engine {
  Engine::new(Arc::new(wp.clone()),
              Arc::new(DefaultContext),
              Arc::new(StepRegistry::with_builtins()),
              EngineConfig::default()).expect("engine")
}

pub fn engine_with(wp: &Workplan, context: Arc<dyn WorkplanContext>) -> Engine {
  Engine::new(Arc::new(wp.clone()), context, Arc::new(StepRegistry::with_builtins()), EngineConfig::default())
    .expect("engine")
}

/// Registra en `log` el nombre de cada transición disparada y la plaza de
/// terminación como `done:<nombre>`.
pub fn record_events(engine: &mut Engine) -> Arc<Mutex<Vec<String>>> {
  let log = Arc::new(Mutex::new(Vec::new()));
  let triggered = log.clone();
  engine.on_transition_triggered(move |t| triggered.lock().unwrap().push(t.name.clone()));
  let completed = log.clone();
  engine.on_completed(move |p| completed.lock().unwrap().push(format!("done:{}", p.name)));
  log
}

pub struct Paths {
  pub wp: Workplan,
  pub a: ElementId,
  pub end: ElementId,
}

/// start -> A(task) -> [c1, c2]; c1 -> B(pass) -> c2; c2 -> C(pass) -> end
pub fn paths() -> Paths {
  let mut wp = Workplan::new("paths");
  let start = wp.add_connector("start", NodeClassification::START).unwrap();
  let c1 = wp.add_connector("c1", NodeClassification::INTERMEDIATE).unwrap();
  let c2 = wp.add_connector("c2", NodeClassification::INTERMEDIATE).unwrap();
  let end = wp.add_connector("end", NodeClassification::END).unwrap();
  let a = wp.add_step(Step::new("task", "A").input(start).output(c1).output(c2)).unwrap();
  wp.add_step(Step::new("pass", "B").input(c1).output(c2)).unwrap();
  wp.add_step(Step::new("pass", "C").input(c2).output(end)).unwrap();
  Paths { wp, a, end }
}

pub struct Fork {
  pub wp: Workplan,
  pub t1: ElementId,
  pub t2: ElementId,
  pub j1: ElementId,
  pub j2: ElementId,
  pub end: ElementId,
}

/// start -> S(split) -> b1, b2; b1 -> T1(task) -> j1; b2 -> T2(task) -> j2;
/// J(join j1, j2) -> end
pub fn fork() -> Fork {
  let mut wp = Workplan::new("fork");
  let start = wp.add_connector("start", NodeClassification::START).unwrap();
  let b1 = wp.add_connector("b1", NodeClassification::INTERMEDIATE).unwrap();
  let b2 = wp.add_connector("b2", NodeClassification::INTERMEDIATE).unwrap();
  let j1 = wp.add_connector("j1", NodeClassification::INTERMEDIATE).unwrap();
  let j2 = wp.add_connector("j2", NodeClassification::INTERMEDIATE).unwrap();
  let end = wp.add_connector("end", NodeClassification::END).unwrap();
  wp.add_step(Step::new("split", "S").input(start).output(b1).output(b2)).unwrap();
  let t1 = wp.add_step(Step::new("task", "T1").input(b1).output(j1)).unwrap();
  let t2 = wp.add_step(Step::new("task", "T2").input(b2).output(j2)).unwrap();
  wp.add_step(Step::new("join", "J").input(j1).input(j2).output(end)).unwrap();
  Fork { wp, t1, t2, j1, j2, end }
}

pub struct Nested {
  pub wp: Workplan,
  pub quality: ElementId,
  pub inspect: ElementId,
  pub passed: ElementId,
  pub rejected: ElementId,
}

/// Interno: start -> inspect(task) -> [ok (END|EXIT), scrap (FAILED|EXIT)].
/// Externo: start -> quality(subworkflow) -> [passed (END), rejected (FAILED)].
pub fn nested() -> Nested {
  let mut inner = Workplan::new("inspection");
  let istart = inner.add_connector("start", NodeClassification::START).unwrap();
  let ok = inner.add_connector("ok", NodeClassification::END | NodeClassification::EXIT).unwrap();
  let scrap = inner.add_connector("scrap", NodeClassification::FAILED | NodeClassification::EXIT).unwrap();
  let inspect = inner.add_step(Step::new("task", "inspect").input(istart)
                                                           .output(ok)
                                                           .output(scrap)
                                                           .describe(OutputDescription::success("ok"))
                                                           .describe(OutputDescription::failure("scrap")))
                     .unwrap();

  let mut wp = Workplan::new("assembly");
  let start = wp.add_connector("start", NodeClassification::START).unwrap();
  let passed = wp.add_connector("passed", NodeClassification::END).unwrap();
  let rejected = wp.add_connector("rejected", NodeClassification::FAILED).unwrap();
  let params = serde_json::to_value(SubworkflowParameters { workplan: inner }).unwrap();
  let quality = wp.add_step(Step::new("subworkflow", "quality").input(start)
                                                               .output(passed)
                                                               .output(rejected)
                                                               .describe(OutputDescription::success("passed").mapped_to(ok))
                                                               .describe(OutputDescription::failure("rejected").mapped_to(scrap))
                                                               .with_parameters(params))
                  .unwrap();
  Nested { wp,
           quality,
           inspect,
           passed,
           rejected }
}
