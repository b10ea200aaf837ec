mod common;

use flow::{Engine, EngineConfig, FlowError, Instantiator, NodeClassification, OutputDescription, RunStatus, Step,
           StepRegistry, Workplan, WorkplanContext};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct CountingContext {
  calls: AtomicUsize,
}

impl WorkplanContext for CountingContext {
  fn is_disabled(&self, _step: &Step) -> bool {
    self.calls.fetch_add(1, Ordering::SeqCst);
    false
  }
}

struct DisableByName(HashSet<String>);

impl WorkplanContext for DisableByName {
  fn is_disabled(&self, step: &Step) -> bool {
    self.0.contains(&step.name)
  }
}

#[test]
fn instance_has_one_place_per_connector_and_one_transition_per_step() {
  let fork = common::fork();
  let counting = Arc::new(CountingContext::default());
  let context: Arc<dyn WorkplanContext> = counting.clone();
  let registry = Arc::new(StepRegistry::with_builtins());

  let instance = Instantiator::instantiate(&fork.wp, &context, &registry, &EngineConfig::default()).expect("instantiate");

  assert_eq!(instance.places.len(), fork.wp.connectors().len());
  assert_eq!(instance.transitions.len(), fork.wp.steps().len());
  assert_eq!(counting.calls.load(Ordering::SeqCst), fork.wp.steps().len());
  let expected = Arc::as_ptr(&context) as *const ();
  for transition in &instance.transitions {
    assert_eq!(Arc::as_ptr(transition.context()) as *const (), expected);
  }
  let ends: Vec<_> = instance.end_places().map(|p| p.id()).collect();
  assert_eq!(ends, vec![fork.end]);
}

#[test]
fn dangling_connector_from_json_fails_fast() {
  let paths = common::paths();
  let mut doc: serde_json::Value = serde_json::from_str(&paths.wp.to_json().unwrap()).unwrap();
  doc["steps"][1]["outputs"][0] = serde_json::json!(999);
  let wp = Workplan::from_json(&doc.to_string()).expect("el JSON es válido");

  let err = Engine::new(Arc::new(wp),
                        Arc::new(flow::DefaultContext),
                        Arc::new(StepRegistry::with_builtins()),
                        EngineConfig::default()).err()
                                                .expect("debe fallar");
  assert!(matches!(err, FlowError::Configuration(_)), "{err}");
}

#[test]
fn add_step_rejects_unknown_connector() {
  let mut wp = Workplan::new("bad");
  wp.add_connector("start", NodeClassification::START).unwrap();
  let err = wp.add_step(Step::new("pass", "p").input(42)).unwrap_err();
  assert!(matches!(err, FlowError::Configuration(_)));
}

#[test]
fn disabled_step_passes_through_default_output() {
  let mut wp = Workplan::new("skip");
  let start = wp.add_connector("start", NodeClassification::START).unwrap();
  let scrap = wp.add_connector("scrap", NodeClassification::FAILED).unwrap();
  let done = wp.add_connector("done", NodeClassification::END).unwrap();
  wp.add_step(Step::new("task", "inspect").input(start)
                                          .output(scrap)
                                          .output(done)
                                          .describe(OutputDescription::failure("scrap"))
                                          .describe(OutputDescription::success("ok")))
    .unwrap();

  let context = Arc::new(DisableByName(HashSet::from(["inspect".to_string()])));
  let mut engine = common::engine_with(&wp, context);
  match engine.start().expect("start") {
    RunStatus::Completed(place) => assert_eq!(place.id, done),
    other => panic!("se esperaba terminación, llegó {other:?}"),
  }
}

#[test]
fn split_and_join_cannot_be_disabled() {
  let fork = common::fork();
  let context = Arc::new(DisableByName(HashSet::from(["S".to_string(), "J".to_string()])));
  let mut engine = common::engine_with(&fork.wp, context);
  assert_eq!(engine.start().unwrap(), RunStatus::Suspended);
  assert_eq!(engine.pending_work().len(), 2);
}

#[test]
fn transitions_are_initialized_once() {
  let paths = common::paths();
  let context: Arc<dyn WorkplanContext> = Arc::new(flow::DefaultContext);
  let registry = Arc::new(StepRegistry::with_builtins());
  let mut instance = Instantiator::instantiate(&paths.wp, &context, &registry, &EngineConfig::default()).unwrap();
  instance.transitions[0].initialize(0, &mut instance.places).expect("primera vez");
  let err = instance.transitions[0].initialize(0, &mut instance.places).unwrap_err();
  assert!(matches!(err, FlowError::Precondition(_)));
}
