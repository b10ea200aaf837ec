mod common;

use flow::transition::SubworkflowParameters;
use flow::{Engine, EngineConfig, EngineState, FlowError, NodeClassification, OutputDescription, RunStatus, Step,
           StepRegistry, Workplan};
use std::sync::{Arc, Mutex};

fn completed_at(status: RunStatus) -> u64 {
  match status {
    RunStatus::Completed(place) => place.id,
    RunStatus::Suspended => panic!("la ejecución sigue suspendida"),
  }
}

#[test]
fn resume_result_selects_the_path() {
  let paths = common::paths();

  let mut short = common::engine_for(&paths.wp);
  let events = common::record_events(&mut short);
  assert_eq!(short.start().unwrap(), RunStatus::Suspended);
  assert_eq!(completed_at(short.resume(&[paths.a], 1).unwrap()), paths.end);
  assert_eq!(*events.lock().unwrap(), vec!["A", "C", "done:end"]);

  let mut long = common::engine_for(&paths.wp);
  let events = common::record_events(&mut long);
  long.start().unwrap();
  assert_eq!(completed_at(long.resume(&[paths.a], 0).unwrap()), paths.end);
  assert_eq!(*events.lock().unwrap(), vec!["A", "B", "C", "done:end"]);
  assert_eq!(long.state(), EngineState::Completed);
}

#[test]
fn join_waits_for_every_branch_in_either_order() {
  for first_t2 in [false, true] {
    let fork = common::fork();
    let mut engine = common::engine_for(&fork.wp);
    let events = common::record_events(&mut engine);
    assert_eq!(engine.start().unwrap(), RunStatus::Suspended);
    assert_eq!(engine.pending_work().len(), 2);

    let (first, second) = if first_t2 { (fork.t2, fork.t1) } else { (fork.t1, fork.t2) };
    assert_eq!(engine.resume(&[first], 0).unwrap(), RunStatus::Suspended);
    assert!(!events.lock().unwrap().contains(&"J".to_string()));

    assert_eq!(completed_at(engine.resume(&[second], 0).unwrap()), fork.end);
    let events = events.lock().unwrap();
    assert_eq!(events.iter().filter(|e| *e == "J").count(), 1);
    assert_eq!(&events[events.len() - 2..], &["J".to_string(), "done:end".to_string()]);
  }
}

#[test]
fn consumed_tokens_are_reported_per_place() {
  let fork = common::fork();
  let mut engine = common::engine_for(&fork.wp);
  let removed = Arc::new(Mutex::new(Vec::new()));
  let sink = removed.clone();
  engine.on_token_removed(move |r| sink.lock().unwrap().push(r.name.clone()));

  engine.start().unwrap();
  assert_eq!(*removed.lock().unwrap(), vec!["start", "b1", "b2"]);
  engine.resume(&[fork.t1], 0).unwrap();
  engine.resume(&[fork.t2], 0).unwrap();
  assert_eq!(*removed.lock().unwrap(), vec!["start", "b1", "b2", "j1", "j2"]);
}

#[test]
fn one_sided_arrival_leaves_tokens_in_place() {
  let fork = common::fork();
  let mut engine = common::engine_for(&fork.wp);
  engine.start().unwrap();
  engine.resume(&[fork.t1], 0).unwrap();

  let waiting = engine.place(fork.j1).unwrap().tokens();
  assert_eq!(waiting.len(), 1);
  assert!(waiting[0].is_split());
  assert!(engine.place(fork.j2).unwrap().tokens().is_empty());
  assert!(engine.place(fork.end).unwrap().tokens().is_empty());
  assert_eq!(engine.state(), EngineState::Suspended);
}

#[test]
fn unresolvable_result_fails_without_losing_the_token() {
  let paths = common::paths();
  let mut engine = common::engine_for(&paths.wp);
  engine.start().unwrap();

  let err = engine.resume(&[paths.a], 5).unwrap_err();
  assert!(matches!(err, FlowError::UnresolvedOutput { step, .. } if step == paths.a));
  assert_eq!(engine.pending_work().len(), 1);
  assert_eq!(completed_at(engine.resume(&[paths.a], 1).unwrap()), paths.end);
}

#[test]
fn resuming_an_idle_step_is_a_precondition_error() {
  let fork = common::fork();
  let mut engine = common::engine_for(&fork.wp);
  engine.start().unwrap();
  engine.resume(&[fork.t1], 0).unwrap();
  let err = engine.resume(&[fork.t1], 0).unwrap_err();
  assert!(matches!(err, FlowError::Precondition(_)));
  let err = engine.resume(&[12345], 0).unwrap_err();
  assert!(matches!(err, FlowError::NotFound(_)));
}

#[test]
fn pending_work_describes_the_held_step() {
  let paths = common::paths();
  let mut engine = common::engine_for(&paths.wp);
  engine.start().unwrap();
  let pending = engine.pending_work();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].path, vec![paths.a]);
  assert_eq!(pending[0].step_name, "A");
  assert_eq!(pending[0].outcomes, vec!["output-0", "output-1"]);
}

#[test]
fn pass_only_cycle_trips_the_activation_limit() {
  let mut wp = Workplan::new("loop");
  let start = wp.add_connector("start", NodeClassification::START).unwrap();
  let mid = wp.add_connector("mid", NodeClassification::INTERMEDIATE).unwrap();
  wp.add_step(Step::new("pass", "there").input(start).output(mid)).unwrap();
  wp.add_step(Step::new("pass", "back").input(mid).output(start)).unwrap();

  let mut engine = Engine::new(Arc::new(wp),
                               Arc::new(flow::DefaultContext),
                               Arc::new(StepRegistry::with_builtins()),
                               EngineConfig { max_activations: 50 }).unwrap();
  let err = engine.start().unwrap_err();
  assert!(matches!(err, FlowError::Execution(_)));
  assert_eq!(engine.state(), EngineState::Faulted);
}

#[test]
fn nested_cycle_uses_the_outer_activation_limit() {
  let mut inner = Workplan::new("inner-loop");
  let start = inner.add_connector("start", NodeClassification::START).unwrap();
  let mid = inner.add_connector("mid", NodeClassification::INTERMEDIATE).unwrap();
  let exit = inner.add_connector("exit", NodeClassification::END | NodeClassification::EXIT).unwrap();
  inner.add_step(Step::new("pass", "there").input(start).output(mid)).unwrap();
  inner.add_step(Step::new("pass", "back").input(mid).output(start).output(exit)).unwrap();

  let mut outer = Workplan::new("outer");
  let begin = outer.add_connector("start", NodeClassification::START).unwrap();
  let end = outer.add_connector("end", NodeClassification::END).unwrap();
  let params = serde_json::to_value(SubworkflowParameters { workplan: inner }).unwrap();
  outer.add_step(Step::new("subworkflow", "spin").input(begin)
                                                 .output(end)
                                                 .describe(OutputDescription::success("done").mapped_to(exit))
                                                 .with_parameters(params))
       .unwrap();

  let mut engine = Engine::new(Arc::new(outer),
                               Arc::new(flow::DefaultContext),
                               Arc::new(StepRegistry::with_builtins()),
                               EngineConfig { max_activations: 10 }).unwrap();
  let err = engine.start().unwrap_err();
  assert!(matches!(err, FlowError::Execution(ref msg) if msg.contains("límite de 10 ")), "{:?}", err);
  assert_eq!(engine.state(), EngineState::Faulted);
}

#[test]
fn dispose_lifecycle() {
  let paths = common::paths();
  let mut fresh = common::engine_for(&paths.wp);
  fresh.dispose().expect("no-op sobre un motor nuevo");
  assert_eq!(fresh.state(), EngineState::Created);

  let mut engine = common::engine_for(&paths.wp);
  engine.start().unwrap();
  engine.dispose().expect("dispose");
  assert_eq!(engine.state(), EngineState::Disposed);
  assert!(engine.places().iter().all(|p| p.subscribers().is_empty()));
  assert!(matches!(engine.dispose().unwrap_err(), FlowError::Precondition(_)));
  assert!(matches!(engine.start().unwrap_err(), FlowError::Precondition(_)));
}

#[test]
fn start_on_terminal_start_place_completes_immediately() {
  let mut wp = Workplan::new("trivial");
  let start = wp.add_connector("start", NodeClassification::START | NodeClassification::END).unwrap();
  let mut engine = common::engine_for(&wp);
  assert_eq!(completed_at(engine.start().unwrap()), start);
}

#[test]
fn handle_resumes_from_another_thread() {
  fn assert_send<T: Send>() {}
  assert_send::<Engine>();

  let paths = common::paths();
  let mut engine = common::engine_for(&paths.wp);
  engine.start().unwrap();
  let handle = engine.handle();
  let step = paths.a;
  std::thread::spawn(move || handle.resume(vec![step], 0).expect("send")).join()
                                                                          .unwrap();
  assert_eq!(completed_at(engine.process_commands().unwrap()), paths.end);
}

#[test]
fn nested_subworkflow_resolves_outer_output() {
  let nested = common::nested();
  let mut engine = common::engine_for(&nested.wp);
  assert_eq!(engine.start().unwrap(), RunStatus::Suspended);
  let pending = engine.pending_work();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].path, vec![nested.quality, nested.inspect]);
  assert_eq!(pending[0].outcomes, vec!["ok", "scrap"]);

  match engine.resume(&pending[0].path, 1).unwrap() {
    RunStatus::Completed(place) => {
      assert_eq!(place.id, nested.rejected);
      assert_eq!(place.classification, NodeClassification::FAILED);
    }
    other => panic!("{other:?}"),
  }
}
