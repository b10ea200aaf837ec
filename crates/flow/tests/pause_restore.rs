mod common;

use flow::{DefaultContext, ElementId, Engine, EngineConfig, EngineState, FireOutcome, FlowError, HolderState,
           NodeClassification, PendingWork, RunStatus, Snapshot, Step, StepFactory, StepRegistry, Token, TransitionIo,
           TransitionLogic, Workplan, WorkplanContext};
use serde_json::json;
use std::sync::Arc;

fn roundtrip(snapshot: &Snapshot) -> Snapshot {
  Snapshot::from_json(&snapshot.to_json().expect("to_json")).expect("from_json")
}

#[test]
fn restored_engine_continues_like_the_uninterrupted_one() {
  let fork = common::fork();

  let mut reference = common::engine_for(&fork.wp);
  reference.start().unwrap();
  reference.resume(&[fork.t1], 0).unwrap();
  let expected = reference.resume(&[fork.t2], 0).unwrap();

  let mut engine = common::engine_for(&fork.wp);
  engine.start().unwrap();
  engine.resume(&[fork.t1], 0).unwrap();
  let snapshot = engine.pause().expect("pause");
  assert_eq!(engine.state(), EngineState::Paused);

  let waiting = snapshot.holder(fork.j1).expect("tokens en la barrera");
  assert_eq!(waiting.holder_state, HolderState::Place);
  assert_eq!(waiting.tokens.len(), 1);
  let held = snapshot.holder(fork.t2).expect("tarea retenida");
  assert_eq!(held.holder_state, HolderState::Task);
  assert!(snapshot.holder(fork.t1).is_none());

  let mut restored = common::engine_for(&fork.wp);
  restored.restore(roundtrip(&snapshot)).expect("restore");
  assert_eq!(restored.state(), EngineState::Restored);
  assert_eq!(restored.place(fork.j1).unwrap().tokens(), waiting.tokens.as_slice());

  let events = common::record_events(&mut restored);
  assert_eq!(restored.start().unwrap(), RunStatus::Suspended);
  assert!(events.lock().unwrap().is_empty());
  assert_eq!(restored.pending_work().len(), 1);
  assert_eq!(restored.resume(&[fork.t2], 0).unwrap(), expected);
  assert_eq!(*events.lock().unwrap(), vec!["T2", "J", "done:end"]);
}

#[test]
fn nested_subworkflow_state_survives_pause() {
  let nested = common::nested();
  let path = vec![nested.quality, nested.inspect];

  let mut engine = common::engine_for(&nested.wp);
  engine.start().unwrap();
  let snapshot = roundtrip(&engine.pause().unwrap());

  let holder = snapshot.holder(nested.quality).expect("subworkflow");
  assert_eq!(holder.tokens.len(), 1);
  match &holder.holder_state {
    HolderState::Subworkflow { snapshot: inner } => {
      let task = inner.holder(nested.inspect).expect("tarea interna");
      assert_eq!(task.holder_state, HolderState::Task);
      assert_eq!(task.tokens, holder.tokens);
    }
    other => panic!("{other:?}"),
  }

  let mut restored = common::engine_for(&nested.wp);
  restored.restore(snapshot.clone()).unwrap();
  assert_eq!(restored.pending_work()[0].path, path);
  assert_eq!(restored.start().unwrap(), RunStatus::Suspended);

  // pausar de nuevo tras restaurar captura los mismos tokens
  let again = restored.pause().unwrap();
  let held = |s: &Snapshot| s.holders.iter().map(|h| (h.holder_id, h.tokens.clone())).collect::<Vec<_>>();
  assert_eq!(held(&again), held(&snapshot));

  let mut last = common::engine_for(&nested.wp);
  last.restore(again).unwrap();
  last.start().unwrap();
  match last.resume(&path, 0).unwrap() {
    RunStatus::Completed(place) => assert_eq!(place.id, nested.passed),
    other => panic!("{other:?}"),
  }
}

#[test]
fn pause_and_restore_misuse_is_rejected() {
  let fork = common::fork();
  let mut fresh = common::engine_for(&fork.wp);
  assert!(matches!(fresh.pause().unwrap_err(), FlowError::Precondition(_)));

  let mut engine = common::engine_for(&fork.wp);
  engine.start().unwrap();
  let snapshot = engine.pause().unwrap();
  assert!(matches!(engine.pause().unwrap_err(), FlowError::Precondition(_)));
  assert!(matches!(engine.resume(&[fork.t1], 0).unwrap_err(), FlowError::Precondition(_)));

  let mut started = common::engine_for(&fork.wp);
  started.start().unwrap();
  assert!(matches!(started.restore(snapshot.clone()).unwrap_err(), FlowError::Precondition(_)));

  let other = common::paths();
  let mut foreign = common::engine_for(&other.wp);
  assert!(matches!(foreign.restore(snapshot).unwrap_err(), FlowError::Precondition(_)));
  assert_eq!(foreign.state(), EngineState::Created);
}

#[test]
fn completed_run_cannot_be_paused() {
  let paths = common::paths();
  let mut engine = common::engine_for(&paths.wp);
  engine.start().unwrap();
  engine.resume(&[paths.a], 1).unwrap();
  assert!(matches!(engine.pause().unwrap_err(), FlowError::Precondition(_)));
}

/// Paso de terceros que exige dos confirmaciones antes de soltar el token.
struct DoubleCheck {
  confirmed: u64,
  held: Vec<Token>,
}

impl TransitionLogic for DoubleCheck {
  fn fire(&mut self, io: &mut TransitionIo<'_>) -> flow::Result<FireOutcome> {
    if !self.held.is_empty() {
      return Ok(FireOutcome::Idle);
    }
    let Some((input, token)) = io.first_available() else {
      return Ok(FireOutcome::Idle);
    };
    io.take(input, &token);
    self.held.push(token);
    Ok(FireOutcome::Held)
  }

  fn held(&self) -> &[Token] {
    &self.held
  }

  fn capture(&mut self) -> flow::Result<HolderState> {
    Ok(HolderState::Custom { state: json!({ "confirmed": self.confirmed }) })
  }

  fn restore(&mut self, tokens: Vec<Token>, state: HolderState) -> flow::Result<()> {
    match state {
      HolderState::Custom { state } => {
        self.confirmed = state["confirmed"].as_u64().unwrap_or(0);
        self.held = tokens;
        Ok(())
      }
      other => Err(FlowError::Precondition(format!("{other:?}"))),
    }
  }

  fn resume(&mut self, _path: &[ElementId], result: usize, io: &mut TransitionIo<'_>) -> flow::Result<FireOutcome> {
    self.confirmed += 1;
    if self.confirmed < 2 {
      return Ok(FireOutcome::Held);
    }
    let token = self.held.remove(0);
    io.emit(result, token)?;
    Ok(FireOutcome::Fired)
  }

  fn pending_work(&self, path: &[ElementId], out: &mut Vec<PendingWork>) {
    out.extend(self.held.iter().map(|token| PendingWork { path: path.to_vec(),
                                                           step_name: "check".into(),
                                                           kind: "double-check".into(),
                                                           token: token.clone(),
                                                           outcomes: vec!["ok".into()] }));
  }
}

struct DoubleCheckFactory;

impl StepFactory for DoubleCheckFactory {
  fn kind(&self) -> &str {
    "double-check"
  }

  fn create(&self,
            _step: &Step,
            _context: &Arc<dyn WorkplanContext>,
            _registry: &Arc<StepRegistry>,
            _config: &EngineConfig)
            -> flow::Result<Box<dyn TransitionLogic>> {
    Ok(Box::new(DoubleCheck { confirmed: 0, held: Vec::new() }))
  }
}

#[test]
fn custom_step_state_survives_pause() {
  let mut wp = Workplan::new("custom");
  let start = wp.add_connector("start", NodeClassification::START).unwrap();
  let end = wp.add_connector("end", NodeClassification::END).unwrap();
  let check = wp.add_step(Step::new("double-check", "check").input(start).output(end)).unwrap();

  let mut registry = StepRegistry::with_builtins();
  registry.register(DoubleCheckFactory).unwrap();
  let registry = Arc::new(registry);
  let build = || {
    Engine::new(Arc::new(wp.clone()), Arc::new(DefaultContext), registry.clone(), EngineConfig::default()).unwrap()
  };

  let mut engine = build();
  assert_eq!(engine.start().unwrap(), RunStatus::Suspended);
  assert_eq!(engine.resume(&[check], 0).unwrap(), RunStatus::Suspended);
  let snapshot = roundtrip(&engine.pause().unwrap());

  let holder = snapshot.holder(check).expect("paso propio");
  assert_eq!(holder.holder_state, HolderState::Custom { state: json!({ "confirmed": 1 }) });
  assert_eq!(holder.tokens.len(), 1);

  let mut restored = build();
  restored.restore(snapshot).unwrap();
  restored.start().unwrap();
  assert_eq!(restored.pending_work()[0].kind, "double-check");
  match restored.resume(&[check], 0).unwrap() {
    RunStatus::Completed(place) => assert_eq!(place.id, end),
    other => panic!("{other:?}"),
  }
}
