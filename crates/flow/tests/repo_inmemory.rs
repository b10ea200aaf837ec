mod common;

use flow::{DefaultContext, EngineConfig, FlowError, FlowService, InMemorySnapshotStore, InMemoryWorkplanRepository,
           NodeClassification, RunStatus, SnapshotStore, Step, StepRegistry, Workplan, WorkplanRepository,
           WorkplanState};
use std::sync::Arc;
use uuid::Uuid;

#[test]
fn repository_keeps_published_history() {
  let repo = InMemoryWorkplanRepository::new();
  let mut wp = common::paths().wp;
  assert_eq!(repo.save_workplan(&wp).expect("draft"), 1);
  wp.set_name("paths v1").unwrap();
  repo.save_workplan(&wp).expect("los borradores se pueden sobrescribir");
  wp.release().unwrap();
  repo.save_workplan(&wp).expect("publicar");

  // mismo número de versión con otro contenido
  let mut draft = wp.new_version();
  draft.add_connector("extra", NodeClassification::INTERMEDIATE).unwrap();
  let mut doc: serde_json::Value = serde_json::from_str(&draft.to_json().unwrap()).unwrap();
  doc["version"] = serde_json::json!(1);
  doc["state"] = serde_json::json!("Released");
  let tampered = Workplan::from_json(&doc.to_string()).unwrap();
  assert!(matches!(repo.save_workplan(&tampered), Err(FlowError::Conflict(_))));

  let mut next = wp.new_version();
  next.add_connector("extra", NodeClassification::INTERMEDIATE).unwrap();
  assert_eq!(repo.save_workplan(&next).unwrap(), 2);
  assert!(matches!(repo.save_workplan(&wp), Err(FlowError::Conflict(_))), "versión obsoleta");

  assert_eq!(repo.versions(&wp.id()).unwrap(), vec![1, 2]);
  assert_eq!(repo.load_workplan(&wp.id()).unwrap().version(), 2);
  let v1 = repo.load_version(&wp.id(), 1).unwrap();
  assert_eq!(v1.state(), WorkplanState::Released);
  assert_eq!(v1.name(), "paths v1");
  assert_eq!(repo.list_workplan_ids().unwrap(), vec![wp.id()]);
  assert!(matches!(repo.load_version(&wp.id(), 9), Err(FlowError::NotFound(_))));
  assert!(matches!(repo.load_workplan(&Uuid::new_v4()), Err(FlowError::NotFound(_))));
}

#[test]
fn revoking_a_released_version_is_allowed() {
  let repo = InMemoryWorkplanRepository::new();
  let mut wp = common::paths().wp;
  wp.release().unwrap();
  repo.save_workplan(&wp).unwrap();
  wp.revoke().unwrap();
  repo.save_workplan(&wp).expect("cambio de estado");
  assert_eq!(repo.load_workplan(&wp.id()).unwrap().state(), WorkplanState::Revoked);
}

#[test]
fn stale_draft_cannot_overwrite_its_release() {
  let repo = InMemoryWorkplanRepository::new();
  let draft = common::paths().wp;
  repo.save_workplan(&draft).unwrap();
  let mut released = draft.clone();
  released.release().unwrap();
  repo.save_workplan(&released).unwrap();

  assert!(matches!(repo.save_workplan(&draft), Err(FlowError::Conflict(_))));
  assert_eq!(repo.load_version(&draft.id(), 1).unwrap().state(), WorkplanState::Released);

  // revocar cambiando la forma tampoco vale
  let mut reshaped = draft.clone();
  reshaped.add_connector("extra", NodeClassification::INTERMEDIATE).unwrap();
  reshaped.release().unwrap();
  reshaped.revoke().unwrap();
  assert!(matches!(repo.save_workplan(&reshaped), Err(FlowError::Conflict(_))));
  assert_eq!(repo.load_workplan(&draft.id()).unwrap(), released);
}

#[test]
fn snapshot_store_returns_the_latest_per_run() {
  let fork = common::fork();
  let store = InMemorySnapshotStore::new();
  let run = Uuid::new_v4();
  assert!(store.load_latest_snapshot(&run).unwrap().is_none());

  let mut engine = common::engine_for(&fork.wp);
  engine.start().unwrap();
  let first = engine.pause().unwrap();
  let first_id = store.save_snapshot(&run, &first).unwrap();

  let mut engine = common::engine_for(&fork.wp);
  engine.restore(first.clone()).unwrap();
  engine.start().unwrap();
  engine.resume(&[fork.t1], 0).unwrap();
  let second = engine.pause().unwrap();
  let second_id = store.save_snapshot(&run, &second).unwrap();
  store.save_snapshot(&Uuid::new_v4(), &first).unwrap();

  let latest = store.load_latest_snapshot(&run).unwrap().expect("latest");
  assert_eq!(latest.id, second_id);
  assert_eq!(latest.workplan_id, fork.wp.id());
  let (loaded, meta) = store.load_snapshot(&first_id).unwrap();
  assert_eq!(meta.run_id, run);
  assert_eq!(loaded, first);
  assert_eq!(store.len().unwrap(), 3);
  assert!(matches!(store.load_snapshot(&Uuid::new_v4()), Err(FlowError::NotFound(_))));
}

#[test]
fn service_runs_suspends_and_resumes() {
  let service = FlowService::new(Arc::new(InMemoryWorkplanRepository::new()),
                                 Arc::new(InMemorySnapshotStore::new()),
                                 Arc::new(StepRegistry::with_builtins()),
                                 EngineConfig::default());
  let fork = common::fork();
  let id = fork.wp.id();
  service.save_draft(&fork.wp).unwrap();
  assert!(matches!(service.start_run(&id, Arc::new(DefaultContext)), Err(FlowError::Precondition(_))));
  assert_eq!(service.publish(&id).unwrap(), 1);

  let mut run = service.start_run(&id, Arc::new(DefaultContext)).unwrap();
  assert_eq!(run.status, RunStatus::Suspended);
  run.engine.resume(&[fork.t2], 0).unwrap();
  service.suspend_run(&mut run).unwrap();

  let mut resumed = service.resume_run(&run.id, Arc::new(DefaultContext)).unwrap();
  assert_eq!(resumed.id, run.id);
  assert_eq!(resumed.status, RunStatus::Suspended);
  let status = resumed.engine.resume(&[fork.t1], 0).unwrap();
  assert!(matches!(status, RunStatus::Completed(p) if p.id == fork.end));
}

#[test]
fn service_monitors_see_the_first_burst() {
  let service = FlowService::new(Arc::new(InMemoryWorkplanRepository::new()),
                                 Arc::new(InMemorySnapshotStore::new()),
                                 Arc::new(StepRegistry::with_builtins()),
                                 EngineConfig::default());
  let fork = common::fork();
  let id = fork.wp.id();
  service.save_draft(&fork.wp).unwrap();
  service.publish(&id).unwrap();

  let mut events = None;
  let mut run = service.start_run_with(&id, Arc::new(DefaultContext), |e| events = Some(common::record_events(e)))
                       .unwrap();
  let events = events.expect("monitor");
  assert_eq!(*events.lock().unwrap(), vec!["S"]);
  run.engine.resume(&[fork.t2], 0).unwrap();
  service.suspend_run(&mut run).unwrap();

  let mut restored = None;
  let mut resumed = service.resume_run_with(&run.id, Arc::new(DefaultContext), |e| {
                             restored = Some(common::record_events(e))
                           })
                           .unwrap();
  let restored = restored.expect("monitor");
  assert!(restored.lock().unwrap().is_empty());
  resumed.engine.resume(&[fork.t1], 0).unwrap();
  assert_eq!(*restored.lock().unwrap(), vec!["T1", "J", "done:end"]);
}

#[test]
fn publish_rejects_invalid_workplans() {
  let service = FlowService::new(Arc::new(InMemoryWorkplanRepository::new()),
                                 Arc::new(InMemorySnapshotStore::new()),
                                 Arc::new(StepRegistry::with_builtins()),
                                 EngineConfig::default());
  let mut wp = Workplan::new("dead-end");
  let start = wp.add_connector("start", NodeClassification::START).unwrap();
  let stuck = wp.add_connector("stuck", NodeClassification::INTERMEDIATE).unwrap();
  wp.add_step(Step::new("task", "mount").input(start).output(stuck)).unwrap();
  service.save_draft(&wp).unwrap();

  let err = service.publish(&wp.id()).unwrap_err();
  assert!(matches!(err, FlowError::Configuration(ref msg) if msg.contains("stuck")));
  assert_eq!(service.repository().load_workplan(&wp.id()).unwrap().state(), WorkplanState::New);
}
