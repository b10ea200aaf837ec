use flow::errors::FlowError;
use flow::{DefaultContext, Engine, EngineConfig, NodeClassification, OutputDescription, PathPredictor, RunStatus, Step,
           StepRegistry, Workplan};
use std::sync::Arc;

fn main() -> Result<(), FlowError> {
    // Workplan: start -> split -> (marcar, pulir) -> join -> inspeccionar -> [ok, scrap]
    let mut wp = Workplan::new("example");
    let start = wp.add_connector("start", NodeClassification::START)?;
    let a = wp.add_connector("a", NodeClassification::INTERMEDIATE)?;
    let b = wp.add_connector("b", NodeClassification::INTERMEDIATE)?;
    let a_done = wp.add_connector("a-done", NodeClassification::INTERMEDIATE)?;
    let b_done = wp.add_connector("b-done", NodeClassification::INTERMEDIATE)?;
    let merged = wp.add_connector("merged", NodeClassification::INTERMEDIATE)?;
    let ok = wp.add_connector("ok", NodeClassification::END)?;
    let scrap = wp.add_connector("scrap", NodeClassification::FAILED)?;
    wp.add_step(Step::new("split", "fork").input(start).output(a).output(b))?;
    wp.add_step(Step::new("task", "mark").input(a).output(a_done))?;
    wp.add_step(Step::new("task", "polish").input(b).output(b_done))?;
    wp.add_step(Step::new("join", "merge").input(a_done).input(b_done).output(merged))?;
    wp.add_step(Step::new("task", "inspect").input(merged)
                                            .output(ok)
                                            .output(scrap)
                                            .describe(OutputDescription::success("ok"))
                                            .describe(OutputDescription::failure("scrap")))?;
    wp.release()?;
    println!("workplan {} v{} ({})\n", wp.name(), wp.version(), wp.fingerprint()?);

    let wp = Arc::new(wp);
    let mut engine = Engine::new(wp.clone(),
                                 Arc::new(DefaultContext),
                                 Arc::new(StepRegistry::with_builtins()),
                                 EngineConfig::from_env())?;
    engine.on_transition_triggered(|t| println!("triggered: {} ({})", t.name, t.kind));
    engine.on_completed(|p| println!("completed at {} [{}]", p.name, p.classification));
    engine.add_monitor(Box::new(PathPredictor::new(wp.clone()).on_prediction(|c| println!("prediction: {}", c))));

    let mut status = engine.start()?;
    // Resolver el trabajo pendiente con la primera salida de cada paso
    while status == RunStatus::Suspended {
        let pending = engine.pending_work();
        let Some(work) = pending.first() else {
            println!("sin trabajo pendiente; la ejecución está bloqueada");
            break;
        };
        println!("resume {} -> {}", work.step_name, work.outcomes[0]);
        if work.step_name == "polish" {
            // pausar a mitad de camino y continuar en un motor nuevo
            let snapshot = engine.pause()?;
            println!("snapshot:\n{}\n", snapshot.to_json()?);
            engine = Engine::new(wp.clone(),
                                 Arc::new(DefaultContext),
                                 Arc::new(StepRegistry::with_builtins()),
                                 EngineConfig::default())?;
            engine.restore(snapshot)?;
            engine.start()?;
        }
        status = engine.resume(&work.path, 0)?;
    }
    println!("final status: {:?}", status);
    Ok(())
}
