use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use flow::{Engine, EngineConfig, FlowService, PathPredictor, RunStatus, Run, WorkplanContext, WorkplanRepository,
           validate, ValidationAspects};
use log::info;
use mes_workflow::{production_registry, FileSnapshotStore, FileWorkplanRepository, ProcessType, RunContext,
                   WorkplanFactory};
use uuid::Uuid;

type Service = FlowService<FileWorkplanRepository, FileSnapshotStore>;

/// Pequeño menú interactivo para operar workplans y ejecuciones sobre el
/// almacenamiento en disco de `mes-workflow`.
///
/// El directorio de datos se toma de `MES_DATA_DIR` (por defecto
/// `./mes-data`). El nivel de log se controla con `RUST_LOG`.
///
/// Opciones soportadas:
/// 1) Ver workplans
/// 2) Crear workplan de proceso
/// 3) Validar y publicar
/// 4) Iniciar ejecución
/// 5) Trabajo pendiente / reportar resultado
/// 6) Suspender ejecución
/// 7) Reanudar ejecución
/// 8) Salir
fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let dir = std::env::var("MES_DATA_DIR").unwrap_or_else(|_| "./mes-data".into());
    let service: Service = FlowService::new(Arc::new(FileWorkplanRepository::open(&dir)?),
                                            Arc::new(FileSnapshotStore::open(&dir)?),
                                            Arc::new(production_registry()?),
                                            EngineConfig::from_env());
    info!("datos en {}", dir);
    let mut current: Option<Run> = None;

    loop {
        println!("\n== MES workflow menu ==");
        println!("1) Ver workplans");
        println!("2) Crear workplan de proceso");
        println!("3) Validar y publicar workplan");
        println!("4) Iniciar ejecución");
        println!("5) Ver trabajo pendiente y reportar resultado");
        println!("6) Suspender ejecución (snapshot a disco)");
        println!("7) Reanudar ejecución desde disco");
        println!("8) Salir");
        print!("Elige una opción: ");
        io::stdout().flush().ok();

        let mut choice = String::new();
        io::stdin().read_line(&mut choice)?;
        match choice.trim() {
            "1" => {
                let repo = service.repository();
                match repo.list_workplan_ids() {
                    Ok(ids) => {
                        println!("\nID                                   | VERSIONES | ESTADO     | NOMBRE");
                        println!("-----------------------------------------------------------------------------");
                        for id in ids {
                            let versions = repo.versions(&id).unwrap_or_default();
                            match repo.load_workplan(&id) {
                                Ok(wp) => println!("{} | {:?} | {:?} | {}", id, versions, wp.state(), wp.name()),
                                Err(e) => println!("{} | {:?} | error: {}", id, versions, e),
                            }
                        }
                    }
                    Err(e) => eprintln!("Error listando workplans: {}", e),
                }
            }
            "2" => {
                let kind = prompt("Tipo de proceso (assembly/inspection): ")?;
                let process = kind.trim().parse::<ProcessType>().unwrap_or_default();
                match WorkplanFactory::create(process).and_then(|wp| Ok((service.save_draft(&wp)?, wp))) {
                    Ok((version, wp)) => println!("Workplan creado: {} v{}", wp.id(), version),
                    Err(e) => eprintln!("Error creando workplan: {}", e),
                }
            }
            "3" => {
                let Some(id) = prompt_uuid("Workplan id (UUID): ")? else { continue };
                if let Ok(wp) = service.repository().load_workplan(&id) {
                    let report = validate(&wp, ValidationAspects::ALL);
                    if !report.success {
                        println!("{}", report.print(&wp));
                    }
                }
                match service.publish(&id) {
                    Ok(version) => println!("Publicado: {} v{}", id, version),
                    Err(e) => eprintln!("Error publicando: {}", e),
                }
            }
            "4" => {
                let Some(id) = prompt_uuid("Workplan id (UUID): ")? else { continue };
                match service.start_run_with(&id, context()?, watch) {
                    Ok(run) => {
                        println!("Ejecución iniciada: {} ({:?})", run.id, run.status);
                        current = Some(run);
                    }
                    Err(e) => eprintln!("Error iniciando ejecución: {}", e),
                }
            }
            "5" => {
                let Some(run) = current.as_mut() else {
                    eprintln!("No hay ejecución activa");
                    continue;
                };
                let pending = run.engine.pending_work();
                if pending.is_empty() {
                    println!("Sin trabajo pendiente ({:?})", run.status);
                    continue;
                }
                for (i, work) in pending.iter().enumerate() {
                    println!("[{}] {} ({}) salidas: {:?}", i, work.step_name, work.kind, work.outcomes);
                }
                let idx: usize = match prompt("Trabajo a completar: ")?.trim().parse() {
                    Ok(n) if n < pending.len() => n,
                    _ => { eprintln!("Índice inválido"); continue; }
                };
                let result: usize = match prompt("Índice de salida: ")?.trim().parse() {
                    Ok(n) => n,
                    Err(_) => { eprintln!("Salida inválida"); continue; }
                };
                match run.engine.resume(&pending[idx].path, result) {
                    Ok(status) => {
                        if let RunStatus::Completed(place) = &status {
                            println!("Ejecución terminada en {} ({})", place.name, place.classification);
                        }
                        run.status = status;
                    }
                    Err(e) => eprintln!("Error reportando resultado: {}", e),
                }
            }
            "6" => {
                let Some(mut run) = current.take() else {
                    eprintln!("No hay ejecución activa");
                    continue;
                };
                match service.suspend_run(&mut run) {
                    Ok(snapshot) => println!("Ejecución {} suspendida (snapshot {})", run.id, snapshot),
                    Err(e) => {
                        eprintln!("Error suspendiendo: {}", e);
                        current = Some(run);
                    }
                }
            }
            "7" => {
                let Some(run_id) = prompt_uuid("Run id (UUID): ")? else { continue };
                match service.resume_run_with(&run_id, context()?, watch) {
                    Ok(run) => {
                        println!("Ejecución reanudada: {} ({:?})", run.id, run.status);
                        current = Some(run);
                    }
                    Err(e) => eprintln!("Error reanudando: {}", e),
                }
            }
            "8" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

/// Contexto de la ejecución: pregunta qué pasos omitir.
fn context() -> io::Result<Arc<dyn WorkplanContext>> {
    let skip = prompt("Pasos a omitir separados por coma (enter para ninguno): ")?;
    let ctx = skip.split(',')
                  .map(str::trim)
                  .filter(|s| !s.is_empty())
                  .fold(RunContext::new(), |ctx, name| ctx.disable_step(name));
    Ok(Arc::new(ctx))
}

/// Engancha un predictor que anuncia el resultado por consola.
fn watch(engine: &mut Engine) {
    let predictor = PathPredictor::new(engine.workplan().clone())
        .on_prediction(|outcome| println!("Predicción: la ejecución terminará en {}", outcome));
    engine.add_monitor(Box::new(predictor));
}

fn prompt_uuid(msg: &str) -> io::Result<Option<Uuid>> {
    let s = prompt(msg)?;
    match Uuid::parse_str(s.trim()) {
        Ok(u) => Ok(Some(u)),
        Err(_) => {
            eprintln!("UUID inválido");
            Ok(None)
        }
    }
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
