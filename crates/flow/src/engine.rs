// Archivo: engine.rs
// Propósito: motor de ejecución de un workplan. Posee plazas, transiciones y
// la cola de trabajo; propaga tokens hasta la quietud y gestiona el ciclo de
// vida de la ejecución (inicio, reanudación, pausa, restauración, liberación).
use crate::agenda::Agenda;
use crate::config::EngineConfig;
use crate::context::WorkplanContext;
use crate::errors::{FlowError, Result};
use crate::instantiator::{Instance, Instantiator};
use crate::place::Place;
use crate::snapshot::{HolderSnapshot, HolderState, Snapshot};
use crate::token::Token;
use crate::transition::{FireOutcome, PendingWork, StepRegistry, Transition};
use crate::workplan::{ElementId, NodeClassification, Workplan};
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Estado del ciclo de vida del motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Recién construido; nunca se inició.
    Created,
    /// Se le aplicó un snapshot y espera `start`.
    Restored,
    /// Iniciado y en quietud: hay trabajo externo pendiente o una barrera sin
    /// completar.
    Suspended,
    /// Un token alcanzó una plaza de salida.
    Completed,
    /// Se tomó un snapshot; el motor queda retirado.
    Paused,
    /// Falló la propagación.
    Faulted,
    Disposed,
}

/// Plaza que terminó la ejecución.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPlace {
    pub id: ElementId,
    pub name: String,
    pub classification: NodeClassification,
}

/// Resultado de una ráfaga de propagación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Suspended,
    Completed(CompletedPlace),
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed(_))
    }
}

/// Evento `Triggered`: la transición disparó y emitió tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredTransition {
    pub id: ElementId,
    pub name: String,
    pub kind: String,
}

/// Evento `TokenRemoved`: una transición retiró `token` de la plaza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedToken {
    pub place: ElementId,
    pub name: String,
    pub token: Token,
}

/// Observador síncrono de la ejecución. Se invoca en el hilo que conduce el
/// motor.
pub trait EngineMonitor: Send {
    fn transition_triggered(&mut self, _engine: &Engine, _transition: &TriggeredTransition) {}

    fn completed(&mut self, _engine: &Engine, _place: &CompletedPlace) {}

    fn token_removed(&mut self, _engine: &Engine, _removed: &RemovedToken) {}
}

struct TriggeredCallback<F>(F);

impl<F> EngineMonitor for TriggeredCallback<F> where F: FnMut(&TriggeredTransition) + Send
{
    fn transition_triggered(&mut self, _engine: &Engine, transition: &TriggeredTransition) {
        (self.0)(transition)
    }
}

struct CompletedCallback<F>(F);

impl<F> EngineMonitor for CompletedCallback<F> where F: FnMut(&CompletedPlace) + Send
{
    fn completed(&mut self, _engine: &Engine, place: &CompletedPlace) {
        (self.0)(place)
    }
}

struct RemovedCallback<F>(F);

impl<F> EngineMonitor for RemovedCallback<F> where F: FnMut(&RemovedToken) + Send
{
    fn token_removed(&mut self, _engine: &Engine, removed: &RemovedToken) {
        (self.0)(removed)
    }
}

/// Órdenes que otros hilos encolan para el motor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Resume { path: Vec<ElementId>, result: usize },
}

/// Extremo clonable para reanudar trabajo externo desde otro hilo. Las
/// órdenes se aplican cuando el hilo dueño llama a `process_commands` o
/// `start`.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn resume(&self, path: Vec<ElementId>, result: usize) -> Result<()> {
        self.sender
            .send(EngineCommand::Resume { path, result })
            .map_err(|e| FlowError::Other(format!("motor no disponible: {}", e)))
    }
}

/// Motor de ejecución de una instancia de workplan.
///
/// Una ráfaga de propagación es monohilo: las llegadas de tokens se encolan en
/// la `Agenda` y el motor las procesa hasta vaciarla. El motor es `Send` y
/// puede moverse entre hilos, pero no se comparte.
pub struct Engine {
    workplan: Arc<Workplan>,
    config: EngineConfig,
    places: Vec<Place>,
    place_index: IndexMap<ElementId, usize>,
    transitions: Vec<Transition>,
    transition_index: IndexMap<ElementId, usize>,
    start_place: usize,
    agenda: Agenda,
    state: EngineState,
    completion: Option<CompletedPlace>,
    monitors: Vec<Box<dyn EngineMonitor>>,
    sender: Sender<EngineCommand>,
    commands: Receiver<EngineCommand>,
}

impl Engine {
    /// Valida el workplan contra el registro, lo instancia y suscribe cada
    /// transición a sus entradas.
    pub fn new(workplan: Arc<Workplan>,
               context: Arc<dyn WorkplanContext>,
               registry: Arc<StepRegistry>,
               config: EngineConfig)
               -> Result<Self> {
        let Instance { mut places,
                       mut transitions,
                       place_index,
                       transition_index, } = Instantiator::instantiate(&workplan, &context, &registry, &config)?;
        let start_place = workplan.start_connector()
                                  .and_then(|c| place_index.get(&c.id).copied())
                                  .ok_or_else(|| {
                                      FlowError::Configuration(format!("el workplan '{}' no tiene conector de inicio",
                                                                       workplan.name()))
                                  })?;
        for (index, transition) in transitions.iter_mut().enumerate() {
            transition.initialize(index, &mut places)?;
        }
        let (sender, commands) = crossbeam_channel::unbounded();
        Ok(Self { workplan,
                  config,
                  places,
                  place_index,
                  transitions,
                  transition_index,
                  start_place,
                  agenda: Agenda::new(),
                  state: EngineState::Created,
                  completion: None,
                  monitors: Vec::new(),
                  sender,
                  commands })
    }

    pub fn workplan(&self) -> &Arc<Workplan> {
        &self.workplan
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn place(&self, id: ElementId) -> Option<&Place> {
        self.place_index.get(&id).map(|i| &self.places[*i])
    }

    pub fn transition(&self, id: ElementId) -> Option<&Transition> {
        self.transition_index.get(&id).map(|i| &self.transitions[*i])
    }

    /// Plazas clasificadas como `END` o `FAILED`.
    pub fn end_places(&self) -> impl Iterator<Item = &Place> + '_ {
        self.places.iter().filter(|p| p.classification().is_terminal())
    }

    /// Plaza en la que terminó la ejecución, si ya terminó.
    pub fn completion(&self) -> Option<&CompletedPlace> {
        self.completion.as_ref()
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle { sender: self.sender.clone() }
    }

    pub fn add_monitor(&mut self, monitor: Box<dyn EngineMonitor>) {
        self.monitors.push(monitor);
    }

    pub fn on_transition_triggered<F>(&mut self, callback: F)
        where F: FnMut(&TriggeredTransition) + Send + 'static
    {
        self.add_monitor(Box::new(TriggeredCallback(callback)));
    }

    pub fn on_completed<F>(&mut self, callback: F)
        where F: FnMut(&CompletedPlace) + Send + 'static
    {
        self.add_monitor(Box::new(CompletedCallback(callback)));
    }

    pub fn on_token_removed<F>(&mut self, callback: F)
        where F: FnMut(&RemovedToken) + Send + 'static
    {
        self.add_monitor(Box::new(RemovedCallback(callback)));
    }

    /// Inicia o continúa la ejecución.
    ///
    /// - `Created`: deposita un token nuevo en la plaza de inicio.
    /// - `Restored`: reactiva las plazas y deja continuar a las transiciones
    ///   que retenían tokens.
    /// - `Suspended`: aplica las órdenes externas pendientes.
    pub fn start(&mut self) -> Result<RunStatus> {
        match self.state {
            EngineState::Created => self.launch(Token::new()),
            EngineState::Restored => self.continue_restored(),
            EngineState::Suspended => self.process_commands(),
            other => Err(FlowError::Precondition(format!("no se puede iniciar un motor en estado {:?}", other))),
        }
    }

    /// Como `start` desde `Created`, pero inyectando `token`.
    pub fn start_with(&mut self, token: Token) -> Result<RunStatus> {
        if self.state != EngineState::Created {
            return Err(FlowError::Precondition(format!("start_with requiere un motor nuevo (estado {:?})",
                                                       self.state)));
        }
        self.launch(token)
    }

    /// Informa el resultado del trabajo externo de la transición indicada por
    /// `path` (ids de paso desde este workplan, atravesando subworkflows) y
    /// propaga.
    pub fn resume(&mut self, path: &[ElementId], result: usize) -> Result<RunStatus> {
        if self.state != EngineState::Suspended {
            return Err(FlowError::Precondition(format!("no se puede reanudar un motor en estado {:?}",
                                                       self.state)));
        }
        self.apply_resume(path, result)?;
        self.propagate()
    }

    /// Aplica las órdenes recibidas por los `EngineHandle`, en orden de
    /// llegada.
    pub fn process_commands(&mut self) -> Result<RunStatus> {
        if self.state != EngineState::Suspended {
            return Err(FlowError::Precondition(format!("no se pueden procesar órdenes en estado {:?}",
                                                       self.state)));
        }
        while self.completion.is_none() {
            let Ok(command) = self.commands.try_recv() else {
                break;
            };
            match command {
                EngineCommand::Resume { path, result } => {
                    debug!("orden externa: resume {:?} -> {}", path, result);
                    self.apply_resume(&path, result)?;
                    self.propagate()?;
                }
            }
        }
        Ok(self.status())
    }

    /// Captura el estado y retira el motor.
    pub fn pause(&mut self) -> Result<Snapshot> {
        match self.state {
            EngineState::Suspended | EngineState::Restored => {}
            other => {
                return Err(FlowError::Precondition(format!("sólo se puede pausar un motor suspendido o \
                                                            restaurado (estado {:?})",
                                                           other)))
            }
        }
        let captured = self.capture();
        let holders = self.guard(captured)?;
        let snapshot = Snapshot { workplan_id: self.workplan.id(),
                                  workplan_version: self.workplan.version(),
                                  fingerprint: self.workplan.fingerprint()?,
                                  taken_at: Utc::now(),
                                  holders };
        self.state = EngineState::Paused;
        info!("workplan {} pausado: {} poseedores, {} tokens",
              self.workplan.name(),
              snapshot.holders.len(),
              snapshot.token_count());
        Ok(snapshot)
    }

    /// Reinyecta los tokens de `snapshot` sin disparar nada. La ejecución
    /// continúa en el siguiente `start`.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<()> {
        if self.state != EngineState::Created {
            return Err(FlowError::Precondition(format!("sólo se puede restaurar un motor recién creado (estado \
                                                        {:?})",
                                                       self.state)));
        }
        if snapshot.fingerprint != self.workplan.fingerprint()? {
            return Err(FlowError::Precondition(format!("el snapshot no corresponde al workplan '{}' v{}",
                                                       self.workplan.name(),
                                                       self.workplan.version())));
        }
        let applied = self.apply_snapshot(snapshot);
        self.guard(applied)?;
        self.state = EngineState::Restored;
        Ok(())
    }

    /// Cancela las suscripciones y descarta el trabajo pendiente. Un motor
    /// que nunca se inició no tiene nada que liberar.
    pub fn dispose(&mut self) -> Result<()> {
        match self.state {
            EngineState::Created => {
                debug!("dispose sobre un motor nunca iniciado");
                Ok(())
            }
            EngineState::Disposed => Err(FlowError::Precondition("el motor ya fue liberado".into())),
            _ => {
                for place in self.places.iter_mut() {
                    place.unsubscribe_all();
                }
                for transition in self.transitions.iter_mut() {
                    transition.release();
                }
                self.agenda.clear();
                self.monitors.clear();
                self.state = EngineState::Disposed;
                Ok(())
            }
        }
    }

    /// Trabajo externo pendiente, incluido el de subworkflows anidados.
    pub fn pending_work(&self) -> Vec<PendingWork> {
        let mut out = Vec::new();
        self.collect_pending(&[], &mut out);
        out
    }

    pub(crate) fn collect_pending(&self, prefix: &[ElementId], out: &mut Vec<PendingWork>) {
        for transition in self.transitions.iter().filter(|t| !t.held().is_empty()) {
            transition.pending_work(prefix, out);
        }
    }

    fn launch(&mut self, token: Token) -> Result<RunStatus> {
        info!("iniciando workplan {} v{}", self.workplan.name(), self.workplan.version());
        self.state = EngineState::Suspended;
        self.places[self.start_place].add(token, &mut self.agenda);
        self.propagate()
    }

    fn continue_restored(&mut self) -> Result<RunStatus> {
        info!("continuando workplan restaurado {}", self.workplan.name());
        self.state = EngineState::Suspended;
        for place in self.places.iter_mut() {
            place.resume(&mut self.agenda);
        }
        for index in 0..self.transitions.len() {
            if self.completion.is_some() {
                break;
            }
            if self.transitions[index].held().is_empty() {
                continue;
            }
            let outcome = self.transitions[index].continue_restored(&mut self.places, &mut self.agenda);
            let outcome = self.guard(outcome)?;
            self.after_fire(index, outcome);
        }
        match self.propagate()? {
            RunStatus::Suspended => self.process_commands(),
            completed => Ok(completed),
        }
    }

    fn apply_resume(&mut self, path: &[ElementId], result: usize) -> Result<()> {
        let (first, rest) = path.split_first()
                                .ok_or_else(|| FlowError::Precondition("ruta de reanudación vacía".into()))?;
        let index = *self.transition_index
                         .get(first)
                         .ok_or_else(|| FlowError::NotFound(format!("paso {}", first)))?;
        let outcome = self.transitions[index].resume(rest, result, &mut self.places, &mut self.agenda)?;
        self.after_fire(index, outcome);
        Ok(())
    }

    /// Procesa la agenda hasta la quietud o la terminación.
    fn propagate(&mut self) -> Result<RunStatus> {
        self.check_completion();
        let mut budget = self.config.max_activations;
        while self.completion.is_none() {
            let Some(activation) = self.agenda.next_activation() else {
                break;
            };
            if budget == 0 {
                return self.guard(Err(FlowError::Execution(format!("se superó el límite de {} activaciones; \
                                                                    posible ciclo sin fin",
                                                                   self.config.max_activations))));
            }
            budget -= 1;
            let outcome = self.transitions[activation.transition].fire(&mut self.places, &mut self.agenda);
            let outcome = self.guard(outcome)?;
            self.after_fire(activation.transition, outcome);
        }
        Ok(self.status())
    }

    fn after_fire(&mut self, index: usize, outcome: FireOutcome) {
        self.report_removals();
        if outcome != FireOutcome::Fired {
            return;
        }
        let transition = &self.transitions[index];
        if transition.has_waiting_input(&self.places) {
            if let Some(place) = transition.first_input() {
                self.agenda.activate(index, place);
            }
        }
        let triggered = TriggeredTransition { id: transition.id(),
                                              name: transition.name().to_string(),
                                              kind: transition.kind().to_string() };
        debug!("transición {} ({}) disparada", triggered.id, triggered.name);
        self.dispatch(|monitor, engine| monitor.transition_triggered(engine, &triggered));
        self.check_completion();
    }

    fn report_removals(&mut self) {
        for (index, token) in self.agenda.take_removals() {
            let place = &self.places[index];
            let removed = RemovedToken { place: place.id(),
                                         name: place.name().to_string(),
                                         token };
            self.dispatch(|monitor, engine| monitor.token_removed(engine, &removed));
        }
    }

    /// La primera llegada a una plaza `END`, `FAILED` o `EXIT` termina la
    /// ejecución y descarta el resto de la agenda.
    fn check_completion(&mut self) {
        for index in self.agenda.take_arrivals() {
            if self.completion.is_some() {
                break;
            }
            let place = &self.places[index];
            if !place.classification().completes_run() {
                continue;
            }
            let completed = CompletedPlace { id: place.id(),
                                             name: place.name().to_string(),
                                             classification: place.classification() };
            info!("workplan {} terminó en {} ({})",
                  self.workplan.name(),
                  completed.name,
                  completed.classification);
            self.completion = Some(completed.clone());
            self.state = EngineState::Completed;
            self.agenda.clear();
            self.dispatch(|monitor, engine| monitor.completed(engine, &completed));
        }
    }

    fn status(&self) -> RunStatus {
        match &self.completion {
            Some(place) => RunStatus::Completed(place.clone()),
            None => RunStatus::Suspended,
        }
    }

    fn dispatch<F>(&mut self, mut notify: F)
        where F: FnMut(&mut dyn EngineMonitor, &Engine)
    {
        let mut monitors = std::mem::take(&mut self.monitors);
        for monitor in monitors.iter_mut() {
            notify(monitor.as_mut(), self);
        }
        self.monitors = monitors;
    }

    fn capture(&mut self) -> Result<Vec<HolderSnapshot>> {
        let mut holders = Vec::new();
        for place in self.places.iter_mut() {
            place.pause();
            if !place.tokens().is_empty() {
                holders.push(HolderSnapshot { holder_id: place.id(),
                                              holder_state: HolderState::Place,
                                              tokens: place.tokens().to_vec() });
            }
        }
        for transition in self.transitions.iter_mut() {
            if transition.held().is_empty() {
                continue;
            }
            let tokens = transition.held().to_vec();
            let holder_state = transition.capture()?;
            holders.push(HolderSnapshot { holder_id: transition.id(),
                                          holder_state,
                                          tokens });
        }
        Ok(holders)
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) -> Result<()> {
        for place in self.places.iter_mut() {
            place.pause();
        }
        for holder in snapshot.holders {
            match holder.holder_state {
                HolderState::Place => {
                    let index = *self.place_index
                                     .get(&holder.holder_id)
                                     .ok_or_else(|| FlowError::NotFound(format!("plaza {}", holder.holder_id)))?;
                    for token in holder.tokens {
                        self.places[index].add(token, &mut self.agenda);
                    }
                }
                state => {
                    let index = *self.transition_index
                                     .get(&holder.holder_id)
                                     .ok_or_else(|| FlowError::NotFound(format!("paso {}", holder.holder_id)))?;
                    self.transitions[index].restore(holder.tokens, state)?;
                }
            }
        }
        Ok(())
    }

    /// Marca el motor como `Faulted` si `result` es un error.
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            error!("workplan {}: {}", self.workplan.name(), e);
            self.state = EngineState::Faulted;
            self.agenda.clear();
        }
        result
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.state == EngineState::Suspended && !self.pending_work().is_empty() {
            warn!("se descarta el motor de {} con trabajo externo pendiente", self.workplan.name());
        }
    }
}
