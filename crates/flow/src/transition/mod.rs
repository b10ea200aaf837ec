// Archivo: transition/mod.rs
// Propósito: contrato base de las transiciones en ejecución y los tipos
// integrados (pass, task, split, join, subworkflow).
mod join;
mod pass;
pub mod registry;
mod split;
mod subworkflow;
mod task;

pub use join::{JoinFactory, JoinTransition};
pub use pass::{PassFactory, PassParameters, PassTransition};
pub use registry::{kinds, StepFactory, StepRegistry};
pub use split::{SplitFactory, SplitTransition};
pub use subworkflow::{IndexResolver, SubworkflowFactory, SubworkflowParameters, SubworkflowTransition};
pub use task::{TaskFactory, TaskTransition};

use crate::agenda::Agenda;
use crate::context::WorkplanContext;
use crate::errors::{FlowError, Result};
use crate::place::Place;
use crate::snapshot::HolderState;
use crate::token::Token;
use crate::workplan::{ElementId, Step};
use std::sync::Arc;

/// Resultado de una activación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// No había tokens suficientes; nada cambió.
    Idle,
    /// Consumió tokens y los retiene a la espera de un evento externo.
    Held,
    /// Emitió tokens en sus salidas.
    Fired,
}

/// Trabajo externo pendiente: un paso retiene un token y espera que alguien
/// informe el resultado.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWork {
    /// Ids de paso desde el workplan raíz hasta el paso que retiene el token,
    /// pasando por los subworkflows.
    pub path: Vec<ElementId>,
    pub step_name: String,
    pub kind: String,
    pub token: Token,
    /// Nombre de cada salida posible, en orden de índice.
    pub outcomes: Vec<String>,
}

/// Vista de una transición sobre sus plazas de entrada y salida durante una
/// activación.
pub struct TransitionIo<'a> {
    step: ElementId,
    inputs: &'a [Option<usize>],
    outputs: &'a [Option<usize>],
    places: &'a mut [Place],
    agenda: &'a mut Agenda,
}

impl<'a> TransitionIo<'a> {
    pub fn step_id(&self) -> ElementId {
        self.step
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Tokens presentes en la entrada `input`. Un slot vacío no tiene tokens.
    pub fn tokens(&self, input: usize) -> &[Token] {
        match self.inputs.get(input).copied().flatten() {
            Some(place) => self.places[place].tokens(),
            None => &[],
        }
    }

    /// Primer token disponible recorriendo las entradas en orden.
    pub fn first_available(&self) -> Option<(usize, Token)> {
        (0..self.inputs.len()).find_map(|i| self.tokens(i).first().map(|t| (i, t.clone())))
    }

    /// Retira `token` de la entrada `input`.
    pub fn take(&mut self, input: usize, token: &Token) -> bool {
        match self.inputs.get(input).copied().flatten() {
            Some(place) => self.places[place].remove(token, self.agenda),
            None => false,
        }
    }

    /// Comprueba que `output` es una salida conectada.
    pub fn ensure_output(&self, output: usize) -> Result<usize> {
        match self.outputs.get(output) {
            Some(Some(place)) => Ok(*place),
            Some(None) => Err(FlowError::UnresolvedOutput { step: self.step,
                                                            detail: format!("la salida {} no está conectada", output) }),
            None => Err(FlowError::UnresolvedOutput { step: self.step,
                                                      detail: format!("la salida {} no existe (hay {})",
                                                                      output,
                                                                      self.outputs.len()) }),
        }
    }

    /// Deposita `token` en la plaza de la salida `output`.
    pub fn emit(&mut self, output: usize, token: Token) -> Result<()> {
        let place = self.ensure_output(output)?;
        self.places[place].add(token, self.agenda);
        Ok(())
    }
}

/// Lógica específica de cada tipo de transición.
///
/// Las implementaciones deciden en `fire` si hay tokens suficientes. Si no
/// los hay devuelven `Idle` sin tocar las entradas: así se implementa la
/// barrera del `join`.
pub trait TransitionLogic: Send {
    fn fire(&mut self, io: &mut TransitionIo<'_>) -> Result<FireOutcome>;

    /// Tokens retenidos internamente.
    fn held(&self) -> &[Token] {
        &[]
    }

    /// Estado a guardar en el snapshot. Sólo se invoca si `held` no está
    /// vacío; el motor queda retirado después de la captura.
    fn capture(&mut self) -> Result<HolderState> {
        Err(FlowError::Precondition("la transición no admite captura de estado".into()))
    }

    /// Reinyecta tokens retenidos y estado interno antes de `start`.
    fn restore(&mut self, _tokens: Vec<Token>, _state: HolderState) -> Result<()> {
        Err(FlowError::Precondition("la transición no admite tokens retenidos".into()))
    }

    /// Primera oportunidad de avanzar tras una restauración.
    fn continue_restored(&mut self, _io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        Ok(FireOutcome::Idle)
    }

    /// Resultado externo para el token retenido. `path` es la parte de la
    /// ruta que queda por debajo de esta transición.
    fn resume(&mut self, _path: &[ElementId], _result: usize, _io: &mut TransitionIo<'_>) -> Result<FireOutcome> {
        Err(FlowError::Precondition("la transición no espera resultados externos".into()))
    }

    fn pending_work(&self, _path: &[ElementId], _out: &mut Vec<PendingWork>) {}
}

/// Transición en ejecución ligada a un paso del workplan.
pub struct Transition {
    id: ElementId,
    name: String,
    kind: String,
    inputs: Vec<Option<usize>>,
    outputs: Vec<Option<usize>>,
    context: Arc<dyn WorkplanContext>,
    logic: Box<dyn TransitionLogic>,
    initialized: bool,
}

impl Transition {
    pub(crate) fn new(step: &Step,
                      inputs: Vec<Option<usize>>,
                      outputs: Vec<Option<usize>>,
                      context: Arc<dyn WorkplanContext>,
                      logic: Box<dyn TransitionLogic>)
                      -> Self {
        Self { id: step.id,
               name: step.name.clone(),
               kind: step.kind.clone(),
               inputs,
               outputs,
               context,
               logic,
               initialized: false }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Contexto de ejecución con el que se creó la transición.
    pub fn context(&self) -> &Arc<dyn WorkplanContext> {
        &self.context
    }

    pub fn inputs(&self) -> &[Option<usize>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Option<usize>] {
        &self.outputs
    }

    pub fn held(&self) -> &[Token] {
        self.logic.held()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Suscribe la transición (posición `index` en la arena) a la llegada de
    /// tokens en todas sus entradas. Sólo puede llamarse una vez.
    pub fn initialize(&mut self, index: usize, places: &mut [Place]) -> Result<()> {
        if self.initialized {
            return Err(FlowError::Precondition(format!("la transición {} ya está inicializada", self.id)));
        }
        for place in self.inputs.iter().flatten() {
            places[*place].subscribe(index);
        }
        self.initialized = true;
        Ok(())
    }

    pub(crate) fn release(&mut self) {
        self.initialized = false;
    }

    /// `true` si alguna entrada conserva tokens.
    pub(crate) fn has_waiting_input(&self, places: &[Place]) -> bool {
        self.inputs.iter().flatten().any(|p| !places[*p].tokens().is_empty())
    }

    pub(crate) fn first_input(&self) -> Option<usize> {
        self.inputs.iter().flatten().next().copied()
    }

    pub(crate) fn fire(&mut self, places: &mut [Place], agenda: &mut Agenda) -> Result<FireOutcome> {
        let mut io = TransitionIo { step: self.id,
                                    inputs: &self.inputs,
                                    outputs: &self.outputs,
                                    places,
                                    agenda };
        self.logic.fire(&mut io)
    }

    pub(crate) fn resume(&mut self,
                         path: &[ElementId],
                         result: usize,
                         places: &mut [Place],
                         agenda: &mut Agenda)
                         -> Result<FireOutcome> {
        let mut io = TransitionIo { step: self.id,
                                    inputs: &self.inputs,
                                    outputs: &self.outputs,
                                    places,
                                    agenda };
        self.logic.resume(path, result, &mut io)
    }

    pub(crate) fn continue_restored(&mut self, places: &mut [Place], agenda: &mut Agenda) -> Result<FireOutcome> {
        let mut io = TransitionIo { step: self.id,
                                    inputs: &self.inputs,
                                    outputs: &self.outputs,
                                    places,
                                    agenda };
        self.logic.continue_restored(&mut io)
    }

    pub(crate) fn capture(&mut self) -> Result<HolderState> {
        self.logic.capture()
    }

    pub(crate) fn restore(&mut self, tokens: Vec<Token>, state: HolderState) -> Result<()> {
        self.logic.restore(tokens, state)
    }

    pub(crate) fn pending_work(&self, prefix: &[ElementId], out: &mut Vec<PendingWork>) {
        let mut path = prefix.to_vec();
        path.push(self.id);
        self.logic.pending_work(&path, out);
    }
}
