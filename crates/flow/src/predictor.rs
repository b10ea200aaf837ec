// Archivo: predictor.rs
// Propósito: anticipar el resultado de una ejecución en cuanto queda
// determinado, combinando la alcanzabilidad estática del workplan con el
// marcado actual del motor.
use crate::engine::{CompletedPlace, Engine, EngineMonitor, TriggeredTransition};
use crate::transition::{kinds, PassParameters};
use crate::workplan::{ElementId, NodeClassification, Step, Workplan};
use log::{debug, error, info};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Connector(ElementId),
    Step(ElementId),
}

type PredictionListener = Box<dyn FnMut(NodeClassification) + Send>;

/// Monitor que anuncia la clasificación final de la ejecución antes de que
/// termine, sólo cuando ya no puede ser otra.
///
/// El anuncio se produce como mucho una vez por ejecución y nunca en el mismo
/// disparo que deposita el token final.
pub struct PathPredictor {
    workplan: Arc<Workplan>,
    listeners: Vec<PredictionListener>,
    prediction: Option<NodeClassification>,
}

impl PathPredictor {
    pub fn new(workplan: Arc<Workplan>) -> Self {
        Self { workplan,
               listeners: Vec::new(),
               prediction: None }
    }

    /// Registra un oyente del evento `PathPrediction`.
    pub fn on_prediction<F>(mut self, listener: F) -> Self
        where F: FnMut(NodeClassification) + Send + 'static
    {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Predicción ya anunciada, si la hubo.
    pub fn prediction(&self) -> Option<NodeClassification> {
        self.prediction
    }

    /// Clasificaciones de salida alcanzables desde el marcado actual de
    /// `engine`.
    ///
    /// El recorrido lleva un conjunto de visitados por (nodo, rama) para
    /// terminar en grafos con ciclos; cada salida de un paso es una rama
    /// distinta.
    pub fn reachable_outcomes(&self, engine: &Engine) -> BTreeSet<NodeClassification> {
        let mut pending: Vec<(Node, usize)> = Vec::new();
        for place in engine.places().iter().filter(|p| !p.tokens().is_empty()) {
            pending.push((Node::Connector(place.id()), 0));
        }
        for transition in engine.transitions().iter().filter(|t| !t.held().is_empty()) {
            pending.push((Node::Step(transition.id()), 0));
        }

        let mut visited = HashSet::new();
        let mut outcomes = BTreeSet::new();
        while let Some((node, branch)) = pending.pop() {
            if !visited.insert((node, branch)) {
                continue;
            }
            match node {
                Node::Connector(id) => {
                    let Some(connector) = self.workplan.connector(id) else {
                        continue;
                    };
                    if connector.classification.completes_run() {
                        outcomes.insert(connector.classification);
                        continue;
                    }
                    for consumer in self.workplan.consumers(id) {
                        pending.push((Node::Step(consumer.id), branch));
                    }
                }
                Node::Step(id) => {
                    let Some(step) = self.workplan.step(id) else {
                        continue;
                    };
                    let disabled = engine.transition(id).is_some_and(|t| t.context().is_disabled(step));
                    for (output, connector) in possible_outputs(step, disabled) {
                        pending.push((Node::Connector(connector), output));
                    }
                }
            }
        }
        outcomes
    }

    fn evaluate(&mut self, engine: &Engine) {
        if self.prediction.is_some() || engine.completion().is_some() {
            return;
        }
        // el token final ya está en una salida: la terminación es inminente
        if engine.places()
                 .iter()
                 .any(|p| !p.tokens().is_empty() && p.classification().completes_run())
        {
            return;
        }
        let outcomes = self.reachable_outcomes(engine);
        debug!("resultados alcanzables en {}: {:?}", self.workplan.name(), outcomes);
        if outcomes.len() != 1 {
            return;
        }
        if let Some(outcome) = outcomes.into_iter().next() {
            info!("predicción para {}: {}", self.workplan.name(), outcome);
            self.prediction = Some(outcome);
            for listener in self.listeners.iter_mut() {
                listener(outcome);
            }
        }
    }
}

/// Salidas que puede tomar un paso. Un `pass` activo sólo emite por su salida
/// configurada; el resto de tipos por cualquiera de las suyas.
fn possible_outputs(step: &Step, disabled: bool) -> Vec<(usize, ElementId)> {
    let connected = step.outputs
                        .iter()
                        .enumerate()
                        .filter_map(|(i, slot)| slot.map(|c| (i, c)));
    if step.kind == kinds::PASS && !disabled {
        if let Ok(params) = step.parameters_as::<PassParameters>() {
            return connected.filter(|(i, _)| *i == params.result).collect();
        }
    }
    connected.collect()
}

impl EngineMonitor for PathPredictor {
    fn transition_triggered(&mut self, engine: &Engine, _transition: &TriggeredTransition) {
        self.evaluate(engine);
    }

    fn completed(&mut self, _engine: &Engine, place: &CompletedPlace) {
        if let Some(predicted) = self.prediction {
            if predicted != place.classification {
                error!("predicción {} incorrecta: la ejecución terminó en {}", predicted, place.classification);
            }
        }
    }
}
