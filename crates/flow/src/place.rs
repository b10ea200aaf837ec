// Archivo: place.rs
// Propósito: `Place`, contraparte en ejecución de un conector. Guarda tokens y
// avisa a las transiciones suscritas a través de la `Agenda`.
use crate::agenda::Agenda;
use crate::token::Token;
use crate::workplan::{Connector, ElementId, NodeClassification};
use log::trace;

#[derive(Debug)]
pub struct Place {
    id: ElementId,
    name: String,
    classification: NodeClassification,
    index: usize,
    tokens: Vec<Token>,
    paused: bool,
    subscribers: Vec<usize>,
}

impl Place {
    /// Crea la plaza del conector. `index` es su posición en la arena del
    /// motor.
    pub fn new(connector: &Connector, index: usize) -> Self {
        Self { id: connector.id,
               name: connector.name.clone(),
               classification: connector.classification,
               index,
               tokens: Vec::new(),
               paused: false,
               subscribers: Vec::new() }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classification(&self) -> NodeClassification {
        self.classification
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn subscribers(&self) -> &[usize] {
        &self.subscribers
    }

    /// Añade un token. Si la plaza no está pausada, notifica a los suscriptores
    /// a través de la agenda; si lo está, el token queda retenido sin aviso.
    pub fn add(&mut self, token: Token, agenda: &mut Agenda) {
        trace!("plaza {} ({}) recibe {:?}", self.id, self.name, token);
        self.tokens.push(token);
        if !self.paused {
            agenda.token_added(self.index, &self.subscribers);
        }
    }

    /// Quita la primera aparición de `token` y lo anota en la agenda, esté
    /// o no pausada la plaza. Devuelve `false` si no estaba.
    pub fn remove(&mut self, token: &Token, agenda: &mut Agenda) -> bool {
        match self.tokens.iter().position(|t| t == token) {
            Some(pos) => {
                let removed = self.tokens.remove(pos);
                trace!("plaza {} ({}) entrega {:?}", self.id, self.name, removed);
                agenda.token_removed(self.index, removed);
                true
            }
            None => false,
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Reanuda la plaza y repite el aviso de llegada de cada token retenido,
    /// en orden de llegada.
    pub fn resume(&mut self, agenda: &mut Agenda) {
        if !self.paused {
            return;
        }
        self.paused = false;
        for _ in 0..self.tokens.len() {
            agenda.token_added(self.index, &self.subscribers);
        }
    }

    pub(crate) fn subscribe(&mut self, transition: usize) {
        if !self.subscribers.contains(&transition) {
            self.subscribers.push(transition);
        }
    }

    pub(crate) fn unsubscribe_all(&mut self) {
        self.subscribers.clear();
    }
}
