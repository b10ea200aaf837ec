// Archivo: agenda.rs
// Propósito: cola de trabajo que reemplaza la recursión de eventos
// Plaza -> Transición -> Plaza. El motor la vacía hasta la quietud.
use crate::token::Token;
use std::collections::VecDeque;

/// Notificación pendiente: `transition` debe revisar sus entradas porque
/// llegó un token a `place`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub transition: usize,
    pub place: usize,
}

/// Cola de activaciones y registro de llegadas y retiradas de tokens.
#[derive(Debug, Default)]
pub struct Agenda {
    activations: VecDeque<Activation>,
    arrivals: Vec<usize>,
    removals: Vec<(usize, Token)>,
}

impl Agenda {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra la llegada de un token a `place` y encola una activación por
    /// cada suscriptor, en orden de suscripción.
    pub fn token_added(&mut self, place: usize, subscribers: &[usize]) {
        self.arrivals.push(place);
        self.activations
            .extend(subscribers.iter().map(|t| Activation { transition: *t, place }));
    }

    /// Vuelve a encolar una transición sin que haya llegado un token nuevo
    /// (por ejemplo, cuando aún le quedan tokens tras disparar).
    pub fn activate(&mut self, transition: usize, place: usize) {
        self.activations.push_back(Activation { transition, place });
    }

    /// Registra que `token` salió de `place`. No encola activaciones.
    pub fn token_removed(&mut self, place: usize, token: Token) {
        self.removals.push((place, token));
    }

    pub fn take_removals(&mut self) -> Vec<(usize, Token)> {
        std::mem::take(&mut self.removals)
    }

    pub fn next_activation(&mut self) -> Option<Activation> {
        self.activations.pop_front()
    }

    /// Devuelve y limpia las plazas que recibieron tokens desde la última
    /// llamada.
    pub fn take_arrivals(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.arrivals)
    }

    pub fn is_idle(&self) -> bool {
        self.activations.is_empty()
    }

    /// Descarta el trabajo pendiente. Se usa cuando la ejecución terminó.
    pub fn clear(&mut self) {
        self.activations.clear();
        self.arrivals.clear();
        self.removals.clear();
    }
}
