// Archivo: snapshot.rs
// Propósito: captura serializable de una ejecución pausada: tokens en plazas,
// tokens retenidos por transiciones y su estado interno (incluido el de
// motores anidados).
use crate::errors::Result;
use crate::token::Token;
use crate::workplan::ElementId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Marca opaca que distingue el tipo de poseedor de tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HolderState {
    /// Tokens esperando en una plaza.
    Place,
    /// Token retenido por un paso con trabajo externo pendiente.
    Task,
    /// Token retenido por un subworkflow junto con el snapshot del motor
    /// anidado.
    Subworkflow { snapshot: Box<Snapshot> },
    /// Estado propio de transiciones registradas por terceros.
    Custom { state: JsonValue },
}

/// Tokens de un poseedor (plaza o transición) en el momento de la pausa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderSnapshot {
    pub holder_id: ElementId,
    pub holder_state: HolderState,
    pub tokens: Vec<Token>,
}

/// Captura inmutable producida por `Engine::pause` y consumida por
/// `Engine::restore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub workplan_id: Uuid,
    pub workplan_version: u32,
    /// `Workplan::fingerprint` del blueprint que se pausó.
    pub fingerprint: String,
    pub taken_at: DateTime<Utc>,
    pub holders: Vec<HolderSnapshot>,
}

impl Snapshot {
    pub fn holder(&self, id: ElementId) -> Option<&HolderSnapshot> {
        self.holders.iter().find(|h| h.holder_id == id)
    }

    /// Número total de tokens capturados, sin contar los de motores anidados.
    pub fn token_count(&self) -> usize {
        self.holders.iter().map(|h| h.tokens.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
