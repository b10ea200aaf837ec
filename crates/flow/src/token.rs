// Archivo: token.rs
// Propósito: definir el `Token`, la unidad de flujo que viaja por el grafo.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unidad de flujo transportada por las plazas.
///
/// `Main` es el token normal de una ejecución. `Split` sólo existe entre un
/// `split` y su `join` correspondiente: envuelve el token original y lleva un
/// `lineage` generado en el momento del fork que comparten todas las ramas
/// hermanas. El `join` empareja por `lineage`, no por identidad de objeto.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Token {
    Main { id: Uuid },
    Split {
        original: Box<Token>,
        lineage: Uuid,
        branch: usize,
    },
}

impl Token {
    /// Crea un token principal nuevo.
    pub fn new() -> Self {
        Token::Main { id: Uuid::new_v4() }
    }

    /// Crea la rama `branch` de un fork identificado por `lineage`.
    pub fn split(original: &Token, lineage: Uuid, branch: usize) -> Self {
        Token::Split { original: Box::new(original.clone()),
                       lineage,
                       branch }
    }

    /// Token original si es un token de rama.
    pub fn original(&self) -> Option<&Token> {
        match self {
            Token::Split { original, .. } => Some(original),
            Token::Main { .. } => None,
        }
    }

    /// Identificador del fork si es un token de rama.
    pub fn lineage(&self) -> Option<Uuid> {
        match self {
            Token::Split { lineage, .. } => Some(*lineage),
            Token::Main { .. } => None,
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, Token::Split { .. })
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}
