// Archivo: classification.rs
// Propósito: conjunto de marcas que clasifica a un conector (inicio, fin,
// fallo, salida hacia un workplan contenedor...).
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Conjunto de bits con la clasificación de un conector.
///
/// Las marcas se combinan: un conector `END | EXIT` termina la ejecución y a
/// la vez es un límite de resultado visible para un subworkflow contenedor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeClassification(u32);

impl NodeClassification {
    pub const NONE: Self = Self(0);
    pub const INTERMEDIATE: Self = Self(1);
    pub const START: Self = Self(1 << 1);
    pub const END: Self = Self(1 << 2);
    pub const FAILED: Self = Self(1 << 3);
    pub const EXIT: Self = Self(1 << 4);

    /// Marcas de resultado final de una ejecución.
    pub const TERMINAL: Self = Self(Self::END.0 | Self::FAILED.0);

    const NAMES: [(Self, &'static str); 5] = [(Self::INTERMEDIATE, "Intermediate"),
                                              (Self::START, "Start"),
                                              (Self::END, "End"),
                                              (Self::FAILED, "Failed"),
                                              (Self::EXIT, "Exit")];

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` si contiene todas las marcas de `other`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` si comparte al menos una marca con `other`.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Conector de resultado final (`END` o `FAILED`).
    pub const fn is_terminal(self) -> bool {
        self.intersects(Self::TERMINAL)
    }

    /// Un token en un conector así termina la ejecución del motor.
    pub const fn completes_run(self) -> bool {
        self.intersects(Self(Self::TERMINAL.0 | Self::EXIT.0))
    }
}

impl BitOr for NodeClassification {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeClassification {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for NodeClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES.iter()
                                          .filter(|(flag, _)| self.contains(*flag))
                                          .map(|(_, name)| *name)
                                          .collect();
        if names.is_empty() {
            write!(f, "None")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}
