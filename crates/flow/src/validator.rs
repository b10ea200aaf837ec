// Archivo: validator.rs
// Propósito: análisis estático de un workplan. Los hallazgos son datos, no
// errores: el llamador decide si el workplan puede publicarse.
use crate::workplan::{ElementId, NodeClassification, Workplan};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Conjunto de comprobaciones a ejecutar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationAspects(u32);

impl ValidationAspects {
    /// Conector intermedio alcanzable sin pasos que lo consuman.
    pub const DEAD_END: Self = Self(1);
    /// Paso inalcanzable desde el inicio.
    pub const LONE_WOLF: Self = Self(1 << 1);
    pub const ALL: Self = Self(Self::DEAD_END.0 | Self::LONE_WOLF.0);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ValidationAspects {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Hallazgo del validador.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationError {
    DeadEnd { connector_id: ElementId },
    LoneWolf { step_id: ElementId },
}

impl ValidationError {
    pub fn element_id(&self) -> ElementId {
        match self {
            ValidationError::DeadEnd { connector_id } => *connector_id,
            ValidationError::LoneWolf { step_id } => *step_id,
        }
    }

    /// Mensaje legible con los nombres del workplan.
    pub fn print(&self, workplan: &Workplan) -> String {
        let name = workplan.element_name(self.element_id()).unwrap_or("?");
        match self {
            ValidationError::DeadEnd { connector_id } => {
                format!("Callejón sin salida: el conector '{}' ({}) no tiene pasos que lo consuman",
                        name, connector_id)
            }
            ValidationError::LoneWolf { step_id } => {
                format!("Paso aislado: '{}' ({}) no es alcanzable desde el inicio", name, step_id)
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DeadEnd { connector_id } => write!(f, "dead end en conector {}", connector_id),
            ValidationError::LoneWolf { step_id } => write!(f, "lone wolf en paso {}", step_id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Renderiza todos los hallazgos, uno por línea.
    pub fn print(&self, workplan: &Workplan) -> String {
        self.errors
            .iter()
            .map(|e| e.print(workplan))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Ejecuta las comprobaciones pedidas en `aspects`.
pub fn validate(workplan: &Workplan, aspects: ValidationAspects) -> ValidationResult {
    let (connectors, steps) = reachable(workplan);
    let mut errors = Vec::new();

    if aspects.contains(ValidationAspects::DEAD_END) {
        for connector in workplan.connectors() {
            if connectors.contains(&connector.id)
               && connector.classification.contains(NodeClassification::INTERMEDIATE)
               && workplan.consumers(connector.id).next().is_none()
            {
                errors.push(ValidationError::DeadEnd { connector_id: connector.id });
            }
        }
    }

    if aspects.contains(ValidationAspects::LONE_WOLF) {
        for step in workplan.steps() {
            if !steps.contains(&step.id) {
                errors.push(ValidationError::LoneWolf { step_id: step.id });
            }
        }
    }

    ValidationResult { success: errors.is_empty(),
                       errors }
}

/// Conectores y pasos alcanzables desde el conector de inicio siguiendo las
/// salidas de los pasos.
fn reachable(workplan: &Workplan) -> (HashSet<ElementId>, HashSet<ElementId>) {
    let mut connectors = HashSet::new();
    let mut steps = HashSet::new();
    let mut queue: VecDeque<ElementId> = workplan.start_connector().map(|c| c.id).into_iter().collect();
    while let Some(id) = queue.pop_front() {
        if !connectors.insert(id) {
            continue;
        }
        for step in workplan.consumers(id) {
            if steps.insert(step.id) {
                queue.extend(step.outputs.iter().flatten().copied());
            }
        }
    }
    (connectors, steps)
}
