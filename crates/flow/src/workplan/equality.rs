// Archivo: equality.rs
// Propósito: igualdad estructural entre workplans. Los ids y nombres no
// importan; se recorre el grafo desde el conector de inicio en paralelo en
// ambos workplans y se exige una biyección consistente entre elementos.
use super::{ElementId, Workplan};
use std::collections::HashMap;

enum Pairing {
    New,
    Seen,
    Mismatch,
}

/// Biyección parcial entre los ids de dos workplans.
#[derive(Default)]
struct Bijection {
    forward: HashMap<ElementId, ElementId>,
    backward: HashMap<ElementId, ElementId>,
}

impl Bijection {
    fn pair(&mut self, a: ElementId, b: ElementId) -> Pairing {
        match (self.forward.get(&a), self.backward.get(&b)) {
            (None, None) => {
                self.forward.insert(a, b);
                self.backward.insert(b, a);
                Pairing::New
            }
            (Some(x), Some(y)) if *x == b && *y == a => Pairing::Seen,
            _ => Pairing::Mismatch,
        }
    }
}

impl Workplan {
    /// Compara la topología de dos workplans.
    ///
    /// Conectores deben coincidir en clasificación y pasos en tipo y forma de
    /// slots, visitados en el mismo orden. Un ciclo en un lado debe cerrarse
    /// sobre el elemento equivalente del otro lado.
    pub fn structurally_equal(&self, other: &Workplan) -> bool {
        if self.connectors.len() != other.connectors.len() || self.steps.len() != other.steps.len() {
            return false;
        }
        let (start_a, start_b) = match (self.start_connector(), other.start_connector()) {
            (Some(a), Some(b)) => (a.id, b.id),
            (None, None) => return true,
            _ => return false,
        };

        let mut connectors = Bijection::default();
        let mut steps = Bijection::default();
        let mut pending = vec![(start_a, start_b)];

        while let Some((ca, cb)) = pending.pop() {
            match connectors.pair(ca, cb) {
                Pairing::Mismatch => return false,
                Pairing::Seen => continue,
                Pairing::New => {}
            }
            let (conn_a, conn_b) = match (self.connector(ca), other.connector(cb)) {
                (Some(a), Some(b)) => (a, b),
                _ => return false,
            };
            if conn_a.classification != conn_b.classification {
                return false;
            }

            let consumers_a: Vec<_> = self.consumers(ca).collect();
            let consumers_b: Vec<_> = other.consumers(cb).collect();
            if consumers_a.len() != consumers_b.len() {
                return false;
            }

            for (sa, sb) in consumers_a.into_iter().zip(consumers_b) {
                match steps.pair(sa.id, sb.id) {
                    Pairing::Mismatch => return false,
                    Pairing::Seen => continue,
                    Pairing::New => {}
                }
                if sa.kind != sb.kind
                   || sa.inputs.len() != sb.inputs.len()
                   || sa.outputs.len() != sb.outputs.len()
                {
                    return false;
                }
                let slots_a = sa.inputs.iter().chain(sa.outputs.iter());
                let slots_b = sb.inputs.iter().chain(sb.outputs.iter());
                // Se apilan en orden inverso para visitar las salidas en orden
                // de slot.
                let mut next = Vec::new();
                for (slot_a, slot_b) in slots_a.zip(slots_b) {
                    match (slot_a, slot_b) {
                        (None, None) => {}
                        (Some(x), Some(y)) => next.push((*x, *y)),
                        _ => return false,
                    }
                }
                pending.extend(next.into_iter().rev());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::workplan::{NodeClassification, Step, Workplan};

    fn linear(name: &str, end: NodeClassification) -> Workplan {
        let mut wp = Workplan::new(name);
        let start = wp.add_connector("start", NodeClassification::START).expect("start");
        let done = wp.add_connector("done", end).expect("end");
        wp.add_step(Step::new("task", "work").input(start).output(done)).expect("step");
        wp
    }

    #[test]
    fn different_terminal_classification_is_not_equal() {
        let a = linear("a", NodeClassification::END);
        let b = linear("b", NodeClassification::FAILED);
        assert!(!a.structurally_equal(&b));
        assert!(a.structurally_equal(&linear("c", NodeClassification::END)));
    }
}
