// Archivo: workplan/mod.rs
// Propósito: modelo declarativo (blueprint) de un proceso: conectores, pasos y
// su cableado. Es inmutable en forma una vez publicado; editar crea una nueva
// versión.
mod classification;
mod equality;

pub use classification::NodeClassification;

use crate::errors::{FlowError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Identificador de un conector o paso, único dentro de su workplan.
pub type ElementId = u64;

/// Posición de dibujo. No tiene significado para la ejecución.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Nodo "plaza" del blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ElementId,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    pub classification: NodeClassification,
}

/// Tipo semántico de un resultado de paso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    Success,
    Failure,
}

/// Describe una salida del paso. `mapping_value` indica, para subworkflows,
/// el id del conector de salida interno que corresponde a esta salida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDescription {
    pub name: String,
    pub outcome: OutcomeKind,
    #[serde(default)]
    pub mapping_value: ElementId,
}

impl OutputDescription {
    pub fn success(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               outcome: OutcomeKind::Success,
               mapping_value: 0 }
    }

    pub fn failure(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               outcome: OutcomeKind::Failure,
               mapping_value: 0 }
    }

    pub fn mapped_to(mut self, connector: ElementId) -> Self {
        self.mapping_value = connector;
        self
    }
}

/// Nodo "transición" del blueprint.
///
/// `kind` es la clave con la que el `StepRegistry` resuelve la fábrica de la
/// transición; `parameters` es la configuración tipada del paso serializada en
/// JSON. Los slots vacíos de `inputs`/`outputs` se representan con `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub id: ElementId,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    pub kind: String,
    #[serde(default)]
    pub inputs: Vec<Option<ElementId>>,
    #[serde(default)]
    pub outputs: Vec<Option<ElementId>>,
    #[serde(default)]
    pub output_descriptions: Vec<OutputDescription>,
    #[serde(default)]
    pub parameters: JsonValue,
}

impl Step {
    /// Crea un paso sin cablear. El id lo asigna `Workplan::add_step`.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: 0,
               name: name.into(),
               position: Position::default(),
               kind: kind.into(),
               inputs: Vec::new(),
               outputs: Vec::new(),
               output_descriptions: Vec::new(),
               parameters: JsonValue::Null }
    }

    pub fn input(mut self, connector: ElementId) -> Self {
        self.inputs.push(Some(connector));
        self
    }

    pub fn output(mut self, connector: ElementId) -> Self {
        self.outputs.push(Some(connector));
        self
    }

    /// Añade un slot de salida sin conectar.
    pub fn empty_output(mut self) -> Self {
        self.outputs.push(None);
        self
    }

    pub fn describe(mut self, description: OutputDescription) -> Self {
        self.output_descriptions.push(description);
        self
    }

    pub fn with_parameters(mut self, parameters: JsonValue) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    /// Deserializa los parámetros del paso en `T`. Un paso sin parámetros se
    /// trata como un objeto vacío para que `T` pueda usar sus defaults.
    pub fn parameters_as<T: DeserializeOwned>(&self) -> Result<T> {
        let value = match &self.parameters {
            JsonValue::Null => JsonValue::Object(serde_json::Map::new()),
            other => other.clone(),
        };
        serde_json::from_value(value).map_err(|e| {
                                         FlowError::Configuration(format!("parámetros inválidos en paso {} ({}): {}",
                                                                          self.id, self.name, e))
                                     })
    }

    /// Salida usada cuando el paso se omite: la primera descrita como
    /// `Success`, o la 0.
    pub fn default_output(&self) -> usize {
        self.output_descriptions
            .iter()
            .position(|d| d.outcome == OutcomeKind::Success)
            .unwrap_or(0)
    }

    /// Ids de todos los conectores referenciados por el paso.
    pub fn connectors(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.inputs.iter().chain(self.outputs.iter()).flatten().copied()
    }
}

/// Estado de publicación de un workplan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkplanState {
    New,
    Released,
    Revoked,
}

/// Blueprint versionado de un proceso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workplan {
    id: Uuid,
    name: String,
    version: u32,
    state: WorkplanState,
    max_element_id: ElementId,
    connectors: Vec<Connector>,
    steps: Vec<Step>,
}

impl Workplan {
    /// Crea un workplan vacío en versión 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               version: 1,
               state: WorkplanState::New,
               max_element_id: 0,
               connectors: Vec::new(),
               steps: Vec::new() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn state(&self) -> WorkplanState {
        self.state
    }

    pub fn max_element_id(&self) -> ElementId {
        self.max_element_id
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn connector(&self, id: ElementId) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.id == id)
    }

    pub fn step(&self, id: ElementId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Primer conector marcado como `START`.
    pub fn start_connector(&self) -> Option<&Connector> {
        self.connectors
            .iter()
            .find(|c| c.classification.contains(NodeClassification::START))
    }

    /// Pasos que consumen del conector `id`, en orden de declaración.
    pub fn consumers(&self, id: ElementId) -> impl Iterator<Item = &Step> + '_ {
        self.steps.iter().filter(move |s| s.inputs.contains(&Some(id)))
    }

    /// Nombre legible de un elemento (conector o paso) para diagnósticos.
    pub fn element_name(&self, id: ElementId) -> Option<&str> {
        self.connector(id)
            .map(|c| c.name.as_str())
            .or_else(|| self.step(id).map(|s| s.name.as_str()))
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.ensure_editable()?;
        self.name = name.into();
        Ok(())
    }

    /// Añade un conector y devuelve el id asignado.
    pub fn add_connector(&mut self, name: impl Into<String>, classification: NodeClassification) -> Result<ElementId> {
        self.ensure_editable()?;
        let id = self.next_id();
        self.connectors.push(Connector { id,
                                         name: name.into(),
                                         position: Position::default(),
                                         classification });
        Ok(id)
    }

    /// Añade un paso. Todos sus slots deben referenciar conectores de este
    /// workplan.
    pub fn add_step(&mut self, mut step: Step) -> Result<ElementId> {
        self.ensure_editable()?;
        if let Some(missing) = step.connectors().find(|c| self.connector(*c).is_none()) {
            return Err(FlowError::Configuration(format!("el paso '{}' referencia el conector inexistente {}",
                                                        step.name, missing)));
        }
        step.id = self.next_id();
        let id = step.id;
        self.steps.push(step);
        Ok(id)
    }

    /// Cambia la posición de dibujo de un conector o paso.
    pub fn set_position(&mut self, id: ElementId, position: Position) -> Result<()> {
        self.ensure_editable()?;
        if let Some(c) = self.connectors.iter_mut().find(|c| c.id == id) {
            c.position = position;
            return Ok(());
        }
        if let Some(s) = self.steps.iter_mut().find(|s| s.id == id) {
            s.position = position;
            return Ok(());
        }
        Err(FlowError::NotFound(format!("elemento {}", id)))
    }

    pub fn remove_step(&mut self, id: ElementId) -> Result<Step> {
        self.ensure_editable()?;
        let idx = self.steps
                      .iter()
                      .position(|s| s.id == id)
                      .ok_or_else(|| FlowError::NotFound(format!("paso {}", id)))?;
        Ok(self.steps.remove(idx))
    }

    /// Elimina un conector y deja vacíos los slots que lo referenciaban.
    pub fn remove_connector(&mut self, id: ElementId) -> Result<Connector> {
        self.ensure_editable()?;
        let idx = self.connectors
                      .iter()
                      .position(|c| c.id == id)
                      .ok_or_else(|| FlowError::NotFound(format!("conector {}", id)))?;
        for step in self.steps.iter_mut() {
            for slot in step.inputs.iter_mut().chain(step.outputs.iter_mut()) {
                if *slot == Some(id) {
                    *slot = None;
                }
            }
        }
        Ok(self.connectors.remove(idx))
    }

    /// Publica el workplan. A partir de aquí es inmutable.
    pub fn release(&mut self) -> Result<()> {
        match self.state {
            WorkplanState::New => {
                self.state = WorkplanState::Released;
                Ok(())
            }
            other => Err(FlowError::Conflict(format!("no se puede publicar un workplan en estado {:?}", other))),
        }
    }

    pub fn revoke(&mut self) -> Result<()> {
        match self.state {
            WorkplanState::Released => {
                self.state = WorkplanState::Revoked;
                Ok(())
            }
            other => Err(FlowError::Conflict(format!("no se puede revocar un workplan en estado {:?}", other))),
        }
    }

    /// Crea la siguiente versión editable con el mismo contenido.
    pub fn new_version(&self) -> Workplan {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.state = WorkplanState::New;
        next
    }

    /// Hash blake3 de la forma del workplan (conectores y pasos). Liga un
    /// snapshot con el workplan del que salió.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(&(&self.connectors, &self.steps))?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.state != WorkplanState::New {
            return Err(FlowError::Conflict(format!("el workplan {} v{} está {:?}; cree una nueva versión",
                                                   self.name, self.version, self.state)));
        }
        Ok(())
    }

    fn next_id(&mut self) -> ElementId {
        self.max_element_id += 1;
        self.max_element_id
    }
}
