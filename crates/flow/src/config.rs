// Archivo: config.rs
// Propósito: configuración del motor de ejecución.
use log::warn;

/// Límite por defecto de activaciones en una misma ráfaga de propagación.
pub const DEFAULT_MAX_ACTIVATIONS: usize = 100_000;

/// Configuración simple del motor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Máximo de activaciones que puede procesar una ráfaga antes de
    /// considerar que el workplan entró en un ciclo sin fin. Al superarlo el
    /// motor queda en `Faulted`.
    pub max_activations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_activations: DEFAULT_MAX_ACTIVATIONS }
    }
}

impl EngineConfig {
    /// Lee la configuración del entorno (y de `.env` si existe).
    ///
    /// - `FLOW_MAX_ACTIVATIONS`: entero positivo.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("FLOW_MAX_ACTIVATIONS") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_activations = n,
                _ => warn!("FLOW_MAX_ACTIVATIONS inválido ({}); se usa {}", raw, DEFAULT_MAX_ACTIVATIONS),
            }
        }
        config
    }
}
