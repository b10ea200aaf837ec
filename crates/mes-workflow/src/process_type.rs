use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Enum para identificar los procesos de fabricación que soporta el crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
  Assembly,
  Inspection,
  #[default]
  Unknown,
}

impl fmt::Display for ProcessType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ProcessType::Assembly => "assembly",
      ProcessType::Inspection => "inspection",
      ProcessType::Unknown => "unknown",
    };
    write!(f, "{}", s)
  }
}

impl FromStr for ProcessType {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "assembly" => Ok(ProcessType::Assembly),
      "inspection" => Ok(ProcessType::Inspection),
      _ => Ok(ProcessType::Unknown),
    }
  }
}
