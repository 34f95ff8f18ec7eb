//! The schema-target configuration read once at startup.

use serde_derive::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One fuzzing target: a schema name, where its types come from, and the
/// type to instantiate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTripTarget {
    pub name: String,
    #[serde(rename = "import")]
    pub import_path: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Returned when the target config cannot be used.
#[derive(Debug, PartialEq, Clone)]
pub enum TargetConfigError {
    Io(String),
    Parse(String),
    /// A target entry is missing one of its required fields.
    IncompleteTarget { index: usize },
}

/// Parses the JSON target config at `path`.
pub fn load_targets<P: AsRef<Path>>(path: P) -> Result<Vec<RoundTripTarget>, TargetConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| TargetConfigError::Io(e.to_string()))?;
    parse_targets(&raw)
}

fn parse_targets(raw: &str) -> Result<Vec<RoundTripTarget>, TargetConfigError> {
    let mut targets: Vec<RoundTripTarget> =
        serde_json::from_str(raw).map_err(|e| TargetConfigError::Parse(e.to_string()))?;
    for (index, target) in targets.iter_mut().enumerate() {
        target.import_path = target.import_path.trim().to_string();
        if target.name.is_empty() || target.import_path.is_empty() || target.type_name.is_empty() {
            return Err(TargetConfigError::IncompleteTarget { index });
        }
    }
    Ok(targets)
}
