//! Observation input files.
//!
//! Files ending in `.yaml` or `.yml` are read as YAML, everything else as JSON.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use seqgen_engine::ObservationInput;

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Read one observation from a file.
pub fn load_observation(path: &Path) -> Result<ObservationInput> {
    let content = fs::read_to_string(path).context(format!("Failed to read file: {:?}", path))?;
    let input = if is_yaml(path) {
        serde_yaml::from_str(&content).context(format!("Failed to parse YAML from file: {:?}", path))?
    } else {
        serde_json::from_str(&content).context(format!("Failed to parse JSON from file: {:?}", path))?
    };
    tracing::debug!(file = %path.display(), "Loaded observation");
    Ok(input)
}

/// Read every observation, failing on the first unreadable file.
pub fn load_observations<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ObservationInput>> {
    paths.iter().map(|p| load_observation(p.as_ref())).collect()
}
