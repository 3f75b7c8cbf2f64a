//! Engine limits.

use serde::{Deserialize, Serialize};

/// Limits applied to every generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of atoms a full plan may require.
    #[serde(default = "default_sequence_atom_limit")]
    pub sequence_atom_limit: usize,

    /// Ceiling on an instrument's minimum repeating cycle, in minutes.
    #[serde(default = "default_max_cycle_minutes")]
    pub max_cycle_minutes: u64,

    /// Future atoms returned when the caller gives no limit.
    #[serde(default = "default_future_limit")]
    pub default_future_limit: usize,

    /// Largest future window a caller may request.
    #[serde(default = "default_max_future_limit")]
    pub max_future_limit: usize,
}

fn default_sequence_atom_limit() -> usize {
    1000
}

fn default_max_cycle_minutes() -> u64 {
    60
}

fn default_future_limit() -> usize {
    25
}

fn default_max_future_limit() -> usize {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sequence_atom_limit: default_sequence_atom_limit(),
            max_cycle_minutes: default_max_cycle_minutes(),
            default_future_limit: default_future_limit(),
            max_future_limit: default_max_future_limit(),
        }
    }
}

impl EngineConfig {
    /// Resolve a caller-supplied future limit against the configured bounds.
    pub fn future_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_future_limit)
            .min(self.max_future_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.sequence_atom_limit, 1000);
        assert_eq!(config.max_cycle_minutes, 60);
        assert_eq!(config.default_future_limit, 25);
        assert_eq!(config.max_future_limit, 100);
    }

    #[test]
    fn test_future_limit_is_clamped() {
        let config = EngineConfig::default();
        assert_eq!(config.future_limit(None), 25);
        assert_eq!(config.future_limit(Some(3)), 3);
        assert_eq!(config.future_limit(Some(500)), 100);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"sequence_atom_limit": 10}"#).unwrap();
        assert_eq!(config.sequence_atom_limit, 10);
        assert_eq!(config.max_future_limit, 100);
    }
}
