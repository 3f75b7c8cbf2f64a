//! Identifiers for observations, visits, atoms, steps and datasets.
//!
//! Generated atom and step ids are UUID v5 values in a fixed namespace so the
//! same planned atom always receives the same id.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for every id derived by the engine.
const SEQUENCE_NAMESPACE: Uuid = Uuid::from_u128(0x5e9c_6e2a_41b7_4c1d_9a0f_73d2_2b8e_6a11);

/// Derive a stable id from a path-like key.
pub(crate) fn derive_uuid(key: &str) -> Uuid {
    Uuid::new_v5(&SEQUENCE_NAMESPACE, key.as_bytes())
}

/// Observation identifier, e.g. `o-2a1f`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationId(pub String);

impl ObservationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObservationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Visit identifier. A visit groups everything recorded during one
/// acquisition of the target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitId(pub String);

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VisitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Dataset identifier as assigned by the recording service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub String);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Atom identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomId(pub Uuid);

impl AtomId {
    pub fn derive(key: &str) -> Self {
        Self(derive_uuid(key))
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Step identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub Uuid);

impl StepId {
    pub fn derive(key: &str) -> Self {
        Self(derive_uuid(key))
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_ids_are_stable() {
        let a = AtomId::derive("o-1/science/atom/0");
        let b = AtomId::derive("o-1/science/atom/0");
        let c = AtomId::derive("o-1/science/atom/1");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.0.get_version_num(), 5);
    }

    #[test]
    fn test_observation_id_serializes_as_string() {
        let id = ObservationId::new("o-2a1f");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"o-2a1f\"");
        assert_eq!(id.to_string(), "o-2a1f");
    }
}
