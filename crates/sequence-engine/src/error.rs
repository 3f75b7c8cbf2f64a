//! Sequence generation error types.
//!
//! Every error is reported against an observation and renders as the
//! message surfaced to API callers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ObservationId;

/// A parameter required by the exposure time calculator that is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingParameter {
    Target,
    ObservingMode,
    Brightness,
    RadialVelocity,
}

impl fmt::Display for MissingParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target => write!(f, "target"),
            Self::ObservingMode => write!(f, "observing mode"),
            Self::Brightness => write!(f, "brightness"),
            Self::RadialVelocity => write!(f, "radial velocity"),
        }
    }
}

fn join_missing(params: &[MissingParameter]) -> String {
    params.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
}

/// Errors that can occur while generating a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Inputs needed to compute the plan are absent.
    #[error("Could not generate a sequence for {observation_id}: observation is missing {}", join_missing(.missing))]
    ConfigurationIncomplete {
        observation_id: ObservationId,
        missing: Vec<MissingParameter>,
    },

    /// The full plan would need more atoms than allowed.
    #[error("Could not generate a sequence for {observation_id}: the generated sequence is too long (more than {limit} atoms)")]
    SequenceTooLong { observation_id: ObservationId, limit: usize },

    /// The minimum repeating cycle takes longer than allowed.
    #[error("Could not generate a sequence for {observation_id}: the minimum cycle takes {computed_minutes} minutes, longer than the {ceiling_minutes} minute maximum")]
    CycleTooLong {
        observation_id: ObservationId,
        computed_minutes: String,
        ceiling_minutes: u64,
    },

    /// The exposure time calculator failed.
    #[error("Could not generate a sequence for {observation_id}: {message}")]
    ExternalService { observation_id: ObservationId, message: String },
}

impl SequenceError {
    pub fn observation_id(&self) -> &ObservationId {
        match self {
            Self::ConfigurationIncomplete { observation_id, .. }
            | Self::SequenceTooLong { observation_id, .. }
            | Self::CycleTooLong { observation_id, .. }
            | Self::ExternalService { observation_id, .. } => observation_id,
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationIncomplete { .. } => "configuration_incomplete",
            Self::SequenceTooLong { .. } => "sequence_too_long",
            Self::CycleTooLong { .. } => "cycle_too_long",
            Self::ExternalService { .. } => "external_service_error",
        }
    }
}

/// Result type for sequence generation.
pub type SequenceResult<T> = Result<T, SequenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_target_message() {
        let err = SequenceError::ConfigurationIncomplete {
            observation_id: ObservationId::new("o-7"),
            missing: vec![MissingParameter::Target],
        };
        assert_eq!(
            err.to_string(),
            "Could not generate a sequence for o-7: observation is missing target"
        );
    }

    #[test]
    fn test_every_missing_parameter_listed() {
        let err = SequenceError::ConfigurationIncomplete {
            observation_id: ObservationId::new("o-8"),
            missing: vec![MissingParameter::ObservingMode, MissingParameter::Brightness, MissingParameter::RadialVelocity],
        };
        assert_eq!(
            err.to_string(),
            "Could not generate a sequence for o-8: observation is missing observing mode, brightness, radial velocity"
        );
        assert_eq!(err.kind(), "configuration_incomplete");
    }

    #[test]
    fn test_limit_messages_are_prefixed() {
        let err = SequenceError::SequenceTooLong {
            observation_id: ObservationId::new("o-9"),
            limit: 1000,
        };
        assert!(err.to_string().starts_with("Could not generate a sequence for o-9: "));
        assert_eq!(err.observation_id().as_str(), "o-9");

        let err = SequenceError::CycleTooLong {
            observation_id: ObservationId::new("o-9"),
            computed_minutes: "81.33".to_string(),
            ceiling_minutes: 60,
        };
        assert!(err.to_string().contains("81.33 minutes"));
    }
}
