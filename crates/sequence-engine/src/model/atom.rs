//! Atoms: indivisible groups of steps.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{AtomId, StepId};
use super::step::{Breakpoint, InstrumentConfig, ObserveClass, ProtoStep, StepConfig};
use super::units::TimeSpan;
use crate::sequence::estimate::StepEstimate;

/// The two independently generated sequences of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceType {
    Acquisition,
    Science,
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquisition => write!(f, "acquisition"),
            Self::Science => write!(f, "science"),
        }
    }
}

/// What an atom is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomKind {
    Acquisition,
    Science,
    Calibration,
}

/// A planned atom before identities and estimates are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoAtom {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: AtomKind,
    pub steps: Vec<ProtoStep>,
}

impl ProtoAtom {
    pub fn new(description: Option<String>, kind: AtomKind, steps: Vec<ProtoStep>) -> Self {
        Self {
            description,
            kind,
            steps,
        }
    }
}

/// A generated step with its identity and time estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub instrument_config: InstrumentConfig,
    pub step_config: StepConfig,
    pub observe_class: ObserveClass,
    pub breakpoint: Breakpoint,
    pub estimate: StepEstimate,
}

/// A generated atom, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atom {
    pub id: AtomId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: AtomKind,
    pub steps: Vec<Step>,
    /// Sum of the step totals.
    pub total: TimeSpan,
}

impl Atom {
    pub fn new(id: AtomId, description: Option<String>, kind: AtomKind, steps: Vec<Step>) -> Self {
        let total = steps.iter().map(|s| s.estimate.total).sum();
        Self {
            id,
            description,
            kind,
            steps,
            total,
        }
    }

    pub fn observe_class(&self) -> Option<ObserveClass> {
        ObserveClass::most_significant(self.steps.iter().map(|s| s.observe_class))
    }
}
