//! Recorded execution history.
//!
//! History is a flat, read-only snapshot: atoms in recording order, each with
//! its steps, and each step with its own events and datasets. Nothing here
//! points back at its parent; the reconciler folds over these lists.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::atom::SequenceType;
use super::ids::{AtomId, DatasetId, StepId, VisitId};
use super::step::{InstrumentConfig, ObserveClass, StepConfig};

/// Quality assessment assigned to a dataset after review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaState {
    Pass,
    Usable,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: DatasetId,
    #[serde(default)]
    pub qa_state: Option<QaState>,
}

/// Stage reported by the telescope control system for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStage {
    StartStep,
    EndConfigure,
    StartObserve,
    EndObserve,
    EndStep,
    Abort,
    Stop,
}

impl StepStage {
    /// Terminal stages end the step; the state they imply.
    fn terminal_state(self) -> Option<ExecutionState> {
        match self {
            Self::EndStep => Some(ExecutionState::Completed),
            Self::Abort => Some(ExecutionState::Aborted),
            Self::Stop => Some(ExecutionState::Stopped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    pub stage: StepStage,
    pub timestamp: DateTime<Utc>,
}

/// Execution state of a recorded step, derived from its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    NotStarted,
    Ongoing,
    Completed,
    Aborted,
    Stopped,
}

impl ExecutionState {
    /// Derive the state from a step's events. The latest terminal event wins;
    /// on equal timestamps the one recorded last wins.
    pub fn from_events(events: &[StepEvent]) -> Self {
        if events.is_empty() {
            return Self::NotStarted;
        }
        events
            .iter()
            .filter_map(|e| e.stage.terminal_state().map(|s| (e.timestamp, s)))
            .fold(None, |latest: Option<(DateTime<Utc>, ExecutionState)>, (ts, state)| match latest {
                Some((prev, _)) if prev > ts => latest,
                _ => Some((ts, state)),
            })
            .map(|(_, state)| state)
            .unwrap_or(Self::Ongoing)
    }

    /// Completed and stopped steps produced data and count as executed.
    pub fn is_executed(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Ongoing => write!(f, "ongoing"),
            Self::Completed => write!(f, "completed"),
            Self::Aborted => write!(f, "aborted"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: StepId,
    pub instrument_config: InstrumentConfig,
    pub step_config: StepConfig,
    pub observe_class: ObserveClass,
    #[serde(default)]
    pub events: Vec<StepEvent>,
    #[serde(default)]
    pub datasets: Vec<DatasetRecord>,
}

impl StepRecord {
    pub fn execution_state(&self) -> ExecutionState {
        ExecutionState::from_events(&self.events)
    }

    pub fn is_executed(&self) -> bool {
        self.execution_state().is_executed()
    }

    /// Any dataset of this step failed quality assessment.
    pub fn has_failed_dataset(&self) -> bool {
        self.datasets.iter().any(|d| d.qa_state == Some(QaState::Fail))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomRecord {
    pub id: AtomId,
    pub visit_id: VisitId,
    pub sequence_type: SequenceType,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
}

/// Everything recorded for one observation, in recording order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionHistory {
    #[serde(default)]
    pub atoms: Vec<AtomRecord>,
}

impl ExecutionHistory {
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Visit of the most recently recorded atom of any sequence type.
    pub fn latest_visit(&self) -> Option<&VisitId> {
        self.atoms.last().map(|a| &a.visit_id)
    }

    /// Recorded atoms of one sequence type, optionally narrowed to a visit.
    pub fn atoms_of<'a>(
        &'a self,
        sequence_type: SequenceType,
        visit: Option<&'a VisitId>,
    ) -> impl Iterator<Item = &'a AtomRecord> + 'a {
        self.atoms
            .iter()
            .filter(move |a| a.sequence_type == sequence_type)
            .filter(move |a| visit.map_or(true, |v| &a.visit_id == v))
    }

    /// Executed steps of every sequence type, in recording order.
    pub fn executed_steps(&self) -> impl Iterator<Item = (&AtomRecord, &StepRecord)> {
        self.atoms
            .iter()
            .flat_map(|a| a.steps.iter().map(move |s| (a, s)))
            .filter(|(_, s)| s.is_executed())
    }
}
