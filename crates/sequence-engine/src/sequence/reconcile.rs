//! Execution history reconciliation.
//!
//! Folds recorded atoms into a [`ProgressCursor`]: for every recorded atom
//! id, the steps that actually executed, in recording order. Planned atoms
//! are then resolved against the cursor by identity to decide whether they
//! are done, still in progress, or need failed steps redone.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    AtomId, ExecutionHistory, InstrumentConfig, ObserveClass, ProtoStep, SequenceType, StepConfig, StepId,
    StepRecord, VisitId,
};

/// Which visits a sequence type is reconciled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitScope {
    AllVisits,
    LatestVisit,
}

impl VisitScope {
    /// Acquisition restarts with every visit; science accumulates.
    pub fn for_sequence(sequence_type: SequenceType) -> Self {
        match sequence_type {
            SequenceType::Acquisition => Self::LatestVisit,
            SequenceType::Science => Self::AllVisits,
        }
    }

    /// The visit this scope narrows to, `None` meaning every visit.
    pub fn visit(self, history: &ExecutionHistory) -> Option<&VisitId> {
        match self {
            Self::AllVisits => None,
            Self::LatestVisit => history.latest_visit(),
        }
    }
}

/// An executed step, reduced to what reconciliation compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStep {
    pub id: StepId,
    pub instrument_config: InstrumentConfig,
    pub step_config: StepConfig,
    pub observe_class: ObserveClass,
    pub failed: bool,
}

impl From<&StepRecord> for ExecutedStep {
    fn from(record: &StepRecord) -> Self {
        Self {
            id: record.id,
            instrument_config: record.instrument_config.clone(),
            step_config: record.step_config,
            observe_class: record.observe_class,
            failed: record.has_failed_dataset(),
        }
    }
}

impl ExecutedStep {
    fn executes(&self, step: &ProtoStep) -> bool {
        step.matches(&self.instrument_config, &self.step_config, self.observe_class)
    }
}

/// Executed steps of one recorded atom, across every record sharing its id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomProgress {
    pub executed: Vec<ExecutedStep>,
}

/// A step to repeat because its data failed quality assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedoStep {
    /// Recorded step whose dataset failed.
    pub failed_step: StepId,
    pub step: ProtoStep,
}

/// How a planned atom stands against the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Never recorded.
    Fresh,
    /// Every planned step executed with acceptable data.
    Satisfied,
    /// Recorded but not finished: indices of planned steps still to run, then
    /// the steps to redo.
    InProgress { remaining: Vec<usize>, redo: Vec<RedoStep> },
    /// Every planned step executed but some data failed.
    ClosedWithRedo(Vec<RedoStep>),
}

/// Per-call view of what has executed for one sequence type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressCursor {
    atoms: HashMap<AtomId, AtomProgress>,
}

impl ProgressCursor {
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn recorded_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn progress(&self, id: &AtomId) -> Option<&AtomProgress> {
        self.atoms.get(id)
    }

    /// Match the executed steps of an atom against its planned steps.
    ///
    /// Executed steps consume the first unconsumed planned step they match,
    /// in recording order. A consumed step with failed data is queued for
    /// redo; a later executed step matching a queued redo satisfies it.
    /// Redo steps keep the recording order of their failures.
    pub fn resolve(&self, id: &AtomId, planned: &[ProtoStep]) -> Resolution {
        let Some(progress) = self.atoms.get(id) else {
            return Resolution::Fresh;
        };

        let mut consumed = vec![false; planned.len()];
        let mut redo: Vec<RedoStep> = Vec::new();
        for executed in &progress.executed {
            let planned_match = planned
                .iter()
                .enumerate()
                .find(|(i, step)| !consumed[*i] && executed.executes(step))
                .map(|(i, _)| i);

            if let Some(i) = planned_match {
                consumed[i] = true;
                if executed.failed {
                    redo.push(RedoStep {
                        failed_step: executed.id,
                        step: planned[i].clone(),
                    });
                }
            } else if let Some(r) = redo.iter().position(|r| executed.executes(&r.step)) {
                let satisfied = redo.remove(r);
                if executed.failed {
                    redo.push(RedoStep {
                        failed_step: executed.id,
                        step: satisfied.step,
                    });
                }
            } else {
                debug!(atom_id = %id, step_id = %executed.id, "Ignoring executed step with no planned counterpart");
            }
        }

        let remaining: Vec<usize> = consumed
            .iter()
            .enumerate()
            .filter(|(_, done)| !**done)
            .map(|(i, _)| i)
            .collect();

        match (remaining.is_empty(), redo.is_empty()) {
            (true, true) => Resolution::Satisfied,
            (true, false) => Resolution::ClosedWithRedo(redo),
            _ => Resolution::InProgress { remaining, redo },
        }
    }
}

/// Builds progress cursors from execution history.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryReconciler;

impl HistoryReconciler {
    pub fn new() -> Self {
        Self
    }

    pub fn reconcile(&self, history: &ExecutionHistory, sequence_type: SequenceType, scope: VisitScope) -> ProgressCursor {
        let start = Instant::now();
        let visit = scope.visit(history);

        let mut atoms: HashMap<AtomId, AtomProgress> = HashMap::new();
        let mut step_count = 0usize;
        for record in history.atoms_of(sequence_type, visit) {
            let progress = atoms.entry(record.id).or_default();
            for step in record.steps.iter().filter(|s| s.is_executed()) {
                progress.executed.push(ExecutedStep::from(step));
                step_count += 1;
            }
        }

        tracing::debug!(
            target: "seqgen.performance",
            sequence_type = %sequence_type,
            atom_count = atoms.len(),
            executed_steps = step_count,
            duration_us = %start.elapsed().as_micros(),
            "History reconciled"
        );

        ProgressCursor { atoms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AtomRecord, DatasetRecord, GmosBinning, GmosCcdMode, GmosDynamic, GmosRoi, Offset, QaState, StepEvent,
        StepStage, TimeSpan, VisitId,
    };
    use chrono::{TimeZone, Utc};

    fn proto(exposure: i64) -> ProtoStep {
        ProtoStep::new(
            InstrumentConfig::GmosNorth(GmosDynamic {
                exposure: TimeSpan::from_seconds(exposure),
                readout: GmosCcdMode::binned(GmosBinning::One, GmosBinning::Two),
                roi: GmosRoi::FullFrame,
                grating: None,
                filter: None,
                fpu: None,
            }),
            StepConfig::science(Offset::ZERO),
            ObserveClass::Science,
        )
    }

    fn record(step: &ProtoStep, n: u128, stage: Option<StepStage>, qa: Option<QaState>) -> StepRecord {
        StepRecord {
            id: StepId(uuid::Uuid::from_u128(n)),
            instrument_config: step.instrument_config.clone(),
            step_config: step.step_config,
            observe_class: step.observe_class,
            events: stage
                .map(|s| {
                    vec![StepEvent {
                        stage: s,
                        timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, n as u32).unwrap(),
                    }]
                })
                .unwrap_or_default(),
            datasets: vec![DatasetRecord {
                id: format!("N20260301S{:04}", n).as_str().into(),
                qa_state: qa,
            }],
        }
    }

    fn history(id: AtomId, steps: Vec<StepRecord>) -> ExecutionHistory {
        ExecutionHistory {
            atoms: vec![AtomRecord {
                id,
                visit_id: VisitId::from("v-1"),
                sequence_type: SequenceType::Science,
                steps,
            }],
        }
    }

    #[test]
    fn test_unrecorded_atom_is_fresh() {
        let cursor = HistoryReconciler::new().reconcile(&ExecutionHistory::default(), SequenceType::Science, VisitScope::AllVisits);
        assert!(cursor.is_empty());
        assert_eq!(cursor.resolve(&AtomId::derive("a"), &[proto(1)]), Resolution::Fresh);
    }

    #[test]
    fn test_all_executed_is_satisfied() {
        let id = AtomId::derive("a");
        let planned = vec![proto(1), proto(2)];
        let h = history(
            id,
            vec![
                record(&planned[0], 1, Some(StepStage::EndStep), Some(QaState::Pass)),
                record(&planned[1], 2, Some(StepStage::EndStep), None),
            ],
        );
        let cursor = HistoryReconciler::new().reconcile(&h, SequenceType::Science, VisitScope::AllVisits);
        assert_eq!(cursor.resolve(&id, &planned), Resolution::Satisfied);
    }

    #[test]
    fn test_partial_execution_is_in_progress() {
        let id = AtomId::derive("a");
        let planned = vec![proto(1), proto(2), proto(3)];
        let h = history(
            id,
            vec![
                record(&planned[0], 1, Some(StepStage::EndStep), None),
                record(&planned[1], 2, Some(StepStage::StartObserve), None),
            ],
        );
        let cursor = HistoryReconciler::new().reconcile(&h, SequenceType::Science, VisitScope::AllVisits);
        assert_eq!(
            cursor.resolve(&id, &planned),
            Resolution::InProgress {
                remaining: vec![1, 2],
                redo: vec![]
            }
        );
    }

    #[test]
    fn test_failed_step_queued_for_redo() {
        let id = AtomId::derive("a");
        let planned = vec![proto(1), proto(2)];
        let failed = record(&planned[0], 1, Some(StepStage::EndStep), Some(QaState::Fail));
        let failed_id = failed.id;
        let h = history(id, vec![failed]);
        let cursor = HistoryReconciler::new().reconcile(&h, SequenceType::Science, VisitScope::AllVisits);
        assert_eq!(
            cursor.resolve(&id, &planned),
            Resolution::InProgress {
                remaining: vec![1],
                redo: vec![RedoStep {
                    failed_step: failed_id,
                    step: planned[0].clone()
                }]
            }
        );
    }

    #[test]
    fn test_closed_atom_with_failure() {
        let id = AtomId::derive("a");
        let planned = vec![proto(1), proto(2)];
        let h = history(
            id,
            vec![
                record(&planned[0], 1, Some(StepStage::EndStep), Some(QaState::Usable)),
                record(&planned[1], 2, Some(StepStage::EndStep), Some(QaState::Fail)),
            ],
        );
        let cursor = HistoryReconciler::new().reconcile(&h, SequenceType::Science, VisitScope::AllVisits);
        match cursor.resolve(&id, &planned) {
            Resolution::ClosedWithRedo(redo) => {
                assert_eq!(redo.len(), 1);
                assert_eq!(redo[0].step, planned[1]);
            }
            other => panic!("unexpected resolution {:?}", other),
        }
    }

    #[test]
    fn test_multiple_failures_keep_recording_order() {
        let id = AtomId::derive("a");
        let planned = vec![proto(1), proto(2), proto(3)];
        let second = record(&planned[1], 1, Some(StepStage::EndStep), Some(QaState::Fail));
        let first = record(&planned[0], 2, Some(StepStage::EndStep), Some(QaState::Fail));
        let (second_id, first_id) = (second.id, first.id);
        let h = history(id, vec![second.clone(), first.clone()]);
        let cursor = HistoryReconciler::new().reconcile(&h, SequenceType::Science, VisitScope::AllVisits);
        let expected = vec![
            RedoStep {
                failed_step: second_id,
                step: planned[1].clone(),
            },
            RedoStep {
                failed_step: first_id,
                step: planned[0].clone(),
            },
        ];
        assert_eq!(
            cursor.resolve(&id, &planned),
            Resolution::InProgress {
                remaining: vec![2],
                redo: expected.clone()
            }
        );

        let closed = history(
            id,
            vec![
                second,
                first,
                record(&planned[2], 3, Some(StepStage::EndStep), Some(QaState::Pass)),
            ],
        );
        let cursor = HistoryReconciler::new().reconcile(&closed, SequenceType::Science, VisitScope::AllVisits);
        assert_eq!(cursor.resolve(&id, &planned), Resolution::ClosedWithRedo(expected));
    }

    #[test]
    fn test_executed_redo_satisfies_failure() {
        let id = AtomId::derive("a");
        let planned = vec![proto(1), proto(2)];
        let h = history(
            id,
            vec![
                record(&planned[0], 1, Some(StepStage::EndStep), Some(QaState::Fail)),
                record(&planned[1], 2, Some(StepStage::EndStep), None),
                record(&planned[0], 3, Some(StepStage::EndStep), Some(QaState::Pass)),
            ],
        );
        let cursor = HistoryReconciler::new().reconcile(&h, SequenceType::Science, VisitScope::AllVisits);
        assert_eq!(cursor.resolve(&id, &planned), Resolution::Satisfied);
    }

    #[test]
    fn test_aborted_step_is_not_consumed() {
        let id = AtomId::derive("a");
        let planned = vec![proto(1)];
        let h = history(id, vec![record(&planned[0], 1, Some(StepStage::Abort), None)]);
        let cursor = HistoryReconciler::new().reconcile(&h, SequenceType::Science, VisitScope::AllVisits);
        assert_eq!(
            cursor.resolve(&id, &planned),
            Resolution::InProgress {
                remaining: vec![0],
                redo: vec![]
            }
        );
    }

    #[test]
    fn test_latest_visit_scope() {
        let id = AtomId::derive("a");
        let planned = vec![proto(1)];
        let mut h = history(id, vec![record(&planned[0], 1, Some(StepStage::EndStep), None)]);
        h.atoms[0].sequence_type = SequenceType::Acquisition;
        h.atoms.push(AtomRecord {
            id: AtomId::derive("b"),
            visit_id: VisitId::from("v-2"),
            sequence_type: SequenceType::Science,
            steps: vec![],
        });
        let acquisition = HistoryReconciler::new().reconcile(&h, SequenceType::Acquisition, VisitScope::LatestVisit);
        assert!(acquisition.is_empty());
        let all = HistoryReconciler::new().reconcile(&h, SequenceType::Acquisition, VisitScope::AllVisits);
        assert_eq!(all.recorded_atoms(), 1);
    }
}
