//! Atom generation state machine.
//!
//! Generation is a pure transition over a [`Continuation`]: given where the
//! previous call stopped, [`AtomGenerator::advance`] resolves planned atoms
//! against the progress cursor, skips what is done, and yields the next atom
//! together with the continuation for the one after. Callers page through
//! the future by repeated application; nothing is held between calls.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Atom, AtomId, AtomKind, ObservationId, ProtoAtom, ProtoStep, SequenceType, Step, StepId};

use super::estimate::{EstimatorState, StepEstimator};
use super::reconcile::{ProgressCursor, RedoStep, Resolution};

/// Planned atoms of one sequence type.
///
/// Finite plans end after their last atom; repeating plans continue with the
/// same atom indefinitely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomPlan {
    atoms: Vec<ProtoAtom>,
    repeat: Option<ProtoAtom>,
}

impl AtomPlan {
    pub fn finite(atoms: Vec<ProtoAtom>) -> Self {
        Self { atoms, repeat: None }
    }

    pub fn repeating(prefix: Vec<ProtoAtom>, repeat: ProtoAtom) -> Self {
        Self {
            atoms: prefix,
            repeat: Some(repeat),
        }
    }

    pub fn get(&self, position: usize) -> Option<&ProtoAtom> {
        self.atoms.get(position).or(self.repeat.as_ref())
    }

    /// Number of planned atoms, `None` when unbounded.
    pub fn len(&self) -> Option<usize> {
        match self.repeat {
            Some(_) => None,
            None => Some(self.atoms.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty() && self.repeat.is_none()
    }

    pub fn is_unbounded(&self) -> bool {
        self.repeat.is_some()
    }
}

/// Where generation stands, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorState {
    /// Nothing recorded yet.
    Unconsumed,
    /// The next atom continues one already started.
    Resuming,
    /// History exists and the next atom is new.
    Producing,
    /// The plan is complete.
    Exhausted,
}

impl std::fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconsumed => write!(f, "unconsumed"),
            Self::Resuming => write!(f, "resuming"),
            Self::Producing => write!(f, "producing"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRedo {
    redo: RedoStep,
    kind: AtomKind,
}

/// Restartable generation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    position: usize,
    pending: VecDeque<PendingRedo>,
    estimator: EstimatorState,
}

impl Continuation {
    pub fn new(estimator: EstimatorState) -> Self {
        Self {
            position: 0,
            pending: VecDeque::new(),
            estimator,
        }
    }

    /// Index of the next planned atom to consider.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// One generated atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub atom: Atom,
    /// The atom was already started.
    pub resumed: bool,
}

/// Window of generated atoms for one sequence type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSequence {
    pub next_atom: Option<Atom>,
    pub possible_future: Vec<Atom>,
    pub has_more: bool,
    pub state: GeneratorState,
}

/// Expands a plan against a progress cursor.
pub struct AtomGenerator<'a> {
    observation_id: &'a ObservationId,
    sequence_type: SequenceType,
    plan: &'a AtomPlan,
    cursor: &'a ProgressCursor,
    estimator: &'a StepEstimator,
}

impl<'a> AtomGenerator<'a> {
    pub fn new(
        observation_id: &'a ObservationId,
        sequence_type: SequenceType,
        plan: &'a AtomPlan,
        cursor: &'a ProgressCursor,
        estimator: &'a StepEstimator,
    ) -> Self {
        Self {
            observation_id,
            sequence_type,
            plan,
            cursor,
            estimator,
        }
    }

    /// Identity of the planned atom at a position.
    pub fn atom_id(&self, position: usize) -> AtomId {
        AtomId::derive(&format!("{}/{}/atom/{}", self.observation_id, self.sequence_type, position))
    }

    /// Identity of the atom that repeats a failed step of a closed atom.
    pub fn redo_atom_id(&self, failed_step: &StepId) -> AtomId {
        AtomId::derive(&format!("{}/{}/redo/{}", self.observation_id, self.sequence_type, failed_step))
    }

    /// Produce the next atom after `from`, or `None` when the plan is done.
    pub fn advance(&self, from: &Continuation) -> Option<(Emission, Continuation)> {
        let mut next = from.clone();
        loop {
            let finite_done = self.plan.len().is_some_and(|len| next.position >= len);
            if (self.plan.is_unbounded() || finite_done) && !next.pending.is_empty() {
                let pending = next.pending.pop_front()?;
                let id = self.redo_atom_id(&pending.redo.failed_step);
                let planned = ProtoAtom::new(
                    Some("Repeat failed step".to_string()),
                    pending.kind,
                    vec![pending.redo.step],
                );
                match self.cursor.resolve(&id, &planned.steps) {
                    Resolution::Satisfied => continue,
                    Resolution::ClosedWithRedo(redo) => {
                        next.pending.extend(redo.into_iter().map(|redo| PendingRedo {
                            redo,
                            kind: pending.kind,
                        }));
                        continue;
                    }
                    resolution => return Some(self.emit(id, &planned, resolution, next)),
                }
            }

            let planned = self.plan.get(next.position)?;
            let id = self.atom_id(next.position);
            next.position += 1;
            match self.cursor.resolve(&id, &planned.steps) {
                Resolution::Satisfied => {
                    debug!(atom_id = %id, sequence_type = %self.sequence_type, "Atom satisfied");
                }
                Resolution::ClosedWithRedo(redo) => {
                    debug!(atom_id = %id, redo_steps = redo.len(), "Atom closed with failed steps");
                    next.pending.extend(redo.into_iter().map(|redo| PendingRedo {
                        redo,
                        kind: planned.kind,
                    }));
                }
                resolution => return Some(self.emit(id, planned, resolution, next)),
            }
        }
    }

    fn emit(
        &self,
        id: AtomId,
        planned: &ProtoAtom,
        resolution: Resolution,
        mut next: Continuation,
    ) -> (Emission, Continuation) {
        let (steps, resumed): (Vec<(StepId, &ProtoStep)>, bool) = match &resolution {
            Resolution::InProgress { remaining, redo } => {
                let planned_steps = remaining
                    .iter()
                    .filter_map(|i| planned.steps.get(*i).map(|s| (step_id(&id, *i), s)));
                let redo_steps = redo
                    .iter()
                    .map(|r| (StepId::derive(&format!("{}/redo/{}", id, r.failed_step)), &r.step));
                (planned_steps.chain(redo_steps).collect(), true)
            }
            _ => (
                planned
                    .steps
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (step_id(&id, i), s))
                    .collect(),
                false,
            ),
        };

        let mut generated = Vec::with_capacity(steps.len());
        for (sid, proto) in steps {
            let (estimate, after) = self.estimator.estimate(&next.estimator, proto);
            next.estimator = after;
            generated.push(Step {
                id: sid,
                instrument_config: proto.instrument_config.clone(),
                step_config: proto.step_config,
                observe_class: proto.observe_class,
                breakpoint: proto.breakpoint,
                estimate,
            });
        }

        let atom = Atom::new(id, planned.description.clone(), planned.kind, generated);
        (Emission { atom, resumed }, next)
    }

    /// Next atom plus up to `limit` future atoms.
    pub fn generate(&self, initial: EstimatorState, limit: usize) -> GeneratedSequence {
        let start = Continuation::new(initial);
        let Some((first, mut cont)) = self.advance(&start) else {
            return GeneratedSequence {
                next_atom: None,
                possible_future: Vec::new(),
                has_more: false,
                state: GeneratorState::Exhausted,
            };
        };

        let state = if first.resumed {
            GeneratorState::Resuming
        } else if self.cursor.is_empty() {
            GeneratorState::Unconsumed
        } else {
            GeneratorState::Producing
        };

        let mut possible_future = Vec::new();
        while possible_future.len() < limit {
            match self.advance(&cont) {
                Some((emission, after)) => {
                    possible_future.push(emission.atom);
                    cont = after;
                }
                None => break,
            }
        }
        let has_more = self.advance(&cont).is_some();

        GeneratedSequence {
            next_atom: Some(first.atom),
            possible_future,
            has_more,
            state,
        }
    }

    /// Every remaining atom of a finite plan. Repeating plans yield only the
    /// atoms before the repetition starts, at least one.
    pub fn remaining(&self, initial: EstimatorState) -> Vec<Atom> {
        let bound = match self.plan.len() {
            Some(_) => usize::MAX,
            None => self.plan.atoms.len().max(1),
        };
        let mut atoms = Vec::new();
        let mut cont = Continuation::new(initial);
        while atoms.len() < bound {
            match self.advance(&cont) {
                Some((emission, after)) => {
                    atoms.push(emission.atom);
                    cont = after;
                }
                None => break,
            }
        }
        atoms
    }
}

fn step_id(atom: &AtomId, index: usize) -> StepId {
    StepId::derive(&format!("{}/{}", atom, index))
}
