//! Time digests and charge accounting.
//!
//! Step estimates roll up into [`CategorizedTime`] by the charge class of each
//! step's observe class. Executed time is charged through an invoice that
//! applies recorded corrections in order.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::model::{Atom, ChargeClass, ExecutionHistory, ObservationId, ObserveClass, Offset, ProtoStep, TimeSpan, VisitId};

use super::estimate::{EstimatorState, StepEstimator};
use super::spec::SetupTime;

/// Time split by who is charged for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CategorizedTime {
    #[serde(default)]
    pub program: TimeSpan,
    #[serde(default)]
    pub partner: TimeSpan,
    #[serde(default)]
    pub non_charged: TimeSpan,
}

impl CategorizedTime {
    pub fn total(&self) -> TimeSpan {
        self.program + self.partner + self.non_charged
    }

    pub fn get(&self, charge_class: ChargeClass) -> TimeSpan {
        match charge_class {
            ChargeClass::Program => self.program,
            ChargeClass::Partner => self.partner,
            ChargeClass::NonCharged => self.non_charged,
        }
    }

    fn slot(&mut self, charge_class: ChargeClass) -> &mut TimeSpan {
        match charge_class {
            ChargeClass::Program => &mut self.program,
            ChargeClass::Partner => &mut self.partner,
            ChargeClass::NonCharged => &mut self.non_charged,
        }
    }

    pub fn add(&mut self, charge_class: ChargeClass, amount: TimeSpan) {
        *self.slot(charge_class) += amount;
    }

    /// Subtract, clamping at zero.
    pub fn subtract(&mut self, charge_class: ChargeClass, amount: TimeSpan) {
        let slot = self.slot(charge_class);
        *slot = slot.saturating_sub(amount);
    }
}

impl std::ops::Add for CategorizedTime {
    type Output = CategorizedTime;

    fn add(self, rhs: CategorizedTime) -> CategorizedTime {
        CategorizedTime {
            program: self.program + rhs.program,
            partner: self.partner + rhs.partner,
            non_charged: self.non_charged + rhs.non_charged,
        }
    }
}

impl std::iter::Sum for CategorizedTime {
    fn sum<I: Iterator<Item = CategorizedTime>>(iter: I) -> Self {
        iter.fold(CategorizedTime::default(), |a, b| a + b)
    }
}

impl Serialize for CategorizedTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("CategorizedTime", 4)?;
        s.serialize_field("program", &self.program)?;
        s.serialize_field("partner", &self.partner)?;
        s.serialize_field("non_charged", &self.non_charged)?;
        s.serialize_field("total", &self.total())?;
        s.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionOp {
    Add,
    Subtract,
}

/// Manual adjustment to charged time, tied to a visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCorrection {
    #[serde(default)]
    pub visit_id: Option<VisitId>,
    pub charge_class: ChargeClass,
    pub op: CorrectionOp,
    pub amount: TimeSpan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeChargeInvoice {
    /// Estimated time of everything executed so far.
    pub execution: CategorizedTime,
    pub corrections: Vec<TimeCorrection>,
    pub final_charge: CategorizedTime,
}

/// Summary of a generated sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDigest {
    /// Most significant observe class in the sequence.
    pub observe_class: Option<ObserveClass>,
    pub time_estimate: CategorizedTime,
    /// Distinct science offsets in order of first appearance.
    pub offsets: Vec<Offset>,
    pub atom_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDigest {
    pub setup: SetupTime,
    pub acquisition: Option<SequenceDigest>,
    pub science: SequenceDigest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationDigest {
    pub observation_id: ObservationId,
    pub execution: ExecutionDigest,
    pub invoice: TimeChargeInvoice,
    /// Time still needed: full setup plus the remaining science sequence.
    pub remaining: CategorizedTime,
}

/// Additive roll-up of several observations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDigest {
    pub observations: Vec<ObservationId>,
    pub final_charge: CategorizedTime,
    pub remaining: CategorizedTime,
}

/// Rolls estimates up into digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestAggregator;

impl DigestAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn sequence_digest<'a>(&self, atoms: impl IntoIterator<Item = &'a Atom>) -> SequenceDigest {
        let mut time_estimate = CategorizedTime::default();
        let mut offsets: Vec<Offset> = Vec::new();
        let mut classes = Vec::new();
        let mut atom_count = 0;
        for atom in atoms {
            atom_count += 1;
            for step in &atom.steps {
                time_estimate.add(step.observe_class.charge_class(), step.estimate.total);
                classes.push(step.observe_class);
                if let Some(offset) = step.step_config.offset() {
                    if !offsets.contains(&offset) {
                        offsets.push(offset);
                    }
                }
            }
        }
        SequenceDigest {
            observe_class: ObserveClass::most_significant(classes),
            time_estimate,
            offsets,
            atom_count,
        }
    }

    /// Charge executed steps, then apply corrections in order.
    pub fn invoice(
        &self,
        history: &ExecutionHistory,
        estimator: &StepEstimator,
        corrections: &[TimeCorrection],
    ) -> TimeChargeInvoice {
        let mut execution = CategorizedTime::default();
        let mut state = EstimatorState::default();
        for (_, record) in history.executed_steps() {
            let step = ProtoStep::new(record.instrument_config.clone(), record.step_config, record.observe_class);
            let (estimate, next) = estimator.estimate(&state, &step);
            execution.add(record.observe_class.charge_class(), estimate.total);
            state = next;
        }

        let mut final_charge = execution;
        for correction in corrections {
            match correction.op {
                CorrectionOp::Add => final_charge.add(correction.charge_class, correction.amount),
                CorrectionOp::Subtract => final_charge.subtract(correction.charge_class, correction.amount),
            }
        }

        TimeChargeInvoice {
            execution,
            corrections: corrections.to_vec(),
            final_charge,
        }
    }

    /// Setup is charged to the program while any science remains.
    pub fn remaining(&self, setup: &SetupTime, science: &SequenceDigest) -> CategorizedTime {
        let mut remaining = science.time_estimate;
        if science.atom_count > 0 {
            remaining.add(ChargeClass::Program, setup.full);
        }
        remaining
    }

    pub fn program<'a>(&self, digests: impl IntoIterator<Item = &'a ObservationDigest>) -> ProgramDigest {
        digests.into_iter().fold(ProgramDigest::default(), |mut acc, digest| {
            acc.observations.push(digest.observation_id.clone());
            acc.final_charge = acc.final_charge + digest.invoice.final_charge;
            acc.remaining = acc.remaining + digest.remaining;
            acc
        })
    }
}
