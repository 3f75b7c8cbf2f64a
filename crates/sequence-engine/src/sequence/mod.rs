//! Sequence generation.
//!
//! This module ties the generation stages together:
//!
//! - **Spec**: Builds the static plan from the observing mode and ITC result
//! - **Reconcile**: Folds execution history into a progress cursor
//! - **Generator**: Expands the plan against the cursor, atom by atom
//! - **Calibration**: Interleaves arc and flat atoms with science
//! - **Estimate**: Per-step configuration change and detector costs
//! - **Digest**: Categorized time totals and charge invoices

pub mod calibration;
pub mod digest;
pub mod estimate;
pub mod generator;
pub mod reconcile;
pub mod spec;

pub use calibration::{CalibrationInjector, CalibrationRules, CalibrationSpec, LampExposure, ScienceAtom};
pub use digest::{
    CategorizedTime, CorrectionOp, DigestAggregator, ExecutionDigest, ObservationDigest, ProgramDigest,
    SequenceDigest, TimeChargeInvoice, TimeCorrection,
};
pub use estimate::{
    ConfigChangeEstimate, ConfigChangeItem, CostModel, DetectorEstimate, EstimatorState, Fold, StepEstimate,
    StepEstimator,
};
pub use generator::{AtomGenerator, AtomPlan, Continuation, Emission, GeneratedSequence, GeneratorState};
pub use reconcile::{HistoryReconciler, ProgressCursor, Resolution, VisitScope};
pub use spec::{reduce_offset_cycle, SequenceSpec, SetupTime, SpecificationBuilder};

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{SequenceError, SequenceResult};
use crate::itc::{ExposureTimeCalculator, StaticItc};
use crate::model::{Atom, ObservationInput, SequenceType, TimeSpan};

/// Generated acquisition and science sequences of one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Absent for observations that take no acquisition.
    pub acquisition: Option<GeneratedSequence>,
    pub science: GeneratedSequence,
}

/// Planned atoms for both sequence types.
struct Plans {
    acquisition: Option<AtomPlan>,
    science: AtomPlan,
}

impl Plans {
    fn from_spec(spec: &SequenceSpec) -> Self {
        let injector = CalibrationInjector::new(spec.rules.arcs_and_flats);
        let science = AtomPlan::finite(injector.inject(spec.science.atoms()));
        let acquisition = spec
            .acquisition
            .as_ref()
            .map(|acq| AtomPlan::repeating(vec![acq.initial_atom()], acq.repeat_atom()));
        Self { acquisition, science }
    }

    fn get(&self, sequence_type: SequenceType) -> Option<&AtomPlan> {
        match sequence_type {
            SequenceType::Acquisition => self.acquisition.as_ref(),
            SequenceType::Science => Some(&self.science),
        }
    }
}

/// Entry point for sequence generation and time accounting.
///
/// The engine holds only configuration; every call is a pure function of
/// its input and may run concurrently with any other.
#[derive(Debug, Clone, Default)]
pub struct SequenceEngine {
    config: EngineConfig,
    builder: SpecificationBuilder,
    reconciler: HistoryReconciler,
    estimator: StepEstimator,
    aggregator: DigestAggregator,
}

impl SequenceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_cost_model(config, CostModel::default())
    }

    pub fn with_cost_model(config: EngineConfig, model: CostModel) -> Self {
        Self {
            config,
            builder: SpecificationBuilder::new(),
            reconciler: HistoryReconciler::new(),
            estimator: StepEstimator::new(model),
            aggregator: DigestAggregator::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn estimator(&self) -> &StepEstimator {
        &self.estimator
    }

    /// Build the specification and apply the safety limits.
    pub fn specification(
        &self,
        input: &ObservationInput,
        itc: &dyn ExposureTimeCalculator,
    ) -> SequenceResult<SequenceSpec> {
        let spec = self.builder.build(input, itc)?;

        let projected = spec.projected_atom_count();
        let limit = self.config.sequence_atom_limit;
        if projected > limit {
            warn!(
                observation_id = %spec.observation_id,
                projected_atoms = projected,
                limit,
                "Sequence atom limit exceeded"
            );
            return Err(SequenceError::SequenceTooLong {
                observation_id: spec.observation_id.clone(),
                limit,
            });
        }

        if let Some(cycle) = spec.minimum_cycle() {
            let (estimates, _) = self.estimator.estimate_all(&EstimatorState::default(), &cycle);
            let duration: TimeSpan = estimates.iter().map(|e| e.total).sum();
            let ceiling = TimeSpan::from_minutes(self.config.max_cycle_minutes as i64);
            if duration > ceiling {
                warn!(
                    observation_id = %spec.observation_id,
                    cycle = %duration,
                    ceiling = %ceiling,
                    "Minimum cycle exceeds ceiling"
                );
                return Err(SequenceError::CycleTooLong {
                    observation_id: spec.observation_id.clone(),
                    computed_minutes: duration.format_minutes(),
                    ceiling_minutes: self.config.max_cycle_minutes,
                });
            }
        }

        Ok(spec)
    }

    fn generator<'a>(
        &'a self,
        input: &'a ObservationInput,
        sequence_type: SequenceType,
        plan: &'a AtomPlan,
        cursor: &'a ProgressCursor,
    ) -> AtomGenerator<'a> {
        AtomGenerator::new(&input.observation_id, sequence_type, plan, cursor, &self.estimator)
    }

    fn cursor(&self, input: &ObservationInput, sequence_type: SequenceType) -> ProgressCursor {
        self.reconciler
            .reconcile(&input.history, sequence_type, VisitScope::for_sequence(sequence_type))
    }

    fn generate_type(
        &self,
        input: &ObservationInput,
        sequence_type: SequenceType,
        plans: &Plans,
        limit: usize,
    ) -> Option<GeneratedSequence> {
        let plan = plans.get(sequence_type)?;
        let cursor = self.cursor(input, sequence_type);
        let initial = EstimatorState::from_history(&input.history, VisitScope::for_sequence(sequence_type));
        Some(self.generator(input, sequence_type, plan, &cursor).generate(initial, limit))
    }

    /// Next atom and a window of future atoms for both sequence types.
    pub fn generate(
        &self,
        input: &ObservationInput,
        itc: &dyn ExposureTimeCalculator,
        limit: Option<usize>,
    ) -> SequenceResult<ExecutionConfig> {
        let start = Instant::now();
        let spec = self.specification(input, itc)?;
        let plans = Plans::from_spec(&spec);
        let limit = self.config.future_limit(limit);

        let acquisition = self.generate_type(input, SequenceType::Acquisition, &plans, limit);
        let science = self
            .generate_type(input, SequenceType::Science, &plans, limit)
            .unwrap_or(GeneratedSequence {
                next_atom: None,
                possible_future: Vec::new(),
                has_more: false,
                state: GeneratorState::Exhausted,
            });

        info!(
            observation_id = %input.observation_id,
            mode = spec.mode,
            acquisition = %acquisition.as_ref().map(|a| a.state.to_string()).unwrap_or_else(|| "none".to_string()),
            science = %science.state,
            future_atoms = science.possible_future.len(),
            has_more = science.has_more,
            "Generated sequence"
        );
        tracing::debug!(
            target: "seqgen.performance",
            observation_id = %input.observation_id,
            duration_us = %start.elapsed().as_micros(),
            "Sequence generation complete"
        );

        Ok(ExecutionConfig { acquisition, science })
    }

    /// Generate using the ITC result carried by the input.
    pub fn generate_static(&self, input: &ObservationInput, limit: Option<usize>) -> SequenceResult<ExecutionConfig> {
        self.generate(input, &StaticItc::for_observation(input), limit)
    }

    /// The atom to execute next, if any.
    pub fn next_atom(
        &self,
        input: &ObservationInput,
        itc: &dyn ExposureTimeCalculator,
        sequence_type: SequenceType,
    ) -> SequenceResult<Option<Atom>> {
        let spec = self.specification(input, itc)?;
        let plans = Plans::from_spec(&spec);
        Ok(self
            .generate_type(input, sequence_type, &plans, 0)
            .and_then(|generated| generated.next_atom))
    }

    /// Time digest of an observation: what remains and what has been charged.
    pub fn digest(
        &self,
        input: &ObservationInput,
        itc: &dyn ExposureTimeCalculator,
    ) -> SequenceResult<ObservationDigest> {
        let start = Instant::now();
        let spec = self.specification(input, itc)?;
        let plans = Plans::from_spec(&spec);

        let acquisition = plans.acquisition.as_ref().map(|plan| {
            let cursor = self.cursor(input, SequenceType::Acquisition);
            let scope = VisitScope::for_sequence(SequenceType::Acquisition);
            let initial = EstimatorState::from_history(&input.history, scope);
            let atoms = self
                .generator(input, SequenceType::Acquisition, plan, &cursor)
                .remaining(initial);
            self.aggregator.sequence_digest(&atoms)
        });

        let cursor = self.cursor(input, SequenceType::Science);
        let initial = EstimatorState::from_history(&input.history, VisitScope::AllVisits);
        let atoms = self
            .generator(input, SequenceType::Science, &plans.science, &cursor)
            .remaining(initial);
        let science = self.aggregator.sequence_digest(&atoms);

        let remaining = self.aggregator.remaining(&spec.setup, &science);
        let invoice = self
            .aggregator
            .invoice(&input.history, &self.estimator, &input.corrections);

        tracing::debug!(
            target: "seqgen.performance",
            observation_id = %input.observation_id,
            science_atoms = science.atom_count,
            duration_us = %start.elapsed().as_micros(),
            "Digest complete"
        );

        Ok(ObservationDigest {
            observation_id: input.observation_id.clone(),
            execution: ExecutionDigest {
                setup: spec.setup,
                acquisition,
                science,
            },
            invoice,
            remaining,
        })
    }

    pub fn digest_static(&self, input: &ObservationInput) -> SequenceResult<ObservationDigest> {
        self.digest(input, &StaticItc::for_observation(input))
    }

    /// Additive digest over a set of observations, each using its own ITC
    /// result. Fails on the first observation that cannot be digested.
    pub fn program_digest<'a>(
        &self,
        inputs: impl IntoIterator<Item = &'a ObservationInput>,
    ) -> SequenceResult<ProgramDigest> {
        let digests = inputs
            .into_iter()
            .map(|input| self.digest_static(input))
            .collect::<SequenceResult<Vec<_>>>()?;
        Ok(self.aggregator.program(&digests))
    }
}
