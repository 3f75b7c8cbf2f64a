//! Step time estimates.
//!
//! A step costs the largest of the configuration changes it requires (they
//! proceed in parallel) plus exposure, readout and write time.

use serde::{Deserialize, Serialize};

use crate::model::{
    ExecutionHistory, Flamingos2Dynamic, Flamingos2ReadMode, GcalConfig, GmosAmpReadMode, GmosDynamic, Instrument,
    InstrumentConfig, Offset, ProtoStep, StepConfig, TimeSpan,
};

use super::reconcile::VisitScope;

/// Fixed time constants used by the estimator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModel {
    pub write_overhead: TimeSpan,
    pub science_fold_move: TimeSpan,
    pub gcal_change: TimeSpan,
    pub offset_constant: TimeSpan,
    /// Offset time per arcsecond of distance travelled.
    pub offset_per_arcsec: TimeSpan,
    pub gmos_filter_change: TimeSpan,
    pub gmos_fpu_change: TimeSpan,
    pub gmos_grating_change: TimeSpan,
    pub gmos_wavelength_change: TimeSpan,
    pub gmos_slow_read_overhead: TimeSpan,
    /// Full-frame, unbinned pixel readout time in slow read mode.
    pub gmos_slow_read_pixels: TimeSpan,
    pub gmos_fast_read_overhead: TimeSpan,
    pub gmos_fast_read_pixels: TimeSpan,
    pub gmos_south_read_extra: TimeSpan,
    pub flamingos2_filter_change: TimeSpan,
    pub flamingos2_disperser_change: TimeSpan,
    pub flamingos2_fpu_change: TimeSpan,
    pub flamingos2_bright_read: TimeSpan,
    pub flamingos2_medium_read: TimeSpan,
    pub flamingos2_faint_read: TimeSpan,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            write_overhead: TimeSpan::from_seconds(10),
            science_fold_move: TimeSpan::from_seconds(15),
            gcal_change: TimeSpan::from_seconds(5),
            offset_constant: TimeSpan::from_seconds(7),
            offset_per_arcsec: TimeSpan::from_micros(62_500),
            gmos_filter_change: TimeSpan::from_seconds(20),
            gmos_fpu_change: TimeSpan::from_seconds(60),
            gmos_grating_change: TimeSpan::from_seconds(90),
            gmos_wavelength_change: TimeSpan::from_seconds(10),
            gmos_slow_read_overhead: TimeSpan::from_millis(5_100),
            gmos_slow_read_pixels: TimeSpan::from_seconds(36),
            gmos_fast_read_overhead: TimeSpan::from_millis(3_100),
            gmos_fast_read_pixels: TimeSpan::from_seconds(12),
            gmos_south_read_extra: TimeSpan::from_seconds(1),
            flamingos2_filter_change: TimeSpan::from_seconds(50),
            flamingos2_disperser_change: TimeSpan::from_seconds(50),
            flamingos2_fpu_change: TimeSpan::from_seconds(60),
            flamingos2_bright_read: TimeSpan::from_seconds(2),
            flamingos2_medium_read: TimeSpan::from_seconds(5),
            flamingos2_faint_read: TimeSpan::from_seconds(20),
        }
    }
}

/// Where the science fold sends the beam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fold {
    #[default]
    Sky,
    Gcal,
}

/// Telescope and instrument state carried from one step to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EstimatorState {
    pub instrument: Option<InstrumentConfig>,
    pub fold: Fold,
    pub offset: Offset,
    pub gcal: Option<GcalConfig>,
}

impl EstimatorState {
    /// State left behind after executing a step.
    pub fn after(&self, instrument_config: &InstrumentConfig, step_config: &StepConfig) -> Self {
        let mut next = self.clone();
        next.instrument = Some(instrument_config.clone());
        match step_config {
            StepConfig::Science { offset, .. } => {
                next.fold = Fold::Sky;
                next.offset = *offset;
            }
            StepConfig::Gcal(gcal) => {
                next.fold = Fold::Gcal;
                next.gcal = Some(*gcal);
            }
            StepConfig::Bias | StepConfig::Dark => {}
        }
        next
    }

    /// State after the last step executed within a visit scope, whatever its
    /// sequence type, or the initial state when nothing has executed there.
    pub fn from_history(history: &ExecutionHistory, scope: VisitScope) -> Self {
        let visit = scope.visit(history);
        history
            .executed_steps()
            .filter(|(atom, _)| visit.map_or(true, |v| &atom.visit_id == v))
            .fold(Self::default(), |state, (_, step)| {
                state.after(&step.instrument_config, &step.step_config)
            })
    }
}

/// One configuration change and its cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChangeItem {
    pub name: String,
    pub estimate: TimeSpan,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChangeEstimate {
    pub items: Vec<ConfigChangeItem>,
    /// Largest item, zero when nothing changes.
    pub estimate: TimeSpan,
}

impl ConfigChangeEstimate {
    fn from_items(items: Vec<ConfigChangeItem>) -> Self {
        let estimate = items.iter().map(|i| i.estimate).max().unwrap_or_default();
        Self { items, estimate }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorEstimate {
    pub exposure: TimeSpan,
    pub readout: TimeSpan,
    pub write: TimeSpan,
    pub total: TimeSpan,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEstimate {
    pub config_change: ConfigChangeEstimate,
    pub detector: DetectorEstimate,
    pub total: TimeSpan,
}

/// Computes per-step estimates from a [`CostModel`].
#[derive(Debug, Clone, Default)]
pub struct StepEstimator {
    model: CostModel,
}

impl StepEstimator {
    pub fn new(model: CostModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &CostModel {
        &self.model
    }

    /// Estimate a step given the state before it; returns the state after.
    pub fn estimate(&self, state: &EstimatorState, step: &ProtoStep) -> (StepEstimate, EstimatorState) {
        let config_change = self.config_change(state, &step.instrument_config, &step.step_config);
        let detector = self.detector(&step.instrument_config);
        let total = config_change.estimate + detector.total;
        let next = state.after(&step.instrument_config, &step.step_config);
        (
            StepEstimate {
                config_change,
                detector,
                total,
            },
            next,
        )
    }

    /// Estimate a run of steps, threading the state through.
    pub fn estimate_all<'a>(
        &self,
        state: &EstimatorState,
        steps: impl IntoIterator<Item = &'a ProtoStep>,
    ) -> (Vec<StepEstimate>, EstimatorState) {
        let mut current = state.clone();
        let mut estimates = Vec::new();
        for step in steps {
            let (estimate, next) = self.estimate(&current, step);
            estimates.push(estimate);
            current = next;
        }
        (estimates, current)
    }

    fn config_change(
        &self,
        state: &EstimatorState,
        instrument_config: &InstrumentConfig,
        step_config: &StepConfig,
    ) -> ConfigChangeEstimate {
        let mut items = Vec::new();
        let mut push = |name: &str, estimate: TimeSpan| {
            items.push(ConfigChangeItem {
                name: name.to_string(),
                estimate,
            })
        };

        match step_config {
            StepConfig::Science { offset, .. } => {
                if state.fold == Fold::Gcal {
                    push("science fold", self.model.science_fold_move);
                }
                if *offset != state.offset {
                    push("offset", self.offset_cost(&state.offset, offset));
                }
            }
            StepConfig::Gcal(gcal) => {
                if state.fold == Fold::Sky {
                    push("science fold", self.model.science_fold_move);
                }
                if state.gcal.as_ref() != Some(gcal) {
                    push("gcal", self.model.gcal_change);
                }
            }
            StepConfig::Bias | StepConfig::Dark => {}
        }

        match (&state.instrument, instrument_config) {
            (Some(InstrumentConfig::GmosNorth(prev)), InstrumentConfig::GmosNorth(next))
            | (Some(InstrumentConfig::GmosSouth(prev)), InstrumentConfig::GmosSouth(next)) => {
                for (name, cost) in self.gmos_changes(prev, next) {
                    push(name, cost);
                }
            }
            (Some(InstrumentConfig::Flamingos2(prev)), InstrumentConfig::Flamingos2(next)) => {
                for (name, cost) in self.flamingos2_changes(prev, next) {
                    push(name, cost);
                }
            }
            _ => {}
        }

        ConfigChangeEstimate::from_items(items)
    }

    fn offset_cost(&self, from: &Offset, to: &Offset) -> TimeSpan {
        let distance = from.distance_arcsec(to);
        let per_arcsec = self.model.offset_per_arcsec.to_micros() as f64;
        self.model.offset_constant + TimeSpan::from_micros((distance * per_arcsec).round() as i64)
    }

    fn gmos_changes(&self, prev: &GmosDynamic, next: &GmosDynamic) -> Vec<(&'static str, TimeSpan)> {
        let mut changes = Vec::new();
        if prev.filter != next.filter {
            changes.push(("filter", self.model.gmos_filter_change));
        }
        if prev.fpu != next.fpu {
            changes.push(("fpu", self.model.gmos_fpu_change));
        }
        match (&prev.grating, &next.grating) {
            (Some(a), Some(b)) if a.grating == b.grating => {
                if a.wavelength != b.wavelength {
                    changes.push(("central wavelength", self.model.gmos_wavelength_change));
                }
            }
            (None, None) => {}
            _ => changes.push(("grating", self.model.gmos_grating_change)),
        }
        changes
    }

    fn flamingos2_changes(&self, prev: &Flamingos2Dynamic, next: &Flamingos2Dynamic) -> Vec<(&'static str, TimeSpan)> {
        let mut changes = Vec::new();
        if prev.filter != next.filter {
            changes.push(("filter", self.model.flamingos2_filter_change));
        }
        if prev.disperser != next.disperser {
            changes.push(("disperser", self.model.flamingos2_disperser_change));
        }
        if prev.fpu != next.fpu {
            changes.push(("fpu", self.model.flamingos2_fpu_change));
        }
        changes
    }

    fn detector(&self, instrument_config: &InstrumentConfig) -> DetectorEstimate {
        let exposure = instrument_config.exposure();
        let readout = match instrument_config {
            InstrumentConfig::GmosNorth(g) => self.gmos_readout(Instrument::GmosNorth, g),
            InstrumentConfig::GmosSouth(g) => self.gmos_readout(Instrument::GmosSouth, g),
            InstrumentConfig::Flamingos2(f) => match f.read_mode {
                Flamingos2ReadMode::Bright => self.model.flamingos2_bright_read,
                Flamingos2ReadMode::Medium => self.model.flamingos2_medium_read,
                Flamingos2ReadMode::Faint => self.model.flamingos2_faint_read,
            },
        };
        let write = self.model.write_overhead;
        DetectorEstimate {
            exposure,
            readout,
            write,
            total: exposure + readout + write,
        }
    }

    fn gmos_readout(&self, instrument: Instrument, dynamic: &GmosDynamic) -> TimeSpan {
        let (overhead, pixels) = match dynamic.readout.amp_read_mode {
            GmosAmpReadMode::Slow => (self.model.gmos_slow_read_overhead, self.model.gmos_slow_read_pixels),
            GmosAmpReadMode::Fast => (self.model.gmos_fast_read_overhead, self.model.gmos_fast_read_pixels),
        };
        let (num, den) = dynamic.roi.pixel_fraction();
        let binning = dynamic.readout.x_bin.count() * dynamic.readout.y_bin.count();
        let pixel_time = pixels.saturating_mul(num).div(den * binning);
        let extra = if instrument == Instrument::GmosSouth {
            self.model.gmos_south_read_extra
        } else {
            TimeSpan::ZERO
        };
        overhead + pixel_time + extra
    }
}
