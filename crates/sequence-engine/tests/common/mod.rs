#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use seqgen_engine::model::{
    Angle, Atom, AtomRecord, Band, Brightness, DatasetRecord, Flamingos2Disperser, Flamingos2Filter, Flamingos2Fpu,
    Flamingos2LongSlitConfig, GmosBinning, GmosFpu, GmosGrating, GmosLongSlitConfig, ObservationInput,
    ObservingMode, QaState, SequenceType, Step, StepEvent, StepRecord, StepStage, Target, TimeSpan, VisitId,
    Wavelength, WavelengthDither,
};
use seqgen_engine::{IntegrationTime, ItcResult};

pub fn timestamp(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 5, second / 60, second % 60).unwrap()
}

pub fn target() -> Target {
    Target {
        name: "NGC 5128".to_string(),
        brightness: Some(Brightness {
            band: Band::V,
            magnitude: 14.2,
        }),
        radial_velocity: Some(547.0),
    }
}

pub fn gmos_long_slit() -> GmosLongSlitConfig {
    GmosLongSlitConfig::new(GmosGrating::B1200, GmosFpu::LongSlit1_00, Wavelength::from_nanometers(500))
}

/// One dither, one offset: every science atom shares a configuration.
pub fn single_adjustment(exposures_per_atom: u32) -> GmosLongSlitConfig {
    let mut cfg = gmos_long_slit();
    cfg.explicit_x_bin = Some(GmosBinning::One);
    cfg.explicit_y_bin = Some(GmosBinning::One);
    cfg.explicit_wavelength_dithers = Some(vec![WavelengthDither::ZERO]);
    cfg.explicit_spatial_offsets = Some(vec![Angle::ZERO]);
    cfg.explicit_exposures_per_atom = Some(exposures_per_atom);
    cfg
}

pub fn flamingos2_long_slit() -> Flamingos2LongSlitConfig {
    Flamingos2LongSlitConfig {
        disperser: Flamingos2Disperser::R1200Jh,
        filter: Flamingos2Filter::Jh,
        fpu: Flamingos2Fpu::LongSlit2,
        explicit_read_mode: None,
        explicit_spatial_offsets: None,
    }
}

pub fn observation(id: &str, mode: ObservingMode, exposure_seconds: i64, exposure_count: u32) -> ObservationInput {
    let mut input = ObservationInput::new(id);
    input.target = Some(target());
    input.observing_mode = Some(mode);
    input.itc = Some(ItcResult {
        acquisition: IntegrationTime::new(TimeSpan::from_seconds(10), 1),
        science: IntegrationTime::new(TimeSpan::from_seconds(exposure_seconds), exposure_count),
    });
    input
}

/// Record of a generated step carrying the given events.
pub fn record_step(step: &Step, stages: &[(StepStage, u32)], qa: Option<QaState>) -> StepRecord {
    StepRecord {
        id: step.id,
        instrument_config: step.instrument_config.clone(),
        step_config: step.step_config,
        observe_class: step.observe_class,
        events: stages
            .iter()
            .map(|(stage, second)| StepEvent {
                stage: *stage,
                timestamp: timestamp(*second),
            })
            .collect(),
        datasets: vec![DatasetRecord {
            id: format!("N20260314S{}", step.id).as_str().into(),
            qa_state: qa,
        }],
    }
}

/// Record of a generated step that ran to completion.
pub fn completed(step: &Step, qa: Option<QaState>) -> StepRecord {
    record_step(step, &[(StepStage::StartStep, 0), (StepStage::EndStep, 30)], qa)
}

pub fn record_atom(atom: &Atom, visit: &str, sequence_type: SequenceType, steps: Vec<StepRecord>) -> AtomRecord {
    AtomRecord {
        id: atom.id,
        visit_id: VisitId::from(visit),
        sequence_type,
        steps,
    }
}
