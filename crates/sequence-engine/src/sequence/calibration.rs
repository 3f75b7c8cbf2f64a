//! Calibration rules and arc/flat injection.
//!
//! Rules are keyed by instrument and calibration role. Ordinary science gets
//! one arc and flat atom ahead of every group of science atoms that share an
//! adjustment; calibration observations (twilight, spectrophotometric
//! standards) drop acquisition and arcs/flats and are charged differently.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    AtomKind, CalibrationRole, Flamingos2ReadMode, GcalConfig, GcalDiffuser, GcalFilter, GcalLamp, GcalShutter,
    GmosAmpReadMode, GmosRoi, Instrument, InstrumentConfig, ObserveClass, ProtoAtom, ProtoStep, StepConfig,
    TimeSpan,
};

/// One lamp exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LampExposure {
    pub gcal: GcalConfig,
    pub exposure: TimeSpan,
}

/// Arc and flat pair taken ahead of each science group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationSpec {
    pub arc: LampExposure,
    pub flat: LampExposure,
    pub observe_class: ObserveClass,
}

impl CalibrationSpec {
    fn gmos() -> Self {
        Self {
            arc: LampExposure {
                gcal: GcalConfig {
                    lamp: GcalLamp::CuAr,
                    filter: GcalFilter::None,
                    diffuser: GcalDiffuser::Visible,
                    shutter: GcalShutter::Closed,
                },
                exposure: TimeSpan::from_seconds(1),
            },
            flat: LampExposure {
                gcal: GcalConfig {
                    lamp: GcalLamp::QuartzHalogen,
                    filter: GcalFilter::Gmos,
                    diffuser: GcalDiffuser::Visible,
                    shutter: GcalShutter::Open,
                },
                exposure: TimeSpan::from_seconds(1),
            },
            observe_class: ObserveClass::PartnerCal,
        }
    }

    fn flamingos2() -> Self {
        Self {
            arc: LampExposure {
                gcal: GcalConfig {
                    lamp: GcalLamp::Ar,
                    filter: GcalFilter::None,
                    diffuser: GcalDiffuser::Ir,
                    shutter: GcalShutter::Closed,
                },
                exposure: TimeSpan::from_seconds(30),
            },
            flat: LampExposure {
                gcal: GcalConfig {
                    lamp: GcalLamp::IrGreyBodyHigh,
                    filter: GcalFilter::Nd20,
                    diffuser: GcalDiffuser::Ir,
                    shutter: GcalShutter::Open,
                },
                exposure: TimeSpan::from_seconds(15),
            },
            observe_class: ObserveClass::PartnerCal,
        }
    }
}

/// Generation rules for one instrument and calibration role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRules {
    /// Observe class given to the main sequence's exposures.
    pub science_class: ObserveClass,
    pub acquisition: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arcs_and_flats: Option<CalibrationSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi_override: Option<GmosRoi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_mode_override: Option<GmosAmpReadMode>,
}

impl CalibrationRules {
    /// Rules for a spectroscopic mode.
    pub fn for_long_slit(instrument: Instrument, role: Option<CalibrationRole>) -> Self {
        let arcs_and_flats = match instrument {
            Instrument::GmosNorth | Instrument::GmosSouth => CalibrationSpec::gmos(),
            Instrument::Flamingos2 => CalibrationSpec::flamingos2(),
        };
        let gmos = matches!(instrument, Instrument::GmosNorth | Instrument::GmosSouth);
        match role {
            None => Self {
                science_class: ObserveClass::Science,
                acquisition: true,
                arcs_and_flats: Some(arcs_and_flats),
                roi_override: None,
                read_mode_override: None,
            },
            Some(role) => Self {
                science_class: match role {
                    CalibrationRole::Twilight => ObserveClass::DayCal,
                    CalibrationRole::SpectroPhotometric => ObserveClass::PartnerCal,
                },
                acquisition: false,
                arcs_and_flats: None,
                roi_override: gmos.then_some(GmosRoi::CentralSpectrum),
                read_mode_override: gmos.then_some(GmosAmpReadMode::Fast),
            },
        }
    }

    /// Rules for an imaging mode. Imaging carries no acquisition and no
    /// arcs or flats.
    pub fn for_imaging(role: Option<CalibrationRole>) -> Self {
        Self {
            science_class: match role {
                None => ObserveClass::Science,
                Some(CalibrationRole::Twilight) => ObserveClass::DayCal,
                Some(CalibrationRole::SpectroPhotometric) => ObserveClass::PartnerCal,
            },
            acquisition: false,
            arcs_and_flats: None,
            roi_override: None,
            read_mode_override: None,
        }
    }
}

/// A science atom together with what its calibrations are derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScienceAtom {
    /// Atoms with equal group and no change in between share calibrations.
    pub group: usize,
    /// Instrument configuration the calibrations copy.
    pub calibration_base: InstrumentConfig,
    pub atom: ProtoAtom,
}

/// Interleaves arc/flat calibration atoms with science atoms.
#[derive(Debug, Clone, Default)]
pub struct CalibrationInjector {
    spec: Option<CalibrationSpec>,
}

impl CalibrationInjector {
    pub fn new(spec: Option<CalibrationSpec>) -> Self {
        Self { spec }
    }

    pub fn is_active(&self) -> bool {
        self.spec.is_some()
    }

    /// Insert a calibration atom before each run of science atoms sharing a
    /// group.
    pub fn inject(&self, science: impl IntoIterator<Item = ScienceAtom>) -> Vec<ProtoAtom> {
        let mut out = Vec::new();
        let mut current_group = None;
        for atom in science {
            if let Some(spec) = &self.spec {
                if current_group != Some(atom.group) {
                    debug!(group = atom.group, "Injecting arc and flat");
                    out.push(self.calibration_atom(spec, &atom.calibration_base));
                }
            }
            current_group = Some(atom.group);
            out.push(atom.atom);
        }
        out
    }

    fn calibration_atom(&self, spec: &CalibrationSpec, base: &InstrumentConfig) -> ProtoAtom {
        let steps = [spec.arc, spec.flat]
            .iter()
            .map(|lamp| {
                ProtoStep::new(
                    with_exposure(base, lamp.exposure),
                    StepConfig::Gcal(lamp.gcal),
                    spec.observe_class,
                )
            })
            .collect();
        ProtoAtom::new(Some("Arc and flat".to_string()), AtomKind::Calibration, steps)
    }
}

/// Copy an instrument configuration with a different exposure time. The
/// Flamingos 2 read mode follows the new exposure.
pub fn with_exposure(base: &InstrumentConfig, exposure: TimeSpan) -> InstrumentConfig {
    let mut config = base.clone();
    match &mut config {
        InstrumentConfig::GmosNorth(g) | InstrumentConfig::GmosSouth(g) => g.exposure = exposure,
        InstrumentConfig::Flamingos2(f) => {
            f.exposure = exposure;
            f.read_mode = Flamingos2ReadMode::for_exposure(exposure);
        }
    }
    config
}
