//! Step-level configuration: what the telescope and instrument do for one
//! exposure, and how the resulting time is charged.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::flamingos2::Flamingos2Dynamic;
use super::gmos::GmosDynamic;
use super::units::{Offset, TimeSpan};

/// Category of an exposure, which decides who is charged for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObserveClass {
    Science,
    ProgramCal,
    PartnerCal,
    Acquisition,
    AcquisitionCal,
    DayCal,
}

impl ObserveClass {
    pub fn charge_class(self) -> ChargeClass {
        match self {
            Self::Science | Self::Acquisition | Self::ProgramCal => ChargeClass::Program,
            Self::PartnerCal | Self::AcquisitionCal => ChargeClass::Partner,
            Self::DayCal => ChargeClass::NonCharged,
        }
    }

    /// Higher is more significant. A sequence takes the class of its most
    /// significant step.
    pub fn significance(self) -> u8 {
        match self {
            Self::Science => 5,
            Self::ProgramCal => 4,
            Self::PartnerCal => 3,
            Self::Acquisition => 2,
            Self::AcquisitionCal => 1,
            Self::DayCal => 0,
        }
    }

    /// Most significant class among `classes`, if any.
    pub fn most_significant(classes: impl IntoIterator<Item = ObserveClass>) -> Option<ObserveClass> {
        classes.into_iter().max_by_key(|c| c.significance())
    }
}

impl fmt::Display for ObserveClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Science => write!(f, "science"),
            Self::ProgramCal => write!(f, "program_cal"),
            Self::PartnerCal => write!(f, "partner_cal"),
            Self::Acquisition => write!(f, "acquisition"),
            Self::AcquisitionCal => write!(f, "acquisition_cal"),
            Self::DayCal => write!(f, "day_cal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeClass {
    Program,
    Partner,
    NonCharged,
}

impl fmt::Display for ChargeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Program => write!(f, "program"),
            Self::Partner => write!(f, "partner"),
            Self::NonCharged => write!(f, "non_charged"),
        }
    }
}

/// Whether operators should pause before executing a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breakpoint {
    Enabled,
    #[default]
    Disabled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideState {
    #[default]
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcalLamp {
    CuAr,
    ThAr,
    Xe,
    Ar,
    QuartzHalogen,
    IrGreyBodyHigh,
    IrGreyBodyLow,
}

impl GcalLamp {
    pub fn is_arc(self) -> bool {
        matches!(self, Self::CuAr | Self::ThAr | Self::Xe | Self::Ar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcalFilter {
    None,
    Gmos,
    Nd10,
    Nd20,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcalDiffuser {
    Ir,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcalShutter {
    Open,
    Closed,
}

/// Calibration unit setup for a lamp exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GcalConfig {
    pub lamp: GcalLamp,
    pub filter: GcalFilter,
    pub diffuser: GcalDiffuser,
    pub shutter: GcalShutter,
}

/// Telescope-side part of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepConfig {
    Bias,
    Dark,
    Gcal(GcalConfig),
    Science {
        offset: Offset,
        #[serde(default)]
        guiding: GuideState,
    },
}

impl StepConfig {
    pub fn science(offset: Offset) -> Self {
        Self::Science {
            offset,
            guiding: GuideState::Enabled,
        }
    }

    /// Offset of an on-sky step.
    pub fn offset(&self) -> Option<Offset> {
        match self {
            Self::Science { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// Instrument family, used to look up per-instrument rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    GmosNorth,
    GmosSouth,
    Flamingos2,
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GmosNorth => write!(f, "GMOS-N"),
            Self::GmosSouth => write!(f, "GMOS-S"),
            Self::Flamingos2 => write!(f, "Flamingos 2"),
        }
    }
}

/// Instrument-side part of a step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentConfig {
    GmosNorth(GmosDynamic),
    GmosSouth(GmosDynamic),
    Flamingos2(Flamingos2Dynamic),
}

impl InstrumentConfig {
    pub fn instrument(&self) -> Instrument {
        match self {
            Self::GmosNorth(_) => Instrument::GmosNorth,
            Self::GmosSouth(_) => Instrument::GmosSouth,
            Self::Flamingos2(_) => Instrument::Flamingos2,
        }
    }

    pub fn exposure(&self) -> TimeSpan {
        match self {
            Self::GmosNorth(g) | Self::GmosSouth(g) => g.exposure,
            Self::Flamingos2(f) => f.exposure,
        }
    }
}

/// A planned step before it is given an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtoStep {
    pub instrument_config: InstrumentConfig,
    pub step_config: StepConfig,
    pub observe_class: ObserveClass,
    #[serde(default)]
    pub breakpoint: Breakpoint,
}

impl ProtoStep {
    pub fn new(instrument_config: InstrumentConfig, step_config: StepConfig, observe_class: ObserveClass) -> Self {
        Self {
            instrument_config,
            step_config,
            observe_class,
            breakpoint: Breakpoint::Disabled,
        }
    }

    pub fn with_breakpoint(mut self, breakpoint: Breakpoint) -> Self {
        self.breakpoint = breakpoint;
        self
    }

    /// Whether a recorded configuration executes this step. Breakpoints are
    /// operator hints and do not take part.
    pub fn matches(&self, instrument_config: &InstrumentConfig, step_config: &StepConfig, observe_class: ObserveClass) -> bool {
        self.observe_class == observe_class
            && self.step_config == *step_config
            && self.instrument_config == *instrument_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_class_mapping() {
        assert_eq!(ObserveClass::Science.charge_class(), ChargeClass::Program);
        assert_eq!(ObserveClass::Acquisition.charge_class(), ChargeClass::Program);
        assert_eq!(ObserveClass::ProgramCal.charge_class(), ChargeClass::Program);
        assert_eq!(ObserveClass::PartnerCal.charge_class(), ChargeClass::Partner);
        assert_eq!(ObserveClass::AcquisitionCal.charge_class(), ChargeClass::Partner);
        assert_eq!(ObserveClass::DayCal.charge_class(), ChargeClass::NonCharged);
    }

    #[test]
    fn test_most_significant_class() {
        let classes = [ObserveClass::PartnerCal, ObserveClass::Science, ObserveClass::DayCal];
        assert_eq!(ObserveClass::most_significant(classes), Some(ObserveClass::Science));
        assert_eq!(
            ObserveClass::most_significant([ObserveClass::AcquisitionCal, ObserveClass::Acquisition]),
            Some(ObserveClass::Acquisition)
        );
        assert_eq!(ObserveClass::most_significant([]), None);
    }

    #[test]
    fn test_step_config_serialization() {
        let json = serde_json::to_value(StepConfig::Bias).unwrap();
        assert_eq!(json, "bias");

        let science = StepConfig::science(Offset::ZERO);
        let json = serde_json::to_value(science).unwrap();
        assert_eq!(json["science"]["guiding"], "enabled");
        let back: StepConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, science);
    }

    #[test]
    fn test_gcal_arc_lamps() {
        assert!(GcalLamp::CuAr.is_arc());
        assert!(!GcalLamp::QuartzHalogen.is_arc());
    }
}
