//! Observation input: target, observing mode, calibration role, exposure
//! time result and recorded history.

use serde::{Deserialize, Serialize};

use super::flamingos2::{Flamingos2Disperser, Flamingos2Filter, Flamingos2Fpu, Flamingos2ReadMode};
use super::gmos::{GmosAmpGain, GmosAmpReadMode, GmosBinning, GmosFilter, GmosFpu, GmosGrating, GmosRoi};
use super::history::ExecutionHistory;
use super::ids::ObservationId;
use super::step::Instrument;
use super::units::{Angle, Offset, Wavelength, WavelengthDither};
use crate::itc::ItcResult;
use crate::sequence::digest::TimeCorrection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    U,
    B,
    V,
    R,
    I,
    J,
    H,
    K,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brightness {
    pub band: Band,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(default)]
    pub brightness: Option<Brightness>,
    /// Radial velocity in km/s.
    #[serde(default)]
    pub radial_velocity: Option<f64>,
}

/// Role of an observation that exists to calibrate others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationRole {
    Twilight,
    SpectroPhotometric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmosLongSlitConfig {
    pub grating: GmosGrating,
    #[serde(default)]
    pub filter: Option<GmosFilter>,
    pub fpu: GmosFpu,
    pub central_wavelength: Wavelength,
    #[serde(default)]
    pub explicit_x_bin: Option<GmosBinning>,
    #[serde(default)]
    pub explicit_y_bin: Option<GmosBinning>,
    #[serde(default)]
    pub explicit_amp_read_mode: Option<GmosAmpReadMode>,
    #[serde(default)]
    pub explicit_amp_gain: Option<GmosAmpGain>,
    #[serde(default)]
    pub explicit_roi: Option<GmosRoi>,
    #[serde(default)]
    pub explicit_wavelength_dithers: Option<Vec<WavelengthDither>>,
    #[serde(default)]
    pub explicit_spatial_offsets: Option<Vec<Angle>>,
    #[serde(default)]
    pub explicit_exposures_per_atom: Option<u32>,
}

impl GmosLongSlitConfig {
    pub fn new(grating: GmosGrating, fpu: GmosFpu, central_wavelength: Wavelength) -> Self {
        Self {
            grating,
            filter: None,
            fpu,
            central_wavelength,
            explicit_x_bin: None,
            explicit_y_bin: None,
            explicit_amp_read_mode: None,
            explicit_amp_gain: None,
            explicit_roi: None,
            explicit_wavelength_dithers: None,
            explicit_spatial_offsets: None,
            explicit_exposures_per_atom: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmosImagingConfig {
    pub filters: Vec<GmosFilter>,
    #[serde(default)]
    pub explicit_x_bin: Option<GmosBinning>,
    #[serde(default)]
    pub explicit_y_bin: Option<GmosBinning>,
    #[serde(default)]
    pub explicit_amp_read_mode: Option<GmosAmpReadMode>,
    #[serde(default)]
    pub explicit_amp_gain: Option<GmosAmpGain>,
    #[serde(default)]
    pub explicit_roi: Option<GmosRoi>,
    #[serde(default)]
    pub explicit_spatial_offsets: Option<Vec<Offset>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flamingos2LongSlitConfig {
    pub disperser: Flamingos2Disperser,
    pub filter: Flamingos2Filter,
    pub fpu: Flamingos2Fpu,
    #[serde(default)]
    pub explicit_read_mode: Option<Flamingos2ReadMode>,
    #[serde(default)]
    pub explicit_spatial_offsets: Option<Vec<Angle>>,
}

/// Observing mode, one variant per supported instrument mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ObservingMode {
    GmosNorthLongSlit(GmosLongSlitConfig),
    GmosSouthLongSlit(GmosLongSlitConfig),
    GmosNorthImaging(GmosImagingConfig),
    GmosSouthImaging(GmosImagingConfig),
    Flamingos2LongSlit(Flamingos2LongSlitConfig),
}

impl ObservingMode {
    pub fn instrument(&self) -> Instrument {
        match self {
            Self::GmosNorthLongSlit(_) | Self::GmosNorthImaging(_) => Instrument::GmosNorth,
            Self::GmosSouthLongSlit(_) | Self::GmosSouthImaging(_) => Instrument::GmosSouth,
            Self::Flamingos2LongSlit(_) => Instrument::Flamingos2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GmosNorthLongSlit(_) => "gmos_north_long_slit",
            Self::GmosSouthLongSlit(_) => "gmos_south_long_slit",
            Self::GmosNorthImaging(_) => "gmos_north_imaging",
            Self::GmosSouthImaging(_) => "gmos_south_imaging",
            Self::Flamingos2LongSlit(_) => "flamingos2_long_slit",
        }
    }
}

/// Everything the engine needs to generate one observation's sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationInput {
    pub observation_id: ObservationId,
    #[serde(default)]
    pub program_id: Option<String>,
    #[serde(default)]
    pub target: Option<Target>,
    #[serde(default)]
    pub observing_mode: Option<ObservingMode>,
    #[serde(default)]
    pub calibration_role: Option<CalibrationRole>,
    /// Exposure time calculator result for this observation.
    #[serde(default)]
    pub itc: Option<ItcResult>,
    #[serde(default)]
    pub history: ExecutionHistory,
    #[serde(default)]
    pub corrections: Vec<TimeCorrection>,
}

impl ObservationInput {
    pub fn new(observation_id: impl Into<String>) -> Self {
        Self {
            observation_id: ObservationId::new(observation_id),
            program_id: None,
            target: None,
            observing_mode: None,
            calibration_role: None,
            itc: None,
            history: ExecutionHistory::default(),
            corrections: Vec::new(),
        }
    }
}
