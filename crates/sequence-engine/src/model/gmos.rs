//! GMOS (North and South) instrument configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::units::{TimeSpan, Wavelength};

/// Disperser installed in the GMOS grating turret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GmosGrating {
    B1200,
    R831,
    B600,
    R600,
    B480,
    R400,
    R150,
}

impl GmosGrating {
    /// Dispersion in picometers per unbinned detector pixel.
    pub fn dispersion_pm(self) -> i64 {
        match self {
            Self::B1200 => 26,
            Self::R831 => 38,
            Self::B600 => 50,
            Self::R600 => 52,
            Self::B480 => 62,
            Self::R400 => 74,
            Self::R150 => 193,
        }
    }
}

impl fmt::Display for GmosGrating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::B1200 => "B1200",
            Self::R831 => "R831",
            Self::B600 => "B600",
            Self::R600 => "R600",
            Self::B480 => "B480",
            Self::R400 => "R400",
            Self::R150 => "R150",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GmosFilter {
    GPrime,
    RPrime,
    IPrime,
    ZPrime,
    Gg455,
    Og515,
    Rg610,
}

impl fmt::Display for GmosFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GPrime => "g'",
            Self::RPrime => "r'",
            Self::IPrime => "i'",
            Self::ZPrime => "z'",
            Self::Gg455 => "GG455",
            Self::Og515 => "OG515",
            Self::Rg610 => "RG610",
        };
        f.write_str(name)
    }
}

/// Focal plane unit: builtin long slits by width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GmosFpu {
    LongSlit0_25,
    LongSlit0_50,
    LongSlit0_75,
    LongSlit1_00,
    LongSlit1_50,
    LongSlit2_00,
    LongSlit5_00,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GmosBinning {
    #[serde(rename = "one")]
    One,
    #[serde(rename = "two")]
    Two,
    #[serde(rename = "four")]
    Four,
}

impl GmosBinning {
    pub fn count(self) -> i64 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GmosAmpGain {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GmosAmpReadMode {
    #[default]
    Slow,
    Fast,
}

/// Detector region of interest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GmosRoi {
    #[default]
    FullFrame,
    Ccd2,
    CentralSpectrum,
    CentralStamp,
}

impl GmosRoi {
    /// Fraction of the full-frame pixel count read out, as (numerator, denominator).
    pub fn pixel_fraction(self) -> (i64, i64) {
        match self {
            Self::FullFrame => (1, 1),
            Self::Ccd2 => (1, 3),
            Self::CentralSpectrum => (1, 4),
            Self::CentralStamp => (1, 36),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GmosCcdMode {
    pub x_bin: GmosBinning,
    pub y_bin: GmosBinning,
    pub amp_gain: GmosAmpGain,
    pub amp_read_mode: GmosAmpReadMode,
}

impl GmosCcdMode {
    pub fn binned(x_bin: GmosBinning, y_bin: GmosBinning) -> Self {
        Self {
            x_bin,
            y_bin,
            amp_gain: GmosAmpGain::Low,
            amp_read_mode: GmosAmpReadMode::Slow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GmosGratingConfig {
    pub grating: GmosGrating,
    pub wavelength: Wavelength,
}

/// Per-step GMOS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GmosDynamic {
    pub exposure: TimeSpan,
    pub readout: GmosCcdMode,
    #[serde(default)]
    pub roi: GmosRoi,
    #[serde(default)]
    pub grating: Option<GmosGratingConfig>,
    #[serde(default)]
    pub filter: Option<GmosFilter>,
    #[serde(default)]
    pub fpu: Option<GmosFpu>,
}
