//! Flamingos 2 instrument configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::units::TimeSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flamingos2Disperser {
    R1200Jh,
    R1200Hk,
    R3000,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flamingos2Filter {
    Y,
    J,
    H,
    Jh,
    Hk,
    KShort,
}

impl fmt::Display for Flamingos2Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Y => "Y",
            Self::J => "J",
            Self::H => "H",
            Self::Jh => "JH",
            Self::Hk => "HK",
            Self::KShort => "K-short",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flamingos2Fpu {
    LongSlit1,
    LongSlit2,
    LongSlit3,
    LongSlit4,
    LongSlit6,
    LongSlit8,
}

/// Detector read mode, chosen by exposure time unless overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flamingos2ReadMode {
    Bright,
    Medium,
    Faint,
}

impl Flamingos2ReadMode {
    /// Read mode suited to an exposure time.
    pub fn for_exposure(exposure: TimeSpan) -> Self {
        if exposure > TimeSpan::from_seconds(85) {
            Self::Faint
        } else if exposure > TimeSpan::from_seconds(21) {
            Self::Medium
        } else {
            Self::Bright
        }
    }
}

/// Per-step Flamingos 2 configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flamingos2Dynamic {
    pub exposure: TimeSpan,
    #[serde(default)]
    pub disperser: Option<Flamingos2Disperser>,
    pub filter: Flamingos2Filter,
    pub read_mode: Flamingos2ReadMode,
    #[serde(default)]
    pub fpu: Option<Flamingos2Fpu>,
}
