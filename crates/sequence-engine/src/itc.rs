//! Exposure time calculator collaborator.
//!
//! The engine never talks to the calculator service itself. Callers supply an
//! implementation of [`ExposureTimeCalculator`]; [`StaticItc`] answers from a
//! result already present in the observation input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::MissingParameter;
use crate::model::{Brightness, CalibrationRole, ObservationInput, ObservingMode};
use crate::model::units::TimeSpan;

/// Exposure time and count for one sequence type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationTime {
    pub exposure_time: TimeSpan,
    pub exposure_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_to_noise: Option<f64>,
}

impl IntegrationTime {
    pub fn new(exposure_time: TimeSpan, exposure_count: u32) -> Self {
        Self {
            exposure_time,
            exposure_count,
            signal_to_noise: None,
        }
    }
}

/// Calculator answer for acquisition and science.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItcResult {
    pub acquisition: IntegrationTime,
    pub science: IntegrationTime,
}

/// Calculator request assembled from an observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ItcRequest<'a> {
    pub target_name: &'a str,
    pub brightness: &'a Brightness,
    pub radial_velocity: f64,
    pub observing_mode: &'a ObservingMode,
    pub calibration_role: Option<CalibrationRole>,
}

impl<'a> ItcRequest<'a> {
    /// Build a request, listing every missing input. Brightness and radial
    /// velocity are only reported when the target itself is present.
    pub fn from_observation(input: &'a ObservationInput) -> Result<Self, Vec<MissingParameter>> {
        let mut missing = Vec::new();
        if input.target.is_none() {
            missing.push(MissingParameter::Target);
        }
        if input.observing_mode.is_none() {
            missing.push(MissingParameter::ObservingMode);
        }
        if let Some(target) = &input.target {
            if target.brightness.is_none() {
                missing.push(MissingParameter::Brightness);
            }
            if target.radial_velocity.is_none() {
                missing.push(MissingParameter::RadialVelocity);
            }
        }

        match (&input.target, &input.observing_mode) {
            (Some(target), Some(mode)) if missing.is_empty() => match (&target.brightness, target.radial_velocity) {
                (Some(brightness), Some(radial_velocity)) => Ok(Self {
                    target_name: &target.name,
                    brightness,
                    radial_velocity,
                    observing_mode: mode,
                    calibration_role: input.calibration_role,
                }),
                _ => Err(missing),
            },
            _ => Err(missing),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItcError {
    #[error("missing parameters: {0:?}")]
    MissingParameters(Vec<MissingParameter>),

    #[error("{0}")]
    Service(String),
}

/// Source of exposure time results.
pub trait ExposureTimeCalculator: Send + Sync {
    fn calculate(&self, request: &ItcRequest<'_>) -> Result<ItcResult, ItcError>;
}

/// Calculator that returns a precomputed result.
#[derive(Debug, Clone, Default)]
pub struct StaticItc {
    result: Option<ItcResult>,
}

impl StaticItc {
    pub fn new(result: Option<ItcResult>) -> Self {
        Self { result }
    }

    pub fn for_observation(input: &ObservationInput) -> Self {
        Self::new(input.itc.clone())
    }
}

impl ExposureTimeCalculator for StaticItc {
    fn calculate(&self, _request: &ItcRequest<'_>) -> Result<ItcResult, ItcError> {
        self.result
            .clone()
            .ok_or_else(|| ItcError::Service("exposure time calculator returned no result".to_string()))
    }
}
