//! Sequence specification builder.
//!
//! Turns an observing mode and exposure time result into a [`SequenceSpec`]:
//! the parameterised description of acquisition, science and calibration
//! atoms that the generator expands.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SequenceError, SequenceResult};
use crate::itc::{ExposureTimeCalculator, ItcError, ItcRequest, ItcResult};
use crate::model::{
    Angle, AtomKind, Breakpoint, Flamingos2Dynamic, Flamingos2LongSlitConfig, Flamingos2ReadMode, GmosAmpGain,
    GmosAmpReadMode, GmosBinning, GmosCcdMode, GmosDynamic, GmosFilter, GmosGratingConfig, GmosImagingConfig,
    GmosLongSlitConfig, GmosRoi, Instrument, InstrumentConfig, ObservationId, ObservationInput, ObserveClass,
    ObservingMode, Offset, ProtoAtom, ProtoStep, StepConfig, TimeSpan, Wavelength, WavelengthDither,
};

use super::calibration::{CalibrationRules, ScienceAtom};

const DEFAULT_EXPOSURES_PER_ATOM: u32 = 3;
/// Detector pixels a default wavelength dither must cover.
const DITHER_PIXELS: i64 = 67;
const MIN_DITHER_NM: i64 = 5;
const ACQUISITION_OFFSET_ARCSEC: i64 = 10;
const SLIT_EXPOSURE_FACTOR: i64 = 3;

/// Time needed to acquire the target before the sequence starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupTime {
    pub full: TimeSpan,
    pub reacquisition: TimeSpan,
}

impl SetupTime {
    pub fn minutes(full: i64, reacquisition: i64) -> Self {
        Self {
            full: TimeSpan::from_minutes(full),
            reacquisition: TimeSpan::from_minutes(reacquisition),
        }
    }
}

/// One (wavelength dither, q offset) pair of the long slit adjustment cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    pub dither: WavelengthDither,
    pub offset: Angle,
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}

fn div_ceil(n: usize, d: usize) -> usize {
    if d == 0 {
        0
    } else {
        n.div_ceil(d)
    }
}

/// Collapse an offset list to its minimal repeating cycle.
///
/// Consecutive repeats collapse, including across the wrap-around, then the
/// shortest period is taken: `[10, -10, -10, 10]` becomes `[10, -10]`.
pub fn reduce_offset_cycle(offsets: &[Angle]) -> Vec<Angle> {
    let mut reduced: Vec<Angle> = Vec::with_capacity(offsets.len());
    for offset in offsets {
        if reduced.last() != Some(offset) {
            reduced.push(*offset);
        }
    }
    while reduced.len() > 1 && reduced.first() == reduced.last() {
        reduced.pop();
    }
    let n = reduced.len();
    let period = (1..=n)
        .find(|p| n % p == 0 && (0..n).all(|i| reduced[i] == reduced[i % p]))
        .unwrap_or(n);
    reduced.truncate(period);
    reduced
}

/// Shift the central wavelength of a GMOS configuration.
fn with_dither(template: &InstrumentConfig, dither: WavelengthDither) -> InstrumentConfig {
    let mut config = template.clone();
    if let InstrumentConfig::GmosNorth(g) | InstrumentConfig::GmosSouth(g) = &mut config {
        if let Some(grating) = &mut g.grating {
            grating.wavelength = grating.wavelength.offset_by(dither);
        }
    }
    config
}

/// Long slit science: exposures grouped into atoms cycling through
/// wavelength dithers and spatial offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongSlitSpec {
    pub template: InstrumentConfig,
    pub dithers: Vec<WavelengthDither>,
    /// Reduced q offset cycle.
    pub offsets: Vec<Angle>,
    pub exposure_count: u32,
    pub exposures_per_atom: u32,
    pub observe_class: ObserveClass,
}

impl LongSlitSpec {
    /// Length of the combined dither and offset cycle.
    pub fn adjustment_count(&self) -> usize {
        lcm(self.dithers.len().max(1), self.offsets.len().max(1))
    }

    pub fn adjustment(&self, k: usize) -> Adjustment {
        Adjustment {
            dither: self
                .dithers
                .get(k % self.dithers.len().max(1))
                .copied()
                .unwrap_or(WavelengthDither::ZERO),
            offset: self
                .offsets
                .get(k % self.offsets.len().max(1))
                .copied()
                .unwrap_or(Angle::ZERO),
        }
    }

    /// Q offset of step `i` in an atom at adjustment `k`.
    ///
    /// The atom starts at its adjustment's offset and walks the reduced cycle
    /// in contiguous blocks, so with offsets `[10, -10]` and three exposures
    /// atom 0 runs `[10, 10, -10]` and atom 1 runs `[-10, -10, 10]`.
    pub fn step_offset(&self, k: usize, i: usize) -> Angle {
        let q = self.offsets.len();
        if q == 0 {
            return Angle::ZERO;
        }
        let per_atom = (self.exposures_per_atom as usize).max(1);
        self.offsets[(k + i * q / per_atom) % q]
    }

    pub fn atom_count(&self) -> usize {
        div_ceil(self.exposure_count as usize, self.exposures_per_atom as usize)
    }

    /// Number of runs of consecutive atoms sharing an adjustment.
    pub fn group_count(&self) -> usize {
        match self.atom_count() {
            0 => 0,
            n if self.adjustment_count() == 1 => n.min(1),
            n => n,
        }
    }

    pub fn atoms(&self) -> impl Iterator<Item = ScienceAtom> + '_ {
        let count = self.exposure_count as usize;
        let per_atom = self.exposures_per_atom as usize;
        let cycle = self.adjustment_count();
        (0..self.atom_count()).map(move |j| {
            let group = j % cycle;
            let adjustment = self.adjustment(group);
            let config = with_dither(&self.template, adjustment.dither);
            let steps = (j * per_atom..((j + 1) * per_atom).min(count))
                .map(|n| {
                    ProtoStep::new(
                        config.clone(),
                        StepConfig::science(Offset::along_slit(self.step_offset(group, n - j * per_atom))),
                        self.observe_class,
                    )
                })
                .collect();
            let description = format!("{}, {}″", adjustment.dither, adjustment.offset.format_arcseconds());
            ScienceAtom {
                group,
                calibration_base: config,
                atom: ProtoAtom::new(Some(description), AtomKind::Science, steps),
            }
        })
    }
}

/// Imaging science: per filter, one atom per pass over the offset list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagingSpec {
    pub filters: Vec<(GmosFilter, InstrumentConfig)>,
    pub offsets: Vec<Offset>,
    pub exposure_count: u32,
    pub observe_class: ObserveClass,
}

impl ImagingSpec {
    fn passes(&self) -> usize {
        div_ceil(self.exposure_count as usize, self.offsets.len())
    }

    pub fn atom_count(&self) -> usize {
        self.filters.len() * self.passes()
    }

    pub fn atoms(&self) -> impl Iterator<Item = ScienceAtom> + '_ {
        let count = self.exposure_count as usize;
        let per_pass = self.offsets.len();
        let passes = self.passes();
        self.filters.iter().enumerate().flat_map(move |(index, (filter, config))| {
            (0..passes).map(move |pass| {
                let steps = self
                    .offsets
                    .iter()
                    .take(count - pass * per_pass)
                    .map(|offset| ProtoStep::new(config.clone(), StepConfig::science(*offset), self.observe_class))
                    .collect();
                ScienceAtom {
                    group: index,
                    calibration_base: config.clone(),
                    atom: ProtoAtom::new(Some(filter.to_string()), AtomKind::Science, steps),
                }
            })
        })
    }
}

/// Nod science: every atom is one full pass over an unreduced offset pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodSpec {
    pub template: InstrumentConfig,
    pub offsets: Vec<Angle>,
    pub cycles: u32,
    pub observe_class: ObserveClass,
}

impl NodSpec {
    /// Steps of one nod cycle.
    pub fn cycle(&self) -> Vec<ProtoStep> {
        self.offsets
            .iter()
            .map(|q| {
                ProtoStep::new(
                    self.template.clone(),
                    StepConfig::science(Offset::along_slit(*q)),
                    self.observe_class,
                )
            })
            .collect()
    }

    pub fn atoms(&self) -> impl Iterator<Item = ScienceAtom> + '_ {
        let cycle = self.cycle();
        let description = self
            .offsets
            .iter()
            .map(|q| q.format_arcseconds())
            .collect::<Vec<_>>()
            .join(", ");
        (0..self.cycles as usize).map(move |_| ScienceAtom {
            group: 0,
            calibration_base: self.template.clone(),
            atom: ProtoAtom::new(Some(format!("q {}", description)), AtomKind::Science, cycle.clone()),
        })
    }
}

/// Science part of a specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScienceSpec {
    LongSlit(LongSlitSpec),
    Imaging(ImagingSpec),
    Nod(NodSpec),
}

impl ScienceSpec {
    pub fn atom_count(&self) -> usize {
        match self {
            Self::LongSlit(s) => s.atom_count(),
            Self::Imaging(s) => s.atom_count(),
            Self::Nod(s) => s.cycles as usize,
        }
    }

    /// Science exposures in the whole plan.
    pub fn exposure_count(&self) -> usize {
        match self {
            Self::LongSlit(s) => s.exposure_count as usize,
            Self::Imaging(s) => s.filters.len().saturating_mul(s.exposure_count as usize),
            Self::Nod(s) => (s.cycles as usize).saturating_mul(s.offsets.len()),
        }
    }

    /// Number of calibration groups when arcs and flats are injected.
    pub fn group_count(&self) -> usize {
        match self {
            Self::LongSlit(s) => s.group_count(),
            Self::Imaging(s) => s.filters.len().min(s.atom_count()),
            Self::Nod(s) => (s.cycles as usize).min(1),
        }
    }

    pub fn atoms(&self) -> Box<dyn Iterator<Item = ScienceAtom> + '_> {
        match self {
            Self::LongSlit(s) => Box::new(s.atoms()),
            Self::Imaging(s) => Box::new(s.atoms()),
            Self::Nod(s) => Box::new(s.atoms()),
        }
    }
}

/// Acquisition: a first atom, then the same fine adjustment atom for as long
/// as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionSpec {
    pub initial: Vec<ProtoStep>,
    pub repeat: ProtoStep,
}

impl AcquisitionSpec {
    pub fn initial_atom(&self) -> ProtoAtom {
        ProtoAtom::new(
            Some("Initial Acquisition".to_string()),
            AtomKind::Acquisition,
            self.initial.clone(),
        )
    }

    pub fn repeat_atom(&self) -> ProtoAtom {
        ProtoAtom::new(
            Some("Fine Adjustments".to_string()),
            AtomKind::Acquisition,
            vec![self.repeat.clone()],
        )
    }
}

/// Static description of an observation's sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSpec {
    pub observation_id: ObservationId,
    pub instrument: Instrument,
    pub mode: &'static str,
    pub setup: SetupTime,
    pub rules: CalibrationRules,
    pub acquisition: Option<AcquisitionSpec>,
    pub science: ScienceSpec,
}

impl SequenceSpec {
    /// Atoms needed to realise the whole science plan, calibrations included.
    ///
    /// Every planned exposure can end up in an atom of its own through redo,
    /// so the count is never below the number of science exposures.
    pub fn projected_atom_count(&self) -> usize {
        let calibrations = if self.rules.arcs_and_flats.is_some() {
            self.science.group_count()
        } else {
            0
        };
        self.science
            .atom_count()
            .saturating_add(calibrations)
            .max(self.science.exposure_count())
    }

    /// Minimum repeating cycle, for instruments that must complete one
    /// without interruption.
    pub fn minimum_cycle(&self) -> Option<Vec<ProtoStep>> {
        match &self.science {
            ScienceSpec::Nod(nod) => Some(nod.cycle()),
            _ => None,
        }
    }
}

/// Builds a [`SequenceSpec`] from an observation.
#[derive(Debug, Clone, Default)]
pub struct SpecificationBuilder;

impl SpecificationBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, input: &ObservationInput, itc: &dyn ExposureTimeCalculator) -> SequenceResult<SequenceSpec> {
        let observation_id = &input.observation_id;
        let request = ItcRequest::from_observation(input).map_err(|missing| SequenceError::ConfigurationIncomplete {
            observation_id: observation_id.clone(),
            missing,
        })?;
        let result = itc.calculate(&request).map_err(|e| match e {
            ItcError::MissingParameters(missing) => SequenceError::ConfigurationIncomplete {
                observation_id: observation_id.clone(),
                missing,
            },
            ItcError::Service(message) => SequenceError::ExternalService {
                observation_id: observation_id.clone(),
                message,
            },
        })?;

        let mode = request.observing_mode;
        let role = input.calibration_role;
        debug!(
            observation_id = %observation_id,
            mode = mode.name(),
            exposure_time = %result.science.exposure_time,
            exposure_count = result.science.exposure_count,
            "Building sequence specification"
        );

        let spec = match mode {
            ObservingMode::GmosNorthLongSlit(cfg) => {
                let rules = CalibrationRules::for_long_slit(Instrument::GmosNorth, role);
                self.gmos_long_slit(observation_id, Instrument::GmosNorth, mode.name(), cfg, &result, rules)
            }
            ObservingMode::GmosSouthLongSlit(cfg) => {
                let rules = CalibrationRules::for_long_slit(Instrument::GmosSouth, role);
                self.gmos_long_slit(observation_id, Instrument::GmosSouth, mode.name(), cfg, &result, rules)
            }
            ObservingMode::GmosNorthImaging(cfg) => self.gmos_imaging(
                observation_id,
                Instrument::GmosNorth,
                mode.name(),
                cfg,
                &result,
                CalibrationRules::for_imaging(role),
            ),
            ObservingMode::GmosSouthImaging(cfg) => self.gmos_imaging(
                observation_id,
                Instrument::GmosSouth,
                mode.name(),
                cfg,
                &result,
                CalibrationRules::for_imaging(role),
            ),
            ObservingMode::Flamingos2LongSlit(cfg) => self.flamingos2_long_slit(
                observation_id,
                mode.name(),
                cfg,
                &result,
                CalibrationRules::for_long_slit(Instrument::Flamingos2, role),
            ),
        };
        Ok(spec)
    }

    fn gmos_long_slit(
        &self,
        observation_id: &ObservationId,
        instrument: Instrument,
        mode: &'static str,
        cfg: &GmosLongSlitConfig,
        itc: &ItcResult,
        rules: CalibrationRules,
    ) -> SequenceSpec {
        let readout = GmosCcdMode {
            x_bin: cfg.explicit_x_bin.unwrap_or(GmosBinning::One),
            y_bin: cfg.explicit_y_bin.unwrap_or(GmosBinning::Two),
            amp_gain: cfg.explicit_amp_gain.unwrap_or(GmosAmpGain::Low),
            amp_read_mode: rules
                .read_mode_override
                .or(cfg.explicit_amp_read_mode)
                .unwrap_or(GmosAmpReadMode::Slow),
        };
        let dynamic = GmosDynamic {
            exposure: itc.science.exposure_time,
            readout,
            roi: rules.roi_override.or(cfg.explicit_roi).unwrap_or(GmosRoi::FullFrame),
            grating: Some(GmosGratingConfig {
                grating: cfg.grating,
                wavelength: cfg.central_wavelength,
            }),
            filter: cfg.filter,
            fpu: Some(cfg.fpu),
        };
        let template = gmos_config(instrument, dynamic);

        let dithers = match &cfg.explicit_wavelength_dithers {
            Some(d) if !d.is_empty() => d.clone(),
            _ => {
                let delta = default_dither_nm(cfg.grating.dispersion_pm());
                let delta = WavelengthDither::from_nanometers(delta);
                vec![WavelengthDither::ZERO, delta, delta.negate()]
            }
        };
        let offsets = match &cfg.explicit_spatial_offsets {
            Some(o) if !o.is_empty() => o.clone(),
            _ => vec![Angle::ZERO, Angle::from_arcseconds(15)],
        };
        let exposures_per_atom = cfg
            .explicit_exposures_per_atom
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_EXPOSURES_PER_ATOM);

        let acquisition = rules
            .acquisition
            .then(|| gmos_acquisition(instrument, cfg, itc.acquisition.exposure_time));

        SequenceSpec {
            observation_id: observation_id.clone(),
            instrument,
            mode,
            setup: SetupTime::minutes(16, 5),
            rules,
            acquisition,
            science: ScienceSpec::LongSlit(LongSlitSpec {
                template,
                dithers,
                offsets: reduce_offset_cycle(&offsets),
                exposure_count: itc.science.exposure_count,
                exposures_per_atom,
                observe_class: rules.science_class,
            }),
        }
    }

    fn gmos_imaging(
        &self,
        observation_id: &ObservationId,
        instrument: Instrument,
        mode: &'static str,
        cfg: &GmosImagingConfig,
        itc: &ItcResult,
        rules: CalibrationRules,
    ) -> SequenceSpec {
        let readout = GmosCcdMode {
            x_bin: cfg.explicit_x_bin.unwrap_or(GmosBinning::Two),
            y_bin: cfg.explicit_y_bin.unwrap_or(GmosBinning::Two),
            amp_gain: cfg.explicit_amp_gain.unwrap_or(GmosAmpGain::Low),
            amp_read_mode: cfg.explicit_amp_read_mode.unwrap_or(GmosAmpReadMode::Slow),
        };
        let filters = cfg
            .filters
            .iter()
            .map(|filter| {
                let dynamic = GmosDynamic {
                    exposure: itc.science.exposure_time,
                    readout,
                    roi: cfg.explicit_roi.unwrap_or(GmosRoi::FullFrame),
                    grating: None,
                    filter: Some(*filter),
                    fpu: None,
                };
                (*filter, gmos_config(instrument, dynamic))
            })
            .collect();
        let offsets = match &cfg.explicit_spatial_offsets {
            Some(o) if !o.is_empty() => o.clone(),
            _ => vec![Offset::ZERO],
        };

        SequenceSpec {
            observation_id: observation_id.clone(),
            instrument,
            mode,
            setup: SetupTime::minutes(6, 0),
            rules,
            acquisition: None,
            science: ScienceSpec::Imaging(ImagingSpec {
                filters,
                offsets,
                exposure_count: itc.science.exposure_count,
                observe_class: rules.science_class,
            }),
        }
    }

    fn flamingos2_long_slit(
        &self,
        observation_id: &ObservationId,
        mode: &'static str,
        cfg: &Flamingos2LongSlitConfig,
        itc: &ItcResult,
        rules: CalibrationRules,
    ) -> SequenceSpec {
        let exposure = itc.science.exposure_time;
        let template = InstrumentConfig::Flamingos2(Flamingos2Dynamic {
            exposure,
            disperser: Some(cfg.disperser),
            filter: cfg.filter,
            read_mode: cfg
                .explicit_read_mode
                .unwrap_or_else(|| Flamingos2ReadMode::for_exposure(exposure)),
            fpu: Some(cfg.fpu),
        });
        let offsets = match &cfg.explicit_spatial_offsets {
            Some(o) if !o.is_empty() => o.clone(),
            _ => [15, -15, -15, 15].into_iter().map(Angle::from_arcseconds).collect(),
        };
        let cycles = div_ceil(itc.science.exposure_count as usize, offsets.len()) as u32;

        let acquisition = rules.acquisition.then(|| {
            let acq = itc.acquisition.exposure_time;
            let image = InstrumentConfig::Flamingos2(Flamingos2Dynamic {
                exposure: acq,
                disperser: None,
                filter: cfg.filter,
                read_mode: Flamingos2ReadMode::for_exposure(acq),
                fpu: None,
            });
            let mut slit = image.clone();
            if let InstrumentConfig::Flamingos2(f) = &mut slit {
                f.fpu = Some(cfg.fpu);
            }
            AcquisitionSpec {
                initial: vec![
                    ProtoStep::new(image, StepConfig::science(Offset::ZERO), ObserveClass::Acquisition),
                    ProtoStep::new(slit.clone(), StepConfig::science(Offset::ZERO), ObserveClass::Acquisition)
                        .with_breakpoint(Breakpoint::Enabled),
                ],
                repeat: ProtoStep::new(slit, StepConfig::science(Offset::ZERO), ObserveClass::Acquisition),
            }
        });

        SequenceSpec {
            observation_id: observation_id.clone(),
            instrument: Instrument::Flamingos2,
            mode,
            setup: SetupTime::minutes(15, 10),
            rules,
            acquisition,
            science: ScienceSpec::Nod(NodSpec {
                template,
                offsets,
                cycles,
                observe_class: rules.science_class,
            }),
        }
    }
}

fn gmos_config(instrument: Instrument, dynamic: GmosDynamic) -> InstrumentConfig {
    match instrument {
        Instrument::GmosSouth => InstrumentConfig::GmosSouth(dynamic),
        _ => InstrumentConfig::GmosNorth(dynamic),
    }
}

/// Default dither step in nm: enough to cover the chip gap.
fn default_dither_nm(dispersion_pm: i64) -> i64 {
    let pm = dispersion_pm * DITHER_PIXELS;
    let nm = (pm + 999) / 1000;
    nm.max(MIN_DITHER_NM)
}

/// Broadband filter used to image the field during acquisition.
fn acquisition_filter(wavelength: Wavelength) -> GmosFilter {
    let nm = wavelength.to_picometers() / 1000;
    if nm < 540 {
        GmosFilter::GPrime
    } else if nm < 700 {
        GmosFilter::RPrime
    } else if nm < 850 {
        GmosFilter::IPrime
    } else {
        GmosFilter::ZPrime
    }
}

fn gmos_acquisition(instrument: Instrument, cfg: &GmosLongSlitConfig, exposure: TimeSpan) -> AcquisitionSpec {
    let filter = acquisition_filter(cfg.central_wavelength);
    let image = gmos_config(
        instrument,
        GmosDynamic {
            exposure,
            readout: GmosCcdMode {
                x_bin: GmosBinning::Two,
                y_bin: GmosBinning::Two,
                amp_gain: GmosAmpGain::Low,
                amp_read_mode: GmosAmpReadMode::Fast,
            },
            roi: GmosRoi::Ccd2,
            grating: None,
            filter: Some(filter),
            fpu: None,
        },
    );
    let slit = gmos_config(
        instrument,
        GmosDynamic {
            exposure: exposure.saturating_mul(SLIT_EXPOSURE_FACTOR),
            readout: GmosCcdMode {
                x_bin: GmosBinning::One,
                y_bin: GmosBinning::One,
                amp_gain: GmosAmpGain::Low,
                amp_read_mode: GmosAmpReadMode::Fast,
            },
            roi: GmosRoi::CentralStamp,
            grating: None,
            filter: Some(filter),
            fpu: Some(cfg.fpu),
        },
    );
    let offset_image = Offset::new(Angle::from_arcseconds(ACQUISITION_OFFSET_ARCSEC), Angle::ZERO);
    let slit_step = ProtoStep::new(slit, StepConfig::science(Offset::ZERO), ObserveClass::Acquisition)
        .with_breakpoint(Breakpoint::Enabled);
    AcquisitionSpec {
        initial: vec![
            ProtoStep::new(image.clone(), StepConfig::science(Offset::ZERO), ObserveClass::Acquisition),
            ProtoStep::new(image, StepConfig::science(offset_image), ObserveClass::Acquisition),
            slit_step.clone(),
        ],
        repeat: slit_step,
    }
}
