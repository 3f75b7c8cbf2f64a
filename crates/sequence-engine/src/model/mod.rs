//! Data model shared by every stage of sequence generation.

pub mod atom;
pub mod flamingos2;
pub mod gmos;
pub mod history;
pub mod ids;
pub mod observation;
pub mod step;
pub mod units;

pub use atom::{Atom, AtomKind, ProtoAtom, SequenceType, Step};
pub use flamingos2::{Flamingos2Disperser, Flamingos2Dynamic, Flamingos2Filter, Flamingos2Fpu, Flamingos2ReadMode};
pub use gmos::{
    GmosAmpGain, GmosAmpReadMode, GmosBinning, GmosCcdMode, GmosDynamic, GmosFilter, GmosFpu, GmosGrating,
    GmosGratingConfig, GmosRoi,
};
pub use history::{
    AtomRecord, DatasetRecord, ExecutionHistory, ExecutionState, QaState, StepEvent, StepRecord, StepStage,
};
pub use ids::{AtomId, DatasetId, ObservationId, StepId, VisitId};
pub use observation::{
    Band, Brightness, CalibrationRole, Flamingos2LongSlitConfig, GmosImagingConfig, GmosLongSlitConfig,
    ObservationInput, ObservingMode, Target,
};
pub use step::{
    Breakpoint, ChargeClass, GcalConfig, GcalDiffuser, GcalFilter, GcalLamp, GcalShutter, GuideState, Instrument,
    InstrumentConfig, ObserveClass, ProtoStep, StepConfig,
};
pub use units::{Angle, Offset, TimeSpan, Wavelength, WavelengthDither};
