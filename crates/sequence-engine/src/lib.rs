//! Sequence Generation Engine Library
//!
//! This crate renders, for one observation, the ordered atoms and steps
//! still needed to complete it, reconciled against what has already been
//! executed at the telescope:
//!
//! - **Specification**: Observing mode plus ITC result into a static plan
//! - **Reconciliation**: Execution history folded into a progress cursor
//! - **Generation**: Next atom and a bounded window of future atoms
//! - **Calibrations**: Arc and flat atoms interleaved with science
//! - **Estimation**: Exact per-step time costs
//! - **Digests**: Categorized time totals and charge invoices
//!
//! ## Architecture
//!
//! Generation is a pure function of the observation input. Nothing is
//! persisted between calls: atom and step identities are derived
//! deterministically from the observation and the plan position, so
//! repeated calls against the same history return the same atoms.
//!
//! ## Modules
//!
//! - [`config`]: Engine limits
//! - [`error`]: Error taxonomy surfaced to callers
//! - [`itc`]: Exposure time calculator collaborator
//! - [`model`]: Observations, history, atoms and steps
//! - [`sequence`]: Generation stages and the [`SequenceEngine`] facade
//!
//! ## Example
//!
//! ```ignore
//! use seqgen_engine::{EngineConfig, ObservationInput, SequenceEngine};
//!
//! let input: ObservationInput = serde_json::from_str(&json)?;
//! let engine = SequenceEngine::new(EngineConfig::default());
//! let config = engine.generate_static(&input, Some(10))?;
//! println!("{:?}", config.science.next_atom);
//! ```

pub mod config;
pub mod error;
pub mod itc;
pub mod model;
pub mod sequence;

pub use config::EngineConfig;
pub use error::{MissingParameter, SequenceError, SequenceResult};
pub use itc::{ExposureTimeCalculator, IntegrationTime, ItcError, ItcRequest, ItcResult, StaticItc};
pub use model::{Atom, ObservationId, ObservationInput, SequenceType, Step};
pub use sequence::{
    CategorizedTime, ExecutionConfig, GeneratedSequence, GeneratorState, ObservationDigest, ProgramDigest,
    SequenceEngine,
};
