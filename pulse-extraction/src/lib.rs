//! Extraction of laser pulses from the photon count traces of a fast counter.
//!
//! A pulsed measurement repeatedly switches a laser on and off while a fast
//! counter records photon arrivals into time bins. The methods in this crate
//! locate the laser flanks in such a trace and cut it into one row per laser pulse,
//! ready to be averaged and analysed.
//!
//! Extraction never fails outright. When a method cannot make sense of a trace it
//! returns an empty or all-zero placeholder, detected by
//! [ExtractionResult::is_degenerate], and logs the cause.
//!
//! ```
//! use ndarray::Array1;
//! use pulse_extraction::{ExtractionSettings, PulseExtractor};
//!
//! let mut trace = Array1::<u64>::zeros(1000);
//! trace.slice_mut(ndarray::s![200..600]).fill(40);
//!
//! let settings = ExtractionSettings {
//!     number_of_lasers: Some(1),
//!     ..Default::default()
//! };
//! let extractor = PulseExtractor::new(false, settings);
//! let result = extractor.extract_laser_pulses(trace.view().into());
//! assert_eq!(result.num_pulses(), 1);
//! ```
mod extractor;
pub mod extractors;
pub(crate) mod numeric;
mod result;
mod settings;

pub type Real = f64;

pub use extractor::{CountTrace, CounterMode, ExtractionMethod, ExtractorError, PulseExtractor};
pub use extractors::{
    GatedEdgeDetector, GatedExtractor, PassThroughAdapter, UngatedEdgeDetector, UngatedExtractor,
    UngatedKnownTimingReconstructor, UngatedThresholdDetector,
};
pub use result::ExtractionResult;
pub use settings::{ExtractionSettings, SamplingInformation};
