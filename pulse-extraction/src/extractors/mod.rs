pub mod gated_edge_detector;
pub mod known_timing_reconstructor;
pub mod pass_through;
pub mod ungated_edge_detector;
pub mod ungated_threshold_detector;

use super::ExtractionResult;
use metrics::counter;
use ndarray::{ArrayView1, ArrayView2};
use pulsed_common::{
    Count,
    metrics::{
        failures::{self, FailureKind},
        metric_names::FAILURES,
    },
};

pub use gated_edge_detector::GatedEdgeDetector;
pub use known_timing_reconstructor::UngatedKnownTimingReconstructor;
pub use pass_through::PassThroughAdapter;
pub use ungated_edge_detector::UngatedEdgeDetector;
pub use ungated_threshold_detector::UngatedThresholdDetector;

/// Extracts laser pulses from a gated trace, one row per gate.
pub trait GatedExtractor {
    fn extract(&self, trace: ArrayView2<'_, Count>) -> ExtractionResult;
}

/// Extracts laser pulses from a single continuous trace.
pub trait UngatedExtractor {
    fn extract(&self, trace: ArrayView1<'_, Count>) -> ExtractionResult;
}

pub(crate) fn record_failure(failure_kind: FailureKind) {
    counter!(FAILURES, &[failures::get_label(failure_kind)]).increment(1);
}
