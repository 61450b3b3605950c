use super::{ExtractionResult, GatedExtractor, UngatedExtractor};
use ndarray::{ArrayView1, ArrayView2, Axis};
use pulsed_common::{BinIndex, Count};

/// Returns the trace as is, for counters that already deliver one row per laser pulse.
///
/// An ungated trace becomes a single column, with one "pulse" per bin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PassThroughAdapter;

impl GatedExtractor for PassThroughAdapter {
    #[tracing::instrument(skip_all, fields(gates = trace.nrows(), bins = trace.ncols()))]
    fn extract(&self, trace: ArrayView2<'_, Count>) -> ExtractionResult {
        let indices: Vec<BinIndex> = (0..trace.nrows()).collect();
        ExtractionResult::new(trace.to_owned(), indices.clone(), indices)
    }
}

impl UngatedExtractor for PassThroughAdapter {
    #[tracing::instrument(skip_all, fields(bins = trace.len()))]
    fn extract(&self, trace: ArrayView1<'_, Count>) -> ExtractionResult {
        let indices: Vec<BinIndex> = (0..trace.len()).collect();
        ExtractionResult::new(
            trace.insert_axis(Axis(1)).to_owned(),
            indices.clone(),
            indices,
        )
    }
}
