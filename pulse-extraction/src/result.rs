use super::Real;
use ndarray::{Array1, Array2, Axis};
use pulsed_common::{BinIndex, Count};
use serde::{Serialize, Serializer, ser::SerializeStruct};

/// The laser pulses extracted from a single trace.
///
/// Row `i` of the counts array holds pulse `i`, starting at its rising flank and
/// zero-padded on the right to the length of the longest pulse. A failed extraction
/// is reported through a documented placeholder, either empty or all zero, which
/// [ExtractionResult::is_degenerate] detects.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionResult {
    laser_counts_arr: Array2<Count>,
    laser_indices_rising: Vec<BinIndex>,
    laser_indices_falling: Vec<BinIndex>,
}

impl ExtractionResult {
    pub(crate) fn new(
        laser_counts_arr: Array2<Count>,
        laser_indices_rising: Vec<BinIndex>,
        laser_indices_falling: Vec<BinIndex>,
    ) -> Self {
        Self {
            laser_counts_arr,
            laser_indices_rising,
            laser_indices_falling,
        }
    }

    /// Result with no pulses and no flanks.
    pub(crate) fn empty() -> Self {
        Self::new(Array2::zeros((0, 0)), Vec::new(), Vec::new())
    }

    /// All-zero counts of the given shape, keeping the given flanks.
    pub(crate) fn zeros(
        shape: (usize, usize),
        laser_indices_rising: Vec<BinIndex>,
        laser_indices_falling: Vec<BinIndex>,
    ) -> Self {
        Self::new(
            Array2::zeros(shape),
            laser_indices_rising,
            laser_indices_falling,
        )
    }

    pub fn laser_counts_arr(&self) -> &Array2<Count> {
        &self.laser_counts_arr
    }

    pub fn laser_indices_rising(&self) -> &[BinIndex] {
        &self.laser_indices_rising
    }

    pub fn laser_indices_falling(&self) -> &[BinIndex] {
        &self.laser_indices_falling
    }

    pub fn num_pulses(&self) -> usize {
        self.laser_counts_arr.nrows()
    }

    pub fn pulse_length(&self) -> usize {
        self.laser_counts_arr.ncols()
    }

    /// True if the result is a placeholder for a failed extraction.
    pub fn is_degenerate(&self) -> bool {
        self.laser_counts_arr.is_empty() || self.laser_counts_arr.iter().all(|&count| count == 0)
    }

    /// The average pulse, or `None` if there are no pulses.
    pub fn mean_pulse(&self) -> Option<Array1<Real>> {
        self.laser_counts_arr
            .mapv(|count| count as Real)
            .mean_axis(Axis(0))
    }

    pub fn into_parts(self) -> (Array2<Count>, Vec<BinIndex>, Vec<BinIndex>) {
        (
            self.laser_counts_arr,
            self.laser_indices_rising,
            self.laser_indices_falling,
        )
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Vec<Count>> = self
            .laser_counts_arr
            .outer_iter()
            .map(|row| row.to_vec())
            .collect();
        let mut state = serializer.serialize_struct("ExtractionResult", 3)?;
        state.serialize_field("laser_counts_arr", &rows)?;
        state.serialize_field("laser_indices_rising", &self.laser_indices_rising)?;
        state.serialize_field("laser_indices_falling", &self.laser_indices_falling)?;
        state.end()
    }
}
