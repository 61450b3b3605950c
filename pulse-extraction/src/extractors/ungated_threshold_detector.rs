//! Laser pulse detection on ungated traces by thresholding.
//!
//! Every bin at or above the count threshold is marked. Consecutive marked bins form
//! runs, and runs separated by fewer unmarked bins than the tolerance are joined.
//! Runs that are too short to be a laser pulse are dropped, and the remaining runs
//! are accepted only if there is exactly one per laser.
use super::{ExtractionResult, UngatedExtractor, record_failure};
use crate::{ExtractionSettings, settings::valid_number_of_lasers};
use itertools::Itertools;
use ndarray::{Array2, ArrayView1, s};
use pulsed_common::{BinIndex, Count, metrics::failures::FailureKind};
use tracing::warn;

/// Number of columns in the all-zero result returned when the runs are rejected.
pub const SENTINEL_PULSE_LENGTH: usize = 3000;

/// Run length constraints, in bins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunLimits {
    /// Runs with fewer bins than this are dropped.
    pub min_length: usize,
    /// Gaps with fewer unmarked bins than this are bridged.
    pub tolerance: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UngatedThresholdDetector {
    number_of_lasers: Option<usize>,
    count_threshold: Count,
    run_limits: Option<RunLimits>,
}

impl UngatedThresholdDetector {
    pub fn new(
        number_of_lasers: Option<usize>,
        count_threshold: Count,
        run_limits: RunLimits,
    ) -> Self {
        Self {
            number_of_lasers: valid_number_of_lasers(number_of_lasers),
            count_threshold,
            run_limits: Some(run_limits),
        }
    }

    /// The inclusive `(first, last)` bins of each accepted run, in temporal order.
    fn runs(
        &self,
        trace: ArrayView1<'_, Count>,
        run_limits: RunLimits,
    ) -> Vec<(BinIndex, BinIndex)> {
        trace
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count >= self.count_threshold)
            .map(|(bin, _)| (bin, bin))
            .coalesce(|(first, last), (next, _)| {
                let gap = next - last - 1;
                if gap == 0 || gap < run_limits.tolerance {
                    Ok((first, next))
                } else {
                    Err(((first, last), (next, next)))
                }
            })
            .filter(|&(first, last)| last - first + 1 >= run_limits.min_length)
            .collect()
    }

    fn sentinel(&self) -> ExtractionResult {
        let rows = self.number_of_lasers.unwrap_or(1);
        ExtractionResult::zeros((rows, SENTINEL_PULSE_LENGTH), vec![0; rows], vec![0; rows])
    }
}

impl From<&ExtractionSettings> for UngatedThresholdDetector {
    fn from(settings: &ExtractionSettings) -> Self {
        let bins = |seconds| settings.seconds_to_bins(seconds).map(|bins| bins.max(0) as usize);
        let run_limits = bins(settings.min_laser_length)
            .zip(bins(settings.threshold_tolerance))
            .map(|(min_length, tolerance)| RunLimits {
                min_length,
                tolerance,
            });
        Self {
            number_of_lasers: valid_number_of_lasers(settings.number_of_lasers),
            count_threshold: settings.count_threshold,
            run_limits,
        }
    }
}

impl UngatedExtractor for UngatedThresholdDetector {
    #[tracing::instrument(skip_all, fields(bins = trace.len(), runs, num_pulses))]
    fn extract(&self, trace: ArrayView1<'_, Count>) -> ExtractionResult {
        if let Some(number_of_lasers) = self.number_of_lasers
            && number_of_lasers > trace.len()
        {
            warn!(
                "Threshold detection failed: {number_of_lasers} lasers cannot fit in {} bins",
                trace.len()
            );
            record_failure(FailureKind::MissingPrecondition);
            return ExtractionResult::empty();
        }
        let Some(run_limits) = self.run_limits else {
            warn!("Threshold detection requires a valid bin width");
            record_failure(FailureKind::MissingPrecondition);
            return self.sentinel();
        };

        let runs = self.runs(trace, run_limits);
        tracing::Span::current().record("runs", runs.len());

        match self.number_of_lasers {
            Some(number_of_lasers) if number_of_lasers == runs.len() => {}
            Some(number_of_lasers) => {
                warn!(
                    "Threshold detection failed: found {} runs, expected {number_of_lasers}",
                    runs.len()
                );
                record_failure(FailureKind::PulseCountMismatch);
                return self.sentinel();
            }
            None => {
                warn!("Threshold detection requires a positive number of lasers");
                record_failure(FailureKind::MissingPrecondition);
                return self.sentinel();
            }
        }

        let laser_length = runs
            .iter()
            .map(|&(first, last)| last - first + 1)
            .max()
            .unwrap_or_default();

        let mut laser_arr = Array2::zeros((runs.len(), laser_length));
        for (mut row, &(first, last)) in laser_arr.outer_iter_mut().zip(&runs) {
            row.slice_mut(s![..=last - first])
                .assign(&trace.slice(s![first..=last]));
        }

        tracing::Span::current().record("num_pulses", runs.len());
        let (rising, falling) = runs.into_iter().unzip();
        ExtractionResult::new(laser_arr, rising, falling)
    }
}
