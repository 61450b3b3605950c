//! Laser pulse extraction on ungated traces from the nominal laser timing.
//!
//! The pulse generator reports where it switched the laser on and off. Those
//! positions are converted to counter bins, shifted by the laser latency and
//! widened by a safety margin, and the resulting windows are stacked into a gated
//! trace. A [GatedEdgeDetector] then aligns the flanks shared by all windows.
use super::{
    ExtractionResult, GatedEdgeDetector, GatedExtractor, UngatedExtractor, record_failure,
};
use crate::{ExtractionSettings, Real, SamplingInformation, settings::valid_number_of_lasers};
use ndarray::{Array2, ArrayView1, s};
use pulsed_common::{BinIndex, Count, metrics::failures::FailureKind};
use tracing::warn;

/// Drops unpaired flanks until there are as many rising as falling flanks.
///
/// A surplus rising flank is removed from the end if it follows the last falling
/// flank, and otherwise from the start. A surplus falling flank is removed from the
/// start if it precedes the first rising flank, and otherwise from the end.
pub fn repair_length_mismatch(rising: &mut Vec<i64>, falling: &mut Vec<i64>) {
    while rising.len() > falling.len() {
        if rising.last() > falling.last() {
            rising.pop();
        } else {
            rising.remove(0);
        }
    }
    while falling.len() > rising.len() {
        if falling.first() < rising.first() {
            falling.remove(0);
        } else {
            falling.pop();
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UngatedKnownTimingReconstructor {
    number_of_lasers: Option<usize>,
    bin_width: Real,
    /// Laser latency in bins, `None` if it cannot be represented.
    delay: Option<i64>,
    /// Safety margin in bins, `None` if it cannot be represented.
    safety: Option<i64>,
    sampling: Option<SamplingInformation>,
    detector: GatedEdgeDetector,
}

impl UngatedKnownTimingReconstructor {
    /// Nominal rising and falling flanks in counter bins, or `None` if the timing is unusable.
    fn nominal_flanks(&self) -> Option<(Vec<i64>, Vec<i64>)> {
        let sampling = self.sampling.as_ref()?;
        let bins_per_sample = sampling.sample_rate * self.bin_width;
        if !bins_per_sample.is_finite() || bins_per_sample <= 0.0 || self.bin_width <= 0.0 {
            return None;
        }
        let to_bins = |samples: &[i64]| -> Vec<i64> {
            samples
                .iter()
                .map(|&sample| (sample as Real / bins_per_sample).round() as i64)
                .collect()
        };
        let mut rising = to_bins(&sampling.laser_rising_bins);
        let mut falling = to_bins(&sampling.laser_falling_bins);
        repair_length_mismatch(&mut rising, &mut falling);
        Some((rising, falling))
    }

    /// Start of each window and the length shared by all windows, in counter bins.
    ///
    /// Returns `None` if a bin position overflows or the windows are longer than the trace.
    fn window_layout(
        &self,
        rising: &[i64],
        falling: &[i64],
        num_bins: i64,
    ) -> Option<(Vec<i64>, i64)> {
        let delay = self.delay?;
        let safety = self.safety?.max(0);
        let max_pulse_length = rising
            .iter()
            .zip(falling)
            .try_fold(0, |max, (&r, &f)| Some(f.checked_sub(r)?.max(max)))?;
        let window_length = safety.checked_mul(2)?.checked_add(max_pulse_length)?;
        if window_length > num_bins {
            return None;
        }
        let window_starts = rising
            .iter()
            .map(|&r| r.checked_add(delay)?.checked_sub(safety))
            .collect::<Option<Vec<_>>>()?;
        Some((window_starts, window_length))
    }
}

impl From<&ExtractionSettings> for UngatedKnownTimingReconstructor {
    fn from(settings: &ExtractionSettings) -> Self {
        Self {
            number_of_lasers: settings.number_of_lasers,
            bin_width: settings.bin_width,
            delay: settings.seconds_to_bins(settings.delay),
            safety: settings.seconds_to_bins(settings.safety),
            sampling: settings.sampling.clone(),
            detector: GatedEdgeDetector::from(settings),
        }
    }
}

impl UngatedExtractor for UngatedKnownTimingReconstructor {
    #[tracing::instrument(skip_all, fields(bins = trace.len(), num_pulses))]
    fn extract(&self, trace: ArrayView1<'_, Count>) -> ExtractionResult {
        let Some((rising, falling)) = self.nominal_flanks() else {
            warn!("Known timing reconstruction requires sampling information and a valid bin width");
            record_failure(FailureKind::MissingPrecondition);
            return ExtractionResult::empty();
        };
        if rising.is_empty() {
            warn!("Known timing reconstruction failed: no laser pulses in sampling information");
            record_failure(FailureKind::MissingPrecondition);
            return ExtractionResult::empty();
        }
        if let Some(number_of_lasers) = valid_number_of_lasers(self.number_of_lasers)
            && number_of_lasers != rising.len()
        {
            warn!(
                "Sampling information has {} laser pulses, expected {number_of_lasers}",
                rising.len()
            );
        }

        let num_bins = trace.len() as i64;
        let Some((window_starts, window_length)) = self.window_layout(&rising, &falling, num_bins)
        else {
            warn!(
                "Known timing reconstruction failed: windows do not fit in a trace of {num_bins} bins"
            );
            record_failure(FailureKind::MissingPrecondition);
            return ExtractionResult::empty();
        };
        let mut windows = Array2::zeros((window_starts.len(), window_length as usize));
        for (mut window, &start) in windows.outer_iter_mut().zip(&window_starts) {
            let lo = start.clamp(0, num_bins);
            let hi = start.saturating_add(window_length).clamp(0, num_bins);
            if lo < hi {
                window
                    .slice_mut(s![(lo - start) as usize..(hi - start) as usize])
                    .assign(&trace.slice(s![lo as usize..hi as usize]));
            }
        }

        let (laser_arr, window_rising, window_falling) =
            self.detector.extract(windows.view()).into_parts();
        let to_trace = |edges: Vec<BinIndex>| -> Vec<BinIndex> {
            edges
                .into_iter()
                .zip(&window_starts)
                .map(|(edge, &start)| {
                    start.saturating_add(edge as i64).clamp(0, num_bins) as BinIndex
                })
                .collect()
        };

        tracing::Span::current().record("num_pulses", laser_arr.nrows());
        ExtractionResult::new(laser_arr, to_trace(window_rising), to_trace(window_falling))
    }
}
