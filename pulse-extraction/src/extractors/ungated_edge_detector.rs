//! Flank detection on ungated traces.
//!
//! The trace is smoothed twice. A wide gaussian (the configured `conv_std_dev`)
//! suppresses shot noise well enough to rank flanks globally, but it displaces the
//! inflection points, so each coarse flank is refined against the derivative of a
//! trace smoothed with a narrow, fixed gaussian.
//!
//! Flanks are found globally rather than pulse by pulse: the strongest remaining
//! rise and fall are picked from the wide derivative, and their neighbourhood of
//! `2 * conv_std_dev` bins either side is zeroed so they cannot be picked again.
//! This is repeated once per expected laser pulse.
//!
//! Steep laser flanks make detection reliable. As a rule of thumb `conv_std_dev`
//! should be less than a tenth of the laser length.
use super::{ExtractionResult, UngatedExtractor, record_failure};
use crate::{
    ExtractionSettings, Real,
    numeric::{argmax, argmin, conv_deriv, is_flat},
    settings::valid_number_of_lasers,
};
use ndarray::{Array2, ArrayView1, s};
use pulsed_common::{BinIndex, Count, metrics::failures::FailureKind};
use tracing::{debug, warn};

/// Standard deviation, in bins, of the narrow gaussian used to place flanks precisely.
pub const REFERENCE_STD_DEV: Real = 10.0;

/// Number of columns in the all-zero result returned when no flanks can be found.
pub const FALLBACK_PULSE_LENGTH: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Flank {
    Rising,
    Falling,
}

impl Flank {
    fn locate(&self, data: &[Real]) -> Option<usize> {
        match self {
            Flank::Rising => argmax(data),
            Flank::Falling => argmin(data),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UngatedEdgeDetector {
    number_of_lasers: Option<usize>,
    conv_std_dev: Real,
}

impl UngatedEdgeDetector {
    pub fn new(number_of_lasers: Option<usize>, conv_std_dev: Real) -> Self {
        Self {
            number_of_lasers: valid_number_of_lasers(number_of_lasers),
            conv_std_dev,
        }
    }

    /// Finds the next flank of the given kind, and removes it from `working` so it is not found again.
    fn next_flank(
        &self,
        flank: Flank,
        working: &mut [Real],
        reference: Option<&[Real]>,
    ) -> BinIndex {
        let len = working.len();
        let coarse = flank.locate(working).unwrap_or_default();

        let refined = match reference {
            Some(reference) => {
                let start = (coarse as Real - self.conv_std_dev).max(0.0) as usize;
                let stop = ((coarse as Real + self.conv_std_dev) as usize)
                    .min(len)
                    .max(start + 1);
                start + reference
                    .get(start..stop)
                    .and_then(|window| flank.locate(window))
                    .unwrap_or_default()
            }
            None => coarse,
        };

        let suppression = (2.0 * self.conv_std_dev) as usize;
        let suppress_start = coarse.saturating_sub(suppression);
        let suppress_stop = coarse.saturating_add(suppression).max(coarse + 1).min(len);
        if let Some(neighbourhood) = working.get_mut(suppress_start..suppress_stop) {
            neighbourhood.fill(0.0);
        }
        refined
    }

    fn fallback(
        &self,
        number_of_lasers: usize,
        rising: Vec<BinIndex>,
        falling: Vec<BinIndex>,
    ) -> ExtractionResult {
        record_failure(FailureKind::NumericalDegeneracy);
        ExtractionResult::zeros(
            (number_of_lasers, FALLBACK_PULSE_LENGTH),
            rising,
            falling,
        )
    }
}

impl From<&ExtractionSettings> for UngatedEdgeDetector {
    fn from(settings: &ExtractionSettings) -> Self {
        Self::new(settings.number_of_lasers, settings.conv_std_dev)
    }
}

impl UngatedExtractor for UngatedEdgeDetector {
    #[tracing::instrument(skip_all, fields(bins = trace.len(), num_pulses))]
    fn extract(&self, trace: ArrayView1<'_, Count>) -> ExtractionResult {
        let Some(number_of_lasers) = self.number_of_lasers else {
            warn!("Ungated flank detection requires a positive number of lasers");
            record_failure(FailureKind::MissingPrecondition);
            return ExtractionResult::empty();
        };
        if number_of_lasers > trace.len() {
            warn!(
                "Ungated flank detection failed: {number_of_lasers} lasers cannot fit in {} bins",
                trace.len()
            );
            record_failure(FailureKind::MissingPrecondition);
            return ExtractionResult::empty();
        }

        let counts: Vec<Real> = trace.iter().map(|&count| count as Real).collect();

        let mut working = match conv_deriv(&counts, self.conv_std_dev) {
            Ok(conv_deriv) if !is_flat(&conv_deriv) => conv_deriv,
            Ok(_) => {
                warn!("Ungated flank detection failed: no flanks in trace");
                return self.fallback(number_of_lasers, Vec::new(), Vec::new());
            }
            Err(e) => {
                warn!("Ungated flank detection failed: {e}");
                return self.fallback(number_of_lasers, Vec::new(), Vec::new());
            }
        };

        let reference = conv_deriv(&counts, REFERENCE_STD_DEV)
            .inspect_err(|e| debug!("Flanks will not be refined: {e}"))
            .ok();

        let mut rising = Vec::with_capacity(number_of_lasers);
        let mut falling = Vec::with_capacity(number_of_lasers);
        for _ in 0..number_of_lasers {
            rising.push(self.next_flank(Flank::Rising, &mut working, reference.as_deref()));
            falling.push(self.next_flank(Flank::Falling, &mut working, reference.as_deref()));
        }

        // Flanks are paired by their order in the trace, not by proximity.
        rising.sort_unstable();
        falling.sort_unstable();

        let laser_length = rising
            .iter()
            .zip(&falling)
            .map(|(&r, &f)| f as i64 - r as i64)
            .max()
            .unwrap_or_default();
        if laser_length <= 0 {
            warn!("Ungated flank detection failed: no falling flank follows its rising flank");
            return self.fallback(number_of_lasers, rising, falling);
        }
        let laser_length = laser_length as usize;

        let mut laser_arr = Array2::zeros((number_of_lasers, laser_length));
        for (mut row, &start) in laser_arr.outer_iter_mut().zip(&rising) {
            let end = (start + laser_length).min(trace.len());
            row.slice_mut(s![..end - start])
                .assign(&trace.slice(s![start..end]));
        }

        tracing::Span::current().record("num_pulses", number_of_lasers);
        ExtractionResult::new(laser_arr, rising, falling)
    }
}
