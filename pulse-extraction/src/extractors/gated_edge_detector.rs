//! Flank detection on gated traces.
//!
//! All gates share the same laser timing, so they are summed into one composite
//! trace before smoothing. The steepest rise and sharpest fall of the smoothed
//! composite give one pair of flanks which is used to slice every gate.
use super::{ExtractionResult, GatedExtractor, record_failure};
use crate::{
    ExtractionSettings, Real,
    numeric::{argmax, argmin, conv_deriv, is_flat},
};
use ndarray::{ArrayView2, Axis, s};
use pulsed_common::{Count, metrics::failures::FailureKind};
use tracing::warn;

#[derive(Clone, Debug, PartialEq)]
pub struct GatedEdgeDetector {
    conv_std_dev: Real,
    flank_width: usize,
}

impl GatedEdgeDetector {
    pub fn new(conv_std_dev: Real, flank_width: usize) -> Self {
        Self {
            conv_std_dev,
            flank_width,
        }
    }
}

impl From<&ExtractionSettings> for GatedEdgeDetector {
    fn from(settings: &ExtractionSettings) -> Self {
        Self::new(settings.conv_std_dev, settings.flank_width)
    }
}

impl GatedExtractor for GatedEdgeDetector {
    #[tracing::instrument(skip_all, fields(gates = trace.nrows(), bins = trace.ncols(), rising, falling))]
    fn extract(&self, trace: ArrayView2<'_, Count>) -> ExtractionResult {
        let (num_gates, num_bins) = trace.dim();

        let timetrace_sum: Vec<Real> = trace
            .sum_axis(Axis(0))
            .iter()
            .map(|&count| count as Real)
            .collect();

        let conv_deriv = match conv_deriv(&timetrace_sum, self.conv_std_dev) {
            Ok(conv_deriv) => conv_deriv,
            Err(e) => {
                warn!("Gated flank detection failed: {e}");
                record_failure(FailureKind::NumericalDegeneracy);
                return ExtractionResult::zeros(
                    (num_gates, num_bins),
                    vec![0; num_gates],
                    vec![0; num_gates],
                );
            }
        };

        let rising = argmax(&conv_deriv)
            .unwrap_or_default()
            .saturating_sub(self.flank_width)
            .min(num_bins);
        let falling = argmin(&conv_deriv)
            .unwrap_or_default()
            .saturating_add(self.flank_width)
            .min(num_bins);
        let (rising, falling) = if rising <= falling {
            (rising, falling)
        } else {
            (falling, rising)
        };
        tracing::Span::current()
            .record("rising", rising)
            .record("falling", falling);

        if is_flat(&conv_deriv) {
            warn!("Gated flank detection failed: no flanks in trace");
            record_failure(FailureKind::NumericalDegeneracy);
            return ExtractionResult::zeros(
                (num_gates, num_bins),
                vec![rising; num_gates],
                vec![falling; num_gates],
            );
        }

        ExtractionResult::new(
            trace.slice(s![.., rising..falling]).to_owned(),
            vec![rising; num_gates],
            vec![falling; num_gates],
        )
    }
}
