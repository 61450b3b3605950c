//! Numeric primitives shared by the edge detectors.
//!
//! The detectors locate laser flanks as the extrema of the derivative of a
//! smoothed trace:
//! ```ignore
//!     let conv_deriv = conv_deriv(&trace, conv_std_dev)?;
//!     let rising = argmax(&conv_deriv);
//!     let falling = argmin(&conv_deriv);
//! ```

pub(crate) mod finite_differences;
pub(crate) mod gaussian_filter;

use super::Real;
pub(crate) use finite_differences::gradient;
pub(crate) use gaussian_filter::gaussian_filter1d;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum NumericError {
    #[error("Trace is empty")]
    EmptyTrace,
    #[error("Trace of length {0} is too short to differentiate")]
    TraceTooShort(usize),
    #[error("Invalid smoothing width {0}")]
    InvalidStdDev(Real),
    #[error("Smoothing width {std_dev} exceeds trace length {len}")]
    StdDevExceedsTrace { std_dev: Real, len: usize },
    #[error("Non-finite sample at index {0}")]
    NonFiniteSample(usize),
}

/// Smooths `data` with a gaussian of width `std_dev` and returns the derivative of the result.
///
/// All preconditions of the smoothing and differentiation are checked up front,
/// so a successful return is always a finite derivative of the same length as `data`.
pub(crate) fn conv_deriv(data: &[Real], std_dev: Real) -> Result<Vec<Real>, NumericError> {
    if data.is_empty() {
        return Err(NumericError::EmptyTrace);
    }
    if data.len() < 2 {
        return Err(NumericError::TraceTooShort(data.len()));
    }
    if !std_dev.is_finite() || std_dev <= 0.0 {
        return Err(NumericError::InvalidStdDev(std_dev));
    }
    if std_dev > data.len() as Real {
        return Err(NumericError::StdDevExceedsTrace {
            std_dev,
            len: data.len(),
        });
    }
    if let Some(index) = data.iter().position(|value| !value.is_finite()) {
        return Err(NumericError::NonFiniteSample(index));
    }
    Ok(gradient(&gaussian_filter1d(data, std_dev)))
}

/// Returns true if every value of the derivative is exactly zero, i.e. the trace has no flanks.
pub(crate) fn is_flat(conv_deriv: &[Real]) -> bool {
    conv_deriv.iter().all(|&value| value == 0.0)
}

/// Index of the first occurrence of the maximum value.
pub(crate) fn argmax(data: &[Real]) -> Option<usize> {
    superlative(data, |value, best| value > best)
}

/// Index of the first occurrence of the minimum value.
pub(crate) fn argmin(data: &[Real]) -> Option<usize> {
    superlative(data, |value, best| value < best)
}

fn superlative(data: &[Real], is_better: impl Fn(Real, Real) -> bool) -> Option<usize> {
    data.iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, Real)>, (index, value)| match best {
            Some((_, best_value)) if !is_better(value, best_value) => best,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
}
