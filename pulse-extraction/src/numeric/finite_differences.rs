use super::Real;

/// Discrete derivative of `data`.
///
/// Interior points use second order central differences, the two end points use
/// first order one-sided differences. The output has the same length as `data`,
/// which must contain at least two samples, otherwise the output is all zero.
pub(crate) fn gradient(data: &[Real]) -> Vec<Real> {
    let (Some(head), Some(tail)) = (data.first_chunk::<2>(), data.last_chunk::<2>()) else {
        return vec![0.0; data.len()];
    };
    let interior = data.windows(3).map(|window| (window[2] - window[0]) / 2.0);
    std::iter::once(head[1] - head[0])
        .chain(interior)
        .chain(std::iter::once(tail[1] - tail[0]))
        .collect()
}
