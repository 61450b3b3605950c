use super::Real;

/// The kernel is truncated at this many standard deviations.
const TRUNCATE: Real = 4.0;

fn gaussian_kernel(std_dev: Real) -> Vec<Real> {
    let radius = (TRUNCATE * std_dev + 0.5) as isize;
    let weights: Vec<Real> = (-radius..=radius)
        .map(|x| (-0.5 * (x as Real / std_dev).powi(2)).exp())
        .collect();
    let sum: Real = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Maps an out of bounds index back into `0..len` by half-sample reflection
/// (`d c b a | a b c d | d c b a`), repeating for indices more than one length away.
fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let index = index.rem_euclid(period);
    if index < len {
        index as usize
    } else {
        (period - 1 - index) as usize
    }
}

/// Convolves `data` with a normalised gaussian kernel of the given standard deviation.
///
/// The caller guarantees `data` is non-empty and `std_dev` is finite and positive.
pub(crate) fn gaussian_filter1d(data: &[Real], std_dev: Real) -> Vec<Real> {
    let kernel = gaussian_kernel(std_dev);
    let radius = (kernel.len() / 2) as isize;
    (0..data.len() as isize)
        .map(|centre| {
            kernel
                .iter()
                .zip(centre - radius..)
                .map(|(weight, index)| weight * data[reflect(index, data.len())])
                .sum()
        })
        .collect()
}
