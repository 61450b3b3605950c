use super::Real;
use pulsed_common::{Count, DEFAULT_BIN_WIDTH};
use serde::{Deserialize, Serialize};

/// Nominal laser timing reported by the pulse generator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SamplingInformation {
    /// Sample clock of the pulse generator, in Hz.
    pub sample_rate: Real,
    /// Rising laser flanks, in generator samples.
    pub laser_rising_bins: Vec<i64>,
    /// Falling laser flanks, in generator samples.
    pub laser_falling_bins: Vec<i64>,
}

/// All parameters an extraction method may need.
///
/// Each method reads only the fields it uses. Times are in seconds and are
/// converted to counter bins using `bin_width`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractionSettings {
    /// Number of laser pulses in the measured sequence.
    pub number_of_lasers: Option<usize>,
    /// Width of a fast counter bin, in seconds.
    pub bin_width: Real,
    /// Standard deviation, in bins, of the gaussian used to smooth the trace.
    pub conv_std_dev: Real,
    /// Number of bins by which detected flanks are widened.
    pub flank_width: usize,
    /// Bins with at least this many counts belong to a laser pulse.
    pub count_threshold: Count,
    /// Shortest run above threshold accepted as a laser pulse.
    pub min_laser_length: Real,
    /// Gaps below threshold shorter than this are bridged.
    pub threshold_tolerance: Real,
    /// Latency between the generator's laser flank and its appearance in the trace.
    pub delay: Real,
    /// Margin added either side of each nominal laser pulse.
    pub safety: Real,
    pub sampling: Option<SamplingInformation>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            number_of_lasers: None,
            bin_width: DEFAULT_BIN_WIDTH,
            conv_std_dev: 20.0,
            flank_width: 0,
            count_threshold: 10,
            min_laser_length: 200e-9,
            threshold_tolerance: 20e-9,
            delay: 0.0,
            safety: 50e-9,
            sampling: None,
        }
    }
}

/// The number of lasers, if it is present and positive.
pub(crate) fn valid_number_of_lasers(number_of_lasers: Option<usize>) -> Option<usize> {
    number_of_lasers.filter(|&n| n > 0)
}

impl ExtractionSettings {
    /// Converts a duration to the nearest whole number of counter bins.
    ///
    /// Returns `None` if the bin width or the duration is unusable, or if the
    /// number of bins does not fit in an `i64`.
    pub fn seconds_to_bins(&self, seconds: Real) -> Option<i64> {
        if !self.bin_width.is_finite() || self.bin_width <= 0.0 || !seconds.is_finite() {
            return None;
        }
        let bins = (seconds / self.bin_width).round();
        (bins.abs() < i64::MAX as Real).then_some(bins as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_of_lasers_must_be_positive() {
        assert_eq!(valid_number_of_lasers(ExtractionSettings::default().number_of_lasers), None);
        assert_eq!(valid_number_of_lasers(Some(0)), None);
        assert_eq!(valid_number_of_lasers(Some(4)), Some(4));
    }

    #[test]
    fn seconds_to_bins() {
        let mut settings = ExtractionSettings {
            bin_width: 0.8e-9,
            ..Default::default()
        };
        assert_eq!(settings.seconds_to_bins(200e-9), Some(250));
        assert_eq!(settings.seconds_to_bins(-4e-9), Some(-5));
        assert_eq!(settings.seconds_to_bins(1e300), None);
        assert_eq!(settings.seconds_to_bins(-1e10), None);
        settings.bin_width = 0.0;
        assert_eq!(settings.seconds_to_bins(200e-9), None);
        settings.bin_width = Real::NAN;
        assert_eq!(settings.seconds_to_bins(200e-9), None);
    }

    #[test]
    fn deserialize_partial_settings() {
        let settings: ExtractionSettings = serde_json::from_str(
            r#"{
                "number-of-lasers": 3,
                "conv-std-dev": 5.0,
                "sampling": {
                    "sample-rate": 1.25e9,
                    "laser-rising-bins": [0, 500],
                    "laser-falling-bins": [100, 600]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.number_of_lasers, Some(3));
        assert_eq!(settings.conv_std_dev, 5.0);
        assert_eq!(settings.bin_width, DEFAULT_BIN_WIDTH);
        assert_eq!(settings.count_threshold, 10);
        let sampling = settings.sampling.unwrap();
        assert_eq!(sampling.laser_rising_bins, vec![0, 500]);
        assert_eq!(sampling.laser_falling_bins, vec![100, 600]);
    }
}
