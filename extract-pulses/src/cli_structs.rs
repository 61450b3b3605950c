use clap::Args;
use pulse_extraction::{ExtractionSettings, Real};
use pulsed_common::Count;
use std::path::PathBuf;

#[derive(Clone, Debug, Args)]
pub(crate) struct ExtractParameters {
    /// JSON trace file to extract pulses from, may be given more than once.
    #[clap(long = "trace-file", required = true)]
    pub(crate) trace_files: Vec<PathBuf>,

    /// The counter restarts at every laser pulse, so each trace has one row per gate.
    #[clap(long)]
    pub(crate) gated: bool,

    /// Extraction method, the default method for the counter mode if left unspecified.
    #[clap(long)]
    pub(crate) method: Option<String>,

    /// JSON file of extraction settings, overridden by any settings given below.
    #[clap(long)]
    pub(crate) settings_file: Option<PathBuf>,

    /// File to write the results to, stdout if left unspecified.
    #[clap(long)]
    pub(crate) output: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) settings: SettingsArgs,
}

/// Extraction settings which override those from the settings file.
#[derive(Clone, Debug, Default, Args)]
pub(crate) struct SettingsArgs {
    /// Number of laser pulses in the measured sequence.
    #[clap(long)]
    pub(crate) number_of_lasers: Option<usize>,

    /// Width of a counter bin, in seconds.
    #[clap(long)]
    pub(crate) bin_width: Option<Real>,

    /// Standard deviation, in bins, of the gaussian used to smooth the trace.
    #[clap(long)]
    pub(crate) conv_std_dev: Option<Real>,

    /// Number of bins by which gated flanks are widened.
    #[clap(long)]
    pub(crate) flank_width: Option<usize>,

    /// Minimum count of a bin belonging to a laser pulse, for threshold detection.
    #[clap(long)]
    pub(crate) count_threshold: Option<Count>,

    /// Shortest accepted laser pulse, in seconds.
    #[clap(long)]
    pub(crate) min_laser_length: Option<Real>,

    /// Longest bridged gap within a laser pulse, in seconds.
    #[clap(long)]
    pub(crate) threshold_tolerance: Option<Real>,

    /// Latency of the laser after its nominal rising flank, in seconds.
    #[clap(long, allow_negative_numbers = true)]
    pub(crate) delay: Option<Real>,

    /// Margin either side of each nominal laser pulse, in seconds.
    #[clap(long)]
    pub(crate) safety: Option<Real>,

    /// Sample rate of the pulse generator, in Hz.
    #[clap(long)]
    pub(crate) sample_rate: Option<Real>,

    /// Nominal rising laser flanks, in pulse generator samples.
    #[clap(long, value_delimiter = ',')]
    pub(crate) laser_rising_bins: Option<Vec<i64>>,

    /// Nominal falling laser flanks, in pulse generator samples.
    #[clap(long, value_delimiter = ',')]
    pub(crate) laser_falling_bins: Option<Vec<i64>>,
}

impl SettingsArgs {
    pub(crate) fn apply(&self, settings: &mut ExtractionSettings) {
        if let Some(number_of_lasers) = self.number_of_lasers {
            settings.number_of_lasers = Some(number_of_lasers);
        }
        if let Some(bin_width) = self.bin_width {
            settings.bin_width = bin_width;
        }
        if let Some(conv_std_dev) = self.conv_std_dev {
            settings.conv_std_dev = conv_std_dev;
        }
        if let Some(flank_width) = self.flank_width {
            settings.flank_width = flank_width;
        }
        if let Some(count_threshold) = self.count_threshold {
            settings.count_threshold = count_threshold;
        }
        if let Some(min_laser_length) = self.min_laser_length {
            settings.min_laser_length = min_laser_length;
        }
        if let Some(threshold_tolerance) = self.threshold_tolerance {
            settings.threshold_tolerance = threshold_tolerance;
        }
        if let Some(delay) = self.delay {
            settings.delay = delay;
        }
        if let Some(safety) = self.safety {
            settings.safety = safety;
        }

        if self.sample_rate.is_none()
            && self.laser_rising_bins.is_none()
            && self.laser_falling_bins.is_none()
        {
            return;
        }
        let sampling = settings.sampling.get_or_insert_with(Default::default);
        if let Some(sample_rate) = self.sample_rate {
            sampling.sample_rate = sample_rate;
        }
        if let Some(laser_rising_bins) = &self.laser_rising_bins {
            sampling.laser_rising_bins.clone_from(laser_rising_bins);
        }
        if let Some(laser_falling_bins) = &self.laser_falling_bins {
            sampling.laser_falling_bins.clone_from(laser_falling_bins);
        }
    }
}

#[derive(Clone, Debug, Args)]
pub(crate) struct SimulateParameters {
    /// File to write the trace to, stdout if left unspecified.
    #[clap(long)]
    pub(crate) output: Option<PathBuf>,

    /// Number of gates, an ungated trace is written if left unspecified.
    #[clap(long)]
    pub(crate) gates: Option<usize>,

    /// Number of bins in the trace, or in each gate.
    #[clap(long, default_value = "3000")]
    pub(crate) bins: usize,

    /// First bin of each laser pulse.
    #[clap(long, value_delimiter = ',', default_value = "500,1500,2500")]
    pub(crate) pulse_starts: Vec<usize>,

    /// Length of each laser pulse, in bins.
    #[clap(long, default_value = "300")]
    pub(crate) pulse_length: usize,

    /// Mean count of a bin outside the laser pulses.
    #[clap(long, default_value = "2.0")]
    pub(crate) background_rate: f64,

    /// Mean count of a bin within a laser pulse.
    #[clap(long, default_value = "40.0")]
    pub(crate) signal_rate: f64,

    /// Seed of the random number generator, a random seed is used if left unspecified.
    #[clap(long)]
    pub(crate) seed: Option<u64>,
}
