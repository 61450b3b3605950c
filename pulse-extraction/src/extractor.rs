use crate::{
    ExtractionResult, ExtractionSettings,
    extractors::{
        GatedEdgeDetector, GatedExtractor, PassThroughAdapter, UngatedEdgeDetector,
        UngatedExtractor, UngatedKnownTimingReconstructor, UngatedThresholdDetector,
        record_failure,
    },
};
use metrics::counter;
use ndarray::{ArrayView1, ArrayView2};
use pulsed_common::{
    Count,
    metrics::{extractions, failures::FailureKind, metric_names::EXTRACTIONS},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;
use tracing::error;

/// Whether the fast counter restarts at every laser pulse.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum CounterMode {
    Gated,
    Ungated,
}

impl CounterMode {
    pub fn from_is_gated(is_gated: bool) -> Self {
        if is_gated { Self::Gated } else { Self::Ungated }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    GatedConvDeriv,
    GatedPassThrough,
    UngatedConvDeriv,
    UngatedGatedConvDeriv,
    UngatedPassThrough,
    UngatedThreshold,
}

impl ExtractionMethod {
    pub fn counter_mode(&self) -> CounterMode {
        match self {
            Self::GatedConvDeriv | Self::GatedPassThrough => CounterMode::Gated,
            Self::UngatedConvDeriv
            | Self::UngatedGatedConvDeriv
            | Self::UngatedPassThrough
            | Self::UngatedThreshold => CounterMode::Ungated,
        }
    }

    pub fn is_gated(&self) -> bool {
        self.counter_mode() == CounterMode::Gated
    }

    /// The method with the alphabetically first name among those for the counter mode.
    pub fn default_for(counter_mode: CounterMode) -> Self {
        match counter_mode {
            CounterMode::Gated => Self::GatedConvDeriv,
            CounterMode::Ungated => Self::UngatedConvDeriv,
        }
    }
}

/// A raw trace as delivered by the fast counter.
#[derive(Clone, Copy, Debug)]
pub enum CountTrace<'a> {
    /// One row per gate.
    Gated(ArrayView2<'a, Count>),
    Ungated(ArrayView1<'a, Count>),
}

impl CountTrace<'_> {
    pub fn counter_mode(&self) -> CounterMode {
        match self {
            Self::Gated(_) => CounterMode::Gated,
            Self::Ungated(_) => CounterMode::Ungated,
        }
    }
}

impl<'a> From<ArrayView2<'a, Count>> for CountTrace<'a> {
    fn from(trace: ArrayView2<'a, Count>) -> Self {
        Self::Gated(trace)
    }
}

impl<'a> From<ArrayView1<'a, Count>> for CountTrace<'a> {
    fn from(trace: ArrayView1<'a, Count>) -> Self {
        Self::Ungated(trace)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ExtractorError {
    #[error("Unknown extraction method: {0}")]
    UnknownMethod(String),
    #[error("Extraction method {method} is not available for {counter_mode} counters")]
    MethodUnavailable {
        method: ExtractionMethod,
        counter_mode: CounterMode,
    },
}

/// Selects an extraction method and runs it on raw traces.
///
/// The extractor is configured once for the counter mode of the fast counter.
/// Only methods matching that mode can be selected, and traces of the other
/// mode are rejected with an empty result.
#[derive(Clone, Debug)]
pub struct PulseExtractor {
    counter_mode: CounterMode,
    method: ExtractionMethod,
    settings: ExtractionSettings,
}

impl PulseExtractor {
    pub fn new(is_gated: bool, settings: ExtractionSettings) -> Self {
        let counter_mode = CounterMode::from_is_gated(is_gated);
        Self {
            counter_mode,
            method: ExtractionMethod::default_for(counter_mode),
            settings,
        }
    }

    pub fn is_gated(&self) -> bool {
        self.counter_mode == CounterMode::Gated
    }

    /// The methods available for the counter mode, in alphabetical order.
    pub fn extraction_methods(&self) -> Vec<ExtractionMethod> {
        ExtractionMethod::iter()
            .filter(|method| method.counter_mode() == self.counter_mode)
            .collect()
    }

    pub fn method(&self) -> ExtractionMethod {
        self.method
    }

    /// Selects the extraction method, leaving the current one in place on failure.
    pub fn set_method(&mut self, method: ExtractionMethod) -> Result<(), ExtractorError> {
        if method.counter_mode() != self.counter_mode {
            error!(
                "Extraction method {method} is not available for {} counters",
                self.counter_mode
            );
            return Err(ExtractorError::MethodUnavailable {
                method,
                counter_mode: self.counter_mode,
            });
        }
        self.method = method;
        Ok(())
    }

    pub fn set_method_by_name(&mut self, name: &str) -> Result<(), ExtractorError> {
        let method = name.parse::<ExtractionMethod>().map_err(|_| {
            error!("Unknown extraction method: {name}");
            ExtractorError::UnknownMethod(name.to_owned())
        })?;
        self.set_method(method)
    }

    pub fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ExtractionSettings {
        &mut self.settings
    }

    #[tracing::instrument(skip_all, fields(method = %self.method, counter_mode = %trace.counter_mode()))]
    pub fn extract_laser_pulses(&self, trace: CountTrace<'_>) -> ExtractionResult {
        counter!(EXTRACTIONS, &[extractions::get_label(self.method.into())]).increment(1);

        let settings = &self.settings;
        match (self.method, trace) {
            (ExtractionMethod::GatedConvDeriv, CountTrace::Gated(trace)) => {
                GatedEdgeDetector::from(settings).extract(trace)
            }
            (ExtractionMethod::GatedPassThrough, CountTrace::Gated(trace)) => {
                GatedExtractor::extract(&PassThroughAdapter, trace)
            }
            (ExtractionMethod::UngatedConvDeriv, CountTrace::Ungated(trace)) => {
                UngatedEdgeDetector::from(settings).extract(trace)
            }
            (ExtractionMethod::UngatedGatedConvDeriv, CountTrace::Ungated(trace)) => {
                UngatedKnownTimingReconstructor::from(settings).extract(trace)
            }
            (ExtractionMethod::UngatedPassThrough, CountTrace::Ungated(trace)) => {
                UngatedExtractor::extract(&PassThroughAdapter, trace)
            }
            (ExtractionMethod::UngatedThreshold, CountTrace::Ungated(trace)) => {
                UngatedThresholdDetector::from(settings).extract(trace)
            }
            (method, trace) => {
                error!(
                    "Extraction method {method} expects a {} trace, but got a {} trace",
                    method.counter_mode(),
                    trace.counter_mode()
                );
                record_failure(FailureKind::TraceShapeMismatch);
                ExtractionResult::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::test_traces::plateau_trace;
    use ndarray::{Array2, Axis, stack};

    fn ungated_settings() -> ExtractionSettings {
        ExtractionSettings {
            number_of_lasers: Some(2),
            conv_std_dev: 5.0,
            count_threshold: 250,
            min_laser_length: 20e-9,
            threshold_tolerance: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn method_names() {
        assert_eq!(ExtractionMethod::UngatedGatedConvDeriv.to_string(), "ungated_gated_conv_deriv");
        assert_eq!(
            "gated_pass_through".parse::<ExtractionMethod>(),
            Ok(ExtractionMethod::GatedPassThrough)
        );
        assert!("gated_threshold".parse::<ExtractionMethod>().is_err());
        let name: &'static str = ExtractionMethod::UngatedThreshold.into();
        assert_eq!(name, "ungated_threshold");
    }

    #[test]
    fn default_method_is_alphabetically_first() {
        for is_gated in [true, false] {
            let extractor = PulseExtractor::new(is_gated, ExtractionSettings::default());
            let first = extractor
                .extraction_methods()
                .into_iter()
                .min_by_key(|method| method.to_string())
                .unwrap();
            assert_eq!(extractor.method(), first);
            assert_eq!(extractor.method().is_gated(), is_gated);
        }
    }

    #[test]
    fn extraction_methods_match_counter_mode() {
        let gated = PulseExtractor::new(true, ExtractionSettings::default());
        assert_eq!(
            gated.extraction_methods(),
            vec![ExtractionMethod::GatedConvDeriv, ExtractionMethod::GatedPassThrough]
        );

        let ungated = PulseExtractor::new(false, ExtractionSettings::default());
        assert_eq!(
            ungated.extraction_methods(),
            vec![
                ExtractionMethod::UngatedConvDeriv,
                ExtractionMethod::UngatedGatedConvDeriv,
                ExtractionMethod::UngatedPassThrough,
                ExtractionMethod::UngatedThreshold,
            ]
        );
    }

    #[test]
    fn unavailable_method_is_rejected() {
        let mut extractor = PulseExtractor::new(true, ExtractionSettings::default());
        assert_eq!(
            extractor.set_method(ExtractionMethod::UngatedThreshold),
            Err(ExtractorError::MethodUnavailable {
                method: ExtractionMethod::UngatedThreshold,
                counter_mode: CounterMode::Gated,
            })
        );
        assert_eq!(extractor.method(), ExtractionMethod::GatedConvDeriv);

        assert_eq!(
            extractor.set_method_by_name("no_such_method"),
            Err(ExtractorError::UnknownMethod("no_such_method".to_owned()))
        );
        assert_eq!(extractor.method(), ExtractionMethod::GatedConvDeriv);

        extractor.set_method_by_name("gated_pass_through").unwrap();
        assert_eq!(extractor.method(), ExtractionMethod::GatedPassThrough);
    }

    #[test]
    fn mismatched_trace_gives_empty_result() {
        let ungated = plateau_trace(1000, &[(100, 150), (600, 650)], 500);
        let extractor = PulseExtractor::new(true, ExtractionSettings::default());
        let result = extractor.extract_laser_pulses(ungated.view().into());
        assert_eq!(result, ExtractionResult::empty());

        let gated = Array2::<Count>::zeros((4, 100));
        let extractor = PulseExtractor::new(false, ungated_settings());
        let result = extractor.extract_laser_pulses(gated.view().into());
        assert_eq!(result, ExtractionResult::empty());
    }

    #[test]
    fn dispatches_to_the_selected_method() {
        let trace = plateau_trace(1000, &[(100, 150), (600, 650)], 500);
        let mut extractor = PulseExtractor::new(false, ungated_settings());

        let result = extractor.extract_laser_pulses(trace.view().into());
        assert_eq!(result.num_pulses(), 2);
        assert!(!result.is_degenerate());

        extractor.set_method(ExtractionMethod::UngatedThreshold).unwrap();
        let result = extractor.extract_laser_pulses(trace.view().into());
        assert_eq!(result.laser_indices_rising(), &[100, 600]);
        assert_eq!(result.laser_indices_falling(), &[149, 649]);

        extractor.set_method(ExtractionMethod::UngatedPassThrough).unwrap();
        let result = extractor.extract_laser_pulses(trace.view().into());
        assert_eq!(result.laser_counts_arr().dim(), (1000, 1));

        extractor.settings_mut().number_of_lasers = None;
        extractor.set_method(ExtractionMethod::UngatedConvDeriv).unwrap();
        let result = extractor.extract_laser_pulses(trace.view().into());
        assert_eq!(result, ExtractionResult::empty());
    }

    #[test]
    fn gated_dispatch() {
        let gate = plateau_trace(200, &[(60, 120)], 4);
        let trace = stack(Axis(0), &[gate.view(), gate.view(), gate.view()]).unwrap();
        let mut extractor = PulseExtractor::new(
            true,
            ExtractionSettings {
                conv_std_dev: 2.0,
                ..Default::default()
            },
        );

        let result = extractor.extract_laser_pulses(CountTrace::Gated(trace.view()));
        assert_eq!(result.num_pulses(), 3);
        assert!((59..=60).contains(&result.laser_indices_rising()[0]));

        extractor.set_method(ExtractionMethod::GatedPassThrough).unwrap();
        let result = extractor.extract_laser_pulses(CountTrace::Gated(trace.view()));
        assert_eq!(result.laser_counts_arr(), &trace);
    }

    #[test]
    fn repeated_extraction_is_identical() {
        let trace = plateau_trace(1000, &[(100, 150), (600, 650)], 500);
        let extractor = PulseExtractor::new(false, ungated_settings());
        assert_eq!(
            extractor.extract_laser_pulses(trace.view().into()),
            extractor.extract_laser_pulses(trace.view().into())
        );
    }
}
