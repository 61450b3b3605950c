use crate::{
    cli_structs::ExtractParameters,
    trace_file::{load_json, load_trace_file, write_json},
};
use anyhow::{Context, Result};
use pulse_extraction::{ExtractionMethod, ExtractionResult, ExtractionSettings, PulseExtractor};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The pulses extracted from one trace file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct ExtractionOutput {
    pub(crate) trace_file: PathBuf,
    pub(crate) method: ExtractionMethod,
    pub(crate) result: ExtractionResult,
}

pub(crate) fn build_extractor(parameters: &ExtractParameters) -> Result<PulseExtractor> {
    let mut settings: ExtractionSettings = match &parameters.settings_file {
        Some(path) => load_json(path)?,
        None => ExtractionSettings::default(),
    };
    parameters.settings.apply(&mut settings);

    let mut extractor = PulseExtractor::new(parameters.gated, settings);
    if let Some(method) = &parameters.method {
        extractor.set_method_by_name(method)?;
    }
    Ok(extractor)
}

#[tracing::instrument(skip_all, fields(trace_file = %path.display()))]
fn extract_file(extractor: &PulseExtractor, path: &Path) -> Result<ExtractionOutput> {
    let trace = load_trace_file(path)?;
    let result = extractor.extract_laser_pulses(trace.view());
    if result.is_degenerate() {
        warn!("No laser pulses could be extracted");
    } else {
        info!(
            "Extracted {} laser pulses of {} bins",
            result.num_pulses(),
            result.pulse_length()
        );
    }
    Ok(ExtractionOutput {
        trace_file: path.to_owned(),
        method: extractor.method(),
        result,
    })
}

pub(crate) fn run(parameters: &ExtractParameters) -> Result<()> {
    let extractor = build_extractor(parameters)?;
    info!(
        "Extracting pulses from {} trace files with {}",
        parameters.trace_files.len(),
        extractor.method()
    );

    let outputs = parameters
        .trace_files
        .par_iter()
        .map(|path| extract_file(&extractor, path))
        .collect::<Result<Vec<_>>>()?;

    write_json(parameters.output.as_deref(), &outputs).context("Cannot write extraction results")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cli_structs::SettingsArgs,
        trace_file::{Counts, TraceFile},
    };
    use pulse_extraction::ExtractorError;

    fn parameters(gated: bool, method: Option<&str>) -> ExtractParameters {
        ExtractParameters {
            trace_files: Vec::new(),
            gated,
            method: method.map(ToOwned::to_owned),
            settings_file: None,
            output: None,
            settings: SettingsArgs {
                number_of_lasers: Some(2),
                conv_std_dev: Some(5.0),
                ..Default::default()
            },
        }
    }

    #[test]
    fn extractor_uses_requested_method() {
        let extractor = build_extractor(&parameters(false, Some("ungated_threshold"))).unwrap();
        assert_eq!(extractor.method(), ExtractionMethod::UngatedThreshold);
        assert_eq!(extractor.settings().number_of_lasers, Some(2));

        let extractor = build_extractor(&parameters(true, None)).unwrap();
        assert_eq!(extractor.method(), ExtractionMethod::GatedConvDeriv);
    }

    #[test]
    fn unavailable_method_is_an_error() {
        let error = build_extractor(&parameters(true, Some("ungated_threshold"))).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ExtractorError>(),
            Some(ExtractorError::MethodUnavailable { .. })
        ));
    }

    #[test]
    fn extract_from_files() {
        let dir = std::env::temp_dir();
        let trace_path = dir.join(format!("extract-pulses-trace-{}.json", std::process::id()));
        let output_path = dir.join(format!("extract-pulses-output-{}.json", std::process::id()));

        let mut counts = vec![0; 1000];
        counts[100..150].fill(500);
        counts[600..650].fill(500);
        let trace_file = TraceFile {
            counts: Counts::Ungated(counts),
        };
        write_json(Some(trace_path.as_path()), &trace_file).unwrap();

        let mut parameters = parameters(false, Some("ungated_threshold"));
        parameters.trace_files = vec![trace_path.clone(), trace_path.clone()];
        parameters.output = Some(output_path.clone());
        parameters.settings.count_threshold = Some(250);
        parameters.settings.min_laser_length = Some(20e-9);
        parameters.settings.threshold_tolerance = Some(0.0);
        run(&parameters).unwrap();

        let output: serde_json::Value = load_json(&output_path).unwrap();
        std::fs::remove_file(&trace_path).unwrap();
        std::fs::remove_file(&output_path).unwrap();

        let outputs = output.as_array().unwrap();
        assert_eq!(outputs.len(), 2);
        for output in outputs {
            assert_eq!(output["method"], "ungated_threshold");
            assert_eq!(output["result"]["laser_indices_rising"], serde_json::json!([100, 600]));
            assert_eq!(output["result"]["laser_indices_falling"], serde_json::json!([149, 649]));
        }
    }

    #[test]
    fn missing_trace_file_is_an_error() {
        let mut parameters = parameters(false, None);
        parameters.trace_files = vec![PathBuf::from("/nonexistent/trace.json")];
        assert!(run(&parameters).is_err());
    }
}
