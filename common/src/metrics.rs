use metrics::{describe_counter, describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "pulse_extraction_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let git_rev = option_env!("GIT_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "git_version" => git_rev).set(1);
}

/// Registers descriptions for the counters emitted by the extraction engine.
pub fn describe_extraction_metrics() {
    describe_counter!(
        metric_names::EXTRACTIONS,
        metrics::Unit::Count,
        "Number of pulse extractions performed"
    );
    describe_counter!(
        metric_names::FAILURES,
        metrics::Unit::Count,
        "Number of pulse extractions returning a sentinel result"
    );
}

pub mod metric_names {
    pub const EXTRACTIONS: &str = "pulse_extraction_extractions";
    pub const FAILURES: &str = "pulse_extraction_failures";
}

pub mod extractions {
    // Label building function
    pub fn get_label(method: &'static str) -> (&'static str, &'static str) {
        ("method", method)
    }
}

pub mod failures {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        MissingPrecondition,
        NumericalDegeneracy,
        PulseCountMismatch,
        TraceShapeMismatch,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::MissingPrecondition => "missing_precondition",
                FailureKind::NumericalDegeneracy => "numerical_degeneracy",
                FailureKind::PulseCountMismatch => "pulse_count_mismatch",
                FailureKind::TraceShapeMismatch => "trace_shape_mismatch",
            },
        )
    }
}
