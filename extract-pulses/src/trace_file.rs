use anyhow::{Context, Result, bail};
use ndarray::{Array1, Array2};
use pulse_extraction::CountTrace;
use pulsed_common::Count;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Contents of a JSON trace file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct TraceFile {
    pub(crate) counts: Counts,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum Counts {
    Ungated(Vec<Count>),
    Gated(Vec<Vec<Count>>),
}

/// A trace loaded into an array the extractor can view.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum OwnedTrace {
    Gated(Array2<Count>),
    Ungated(Array1<Count>),
}

impl OwnedTrace {
    pub(crate) fn view(&self) -> CountTrace<'_> {
        match self {
            Self::Gated(trace) => CountTrace::Gated(trace.view()),
            Self::Ungated(trace) => CountTrace::Ungated(trace.view()),
        }
    }
}

impl TryFrom<Counts> for OwnedTrace {
    type Error = anyhow::Error;

    fn try_from(counts: Counts) -> Result<Self> {
        match counts {
            Counts::Ungated(counts) => Ok(Self::Ungated(Array1::from_vec(counts))),
            Counts::Gated(gates) => {
                let num_bins = gates.first().map(Vec::len).unwrap_or_default();
                if let Some(gate) = gates.iter().position(|gate| gate.len() != num_bins) {
                    bail!("Gate {gate} does not have the {num_bins} bins of the first gate");
                }
                let num_gates = gates.len();
                Ok(Self::Gated(Array2::from_shape_vec(
                    (num_gates, num_bins),
                    gates.concat(),
                )?))
            }
        }
    }
}

impl From<&OwnedTrace> for Counts {
    fn from(trace: &OwnedTrace) -> Self {
        match trace {
            OwnedTrace::Gated(trace) => {
                Counts::Gated(trace.outer_iter().map(|gate| gate.to_vec()).collect())
            }
            OwnedTrace::Ungated(trace) => Counts::Ungated(trace.to_vec()),
        }
    }
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Cannot parse {}", path.display()))
}

pub(crate) fn load_trace_file(path: &Path) -> Result<OwnedTrace> {
    let trace_file: TraceFile = load_json(path)?;
    OwnedTrace::try_from(trace_file.counts)
        .with_context(|| format!("Invalid trace in {}", path.display()))
}

/// Writes `value` as JSON to the file at `path`, or to stdout if there is no path.
pub(crate) fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    match path {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, value)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn ungated_trace_file() {
        let trace_file: TraceFile = serde_json::from_str(r#"{"counts": [0, 3, 5, 2]}"#).unwrap();
        assert_eq!(trace_file.counts, Counts::Ungated(vec![0, 3, 5, 2]));
        assert_eq!(
            OwnedTrace::try_from(trace_file.counts).unwrap(),
            OwnedTrace::Ungated(array![0, 3, 5, 2])
        );
    }

    #[test]
    fn gated_trace_file() {
        let trace_file: TraceFile =
            serde_json::from_str(r#"{"counts": [[0, 3, 5], [1, 4, 6]]}"#).unwrap();
        let trace = OwnedTrace::try_from(trace_file.counts).unwrap();
        assert_eq!(trace, OwnedTrace::Gated(array![[0, 3, 5], [1, 4, 6]]));
        assert!(matches!(trace.view(), CountTrace::Gated(view) if view.dim() == (2, 3)));
    }

    #[test]
    fn ragged_gates_are_rejected() {
        // The total number of bins matches a rectangular trace, but the gates differ
        let counts = Counts::Gated(vec![vec![1, 2], vec![3], vec![4, 5, 6]]);
        assert!(OwnedTrace::try_from(counts).is_err());
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(serde_json::from_str::<TraceFile>(r#"{"counts": [1, -2, 3]}"#).is_err());
    }

    #[test]
    fn write_then_load() {
        let path = std::env::temp_dir().join(format!("extract-pulses-{}.json", std::process::id()));
        let trace = OwnedTrace::Gated(array![[1, 2], [3, 4]]);
        let trace_file = TraceFile {
            counts: Counts::from(&trace),
        };
        write_json(Some(path.as_path()), &trace_file).unwrap();
        let loaded = load_trace_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, trace);
    }
}
