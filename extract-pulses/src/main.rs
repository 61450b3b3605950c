mod cli_structs;
mod extract;
mod simulate;
mod trace_file;

use clap::{Parser, Subcommand};
use cli_structs::{ExtractParameters, SimulateParameters};
use pulsed_common::{
    metrics::{component_info_metric, describe_extraction_metrics},
    tracer::{TracerEngine, TracerOptions},
};
use tracing::level_filters::LevelFilter;

/// [clap] derived struct to parse command line arguments.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[clap(long, env, default_value = "info")]
    log_level: LevelFilter,

    /// Log the fields recorded on each span when it closes, such as the number of pulses found.
    #[clap(long)]
    log_spans: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    #[clap(about = "Extracts laser pulses from trace files and writes them as JSON.")]
    Extract(ExtractParameters),
    #[clap(about = "Writes a synthetic trace of rectangular laser pulses with shot noise.")]
    Simulate(SimulateParameters),
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let _tracer = TracerEngine::new(
        TracerOptions {
            default_level: args.log_level,
            with_span_events: args.log_spans,
        },
        env!("CARGO_PKG_NAME"),
    );

    describe_extraction_metrics();
    component_info_metric("extract-pulses");

    match args.mode {
        Mode::Extract(parameters) => extract::run(&parameters),
        Mode::Simulate(parameters) => simulate::run(&parameters),
    }
}
