use crate::{
    cli_structs::SimulateParameters,
    trace_file::{Counts, OwnedTrace, TraceFile, write_json},
};
use anyhow::{Context, Result};
use ndarray::{Array1, Array2};
use pulsed_common::Count;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Poisson};
use tracing::info;

/// Shot noise model of a trace of rectangular laser pulses.
struct PulseTrain<'a> {
    bins: usize,
    pulse_starts: &'a [usize],
    pulse_length: usize,
    background: Poisson<f64>,
    signal: Poisson<f64>,
}

impl<'a> PulseTrain<'a> {
    fn new(parameters: &'a SimulateParameters) -> Result<Self> {
        Ok(Self {
            bins: parameters.bins,
            pulse_starts: &parameters.pulse_starts,
            pulse_length: parameters.pulse_length,
            background: Poisson::new(parameters.background_rate)
                .context("Invalid background rate")?,
            signal: Poisson::new(parameters.signal_rate).context("Invalid signal rate")?,
        })
    }

    fn in_pulse(&self, bin: usize) -> bool {
        self.pulse_starts
            .iter()
            .any(|&start| (start..start + self.pulse_length).contains(&bin))
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Array1<Count> {
        Array1::from_iter((0..self.bins).map(|bin| {
            let distribution = if self.in_pulse(bin) {
                &self.signal
            } else {
                &self.background
            };
            distribution.sample(rng) as Count
        }))
    }
}

pub(crate) fn simulate(parameters: &SimulateParameters, seed: u64) -> Result<OwnedTrace> {
    let pulse_train = PulseTrain::new(parameters)?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(match parameters.gates {
        Some(gates) => {
            let mut trace = Array2::zeros((gates, parameters.bins));
            for mut gate in trace.outer_iter_mut() {
                gate.assign(&pulse_train.sample(&mut rng));
            }
            OwnedTrace::Gated(trace)
        }
        None => OwnedTrace::Ungated(pulse_train.sample(&mut rng)),
    })
}

pub(crate) fn run(parameters: &SimulateParameters) -> Result<()> {
    let seed = parameters.seed.unwrap_or_else(rand::random);
    info!("Simulating trace with seed {seed}");
    let trace = simulate(parameters, seed)?;
    let trace_file = TraceFile {
        counts: Counts::from(&trace),
    };
    write_json(parameters.output.as_deref(), &trace_file).context("Cannot write trace")
}
