pub mod metrics;
pub mod tracer;

/// Photon counts accumulated in a single counter bin.
pub type Count = u64;

/// Index of a counter bin within a raw trace.
pub type BinIndex = usize;

/// Bin width, in seconds, of fast counters when nothing else is configured.
pub const DEFAULT_BIN_WIDTH: f64 = 1e-9;
