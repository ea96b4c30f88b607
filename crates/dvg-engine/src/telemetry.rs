//! Observational phase timings.
//!
//! The engine reports how long each phase of a computation took. Nothing in
//! the engine reads these back.

use std::fmt;
use std::time::Duration;

use tracing::debug;

/// A phase of one divergence computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Flattening the three snapshots into per-path state.
    Flatten,
    /// Evaluating every path.
    Compare,
    /// Object-type coalescing over the full batch.
    Coalesce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Flatten => "flatten",
            Self::Compare => "compare",
            Self::Coalesce => "coalesce",
        };
        f.write_str(s)
    }
}

/// Wall-clock time spent in one phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseTiming {
    pub phase: Phase,
    /// `subject.upstream.fork` document ids of the computation.
    pub label: String,
    pub elapsed: Duration,
}

/// Sink for phase timings.
pub trait Telemetry: Send + Sync {
    fn record(&self, timing: &PhaseTiming);
}

/// Logs each phase at `debug` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record(&self, timing: &PhaseTiming) {
        debug!(
            phase = %timing.phase,
            label = %timing.label,
            elapsed_us = timing.elapsed.as_micros() as u64,
            "divergence phase complete"
        );
    }
}

/// Discards every timing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _timing: &PhaseTiming) {}
}
