//! Campaign resource accounting: stopwatch, limits, and running usage.

use serde::Serialize;
use std::time::{Duration, Instant};

/// An accumulating stopwatch.  Can be started and stopped repeatedly;
/// `duration` includes the currently running segment, if any.
#[derive(Debug, Default)]
pub struct Stopwatch {
    accumulated: Duration,
    started_at: Option<Instant>,
}

impl Stopwatch {
    /// A stopped stopwatch at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin (or resume) timing.  Starting a running stopwatch is a
    /// no-op.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Stop timing, folding the running segment into the total.
    pub fn stop(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += started_at.elapsed();
        }
    }

    /// Whether the stopwatch is currently running.
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Total measured time so far.
    pub fn duration(&self) -> Duration {
        match self.started_at {
            Some(started_at) => self.accumulated + started_at.elapsed(),
            None => self.accumulated,
        }
    }
}

/// Ceilings placed on a fuzzing campaign.  `None` means unlimited.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceLimits {
    /// Maximum campaign wall-clock time.
    pub wall_clock: Option<Duration>,
    /// Maximum number of inputs to evaluate.
    pub num_inputs: Option<u64>,
}

impl ResourceLimits {
    /// No limits at all.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Cap the campaign's wall-clock time.
    pub fn with_wall_clock(mut self, limit: Duration) -> Self {
        self.wall_clock = Some(limit);
        self
    }

    /// Cap the number of evaluated inputs.
    pub fn with_num_inputs(mut self, limit: u64) -> Self {
        self.num_inputs = Some(limit);
        self
    }

    /// Whether the given usage meets or exceeds any configured limit.
    pub fn reached_by(&self, usage: &ResourceUsage) -> bool {
        if let Some(limit) = self.wall_clock {
            if usage.wall_clock >= limit {
                return true;
            }
        }
        if let Some(limit) = self.num_inputs {
            if usage.num_inputs >= limit {
                return true;
            }
        }
        false
    }
}

/// Resources a campaign has consumed so far.  Updated by the harness
/// once per trial.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ResourceUsage {
    /// Wall-clock time spent in the campaign.
    pub wall_clock: Duration,
    /// Number of inputs evaluated.
    pub num_inputs: u64,
}
