//! Poll cadence: burst, steady, slow.
//!
//! One schedule owns every poll delay. The original widget layered a
//! per-turn burst timer over an independent background interval, which
//! raced and produced duplicate in-flight requests; here the turn
//! runner asks this table for the next delay and owns the single
//! timer.

use std::time::Duration;

use quotewire_types::config::PollConfig;

/// Adaptive delay table for the poll loop.
///
/// Attempts are numbered from 1. The first `burst_len` attempts use
/// the burst delay, attempts up to `steady_len` the steady delay, and
/// everything after the slow delay. The slow delay is also the
/// background cadence between turns.
#[derive(Debug, Clone)]
pub struct PollCadence {
    burst: Duration,
    burst_len: u32,
    steady: Duration,
    steady_len: u32,
    slow: Duration,
}

impl PollCadence {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            burst: Duration::from_millis(config.burst_ms),
            burst_len: config.burst_len,
            steady: Duration::from_millis(config.steady_ms),
            steady_len: config.steady_len,
            slow: Duration::from_millis(config.slow_ms),
        }
    }

    /// Delay before the given attempt (1-based).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        if attempt <= self.burst_len {
            self.burst
        } else if attempt <= self.steady_len {
            self.steady
        } else {
            self.slow
        }
    }

    /// The steady background cadence used between turns.
    pub fn background_delay(&self) -> Duration {
        self.slow
    }
}

impl Default for PollCadence {
    fn default() -> Self {
        Self::new(&PollConfig::default())
    }
}
