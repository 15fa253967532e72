//! Timing Samples
//!
//! Aggregate statistics produced by one run of a timed loop.

use serde::{Deserialize, Serialize};

/// Aggregate timings of one routine run. All durations are in seconds.
///
/// `second_best_loop_sec` and `second_worst_loop_sec` are `None` ("not
/// measured") exactly when the routine ran a single loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSample {
    /// Display name of the measured target
    pub name: String,
    /// Number of completed loop iterations (at least 1)
    pub loops: u64,
    /// Sum of the measured time of every iteration
    pub all_loops_time_sec: f64,
    /// Mean measured time per iteration
    pub avg_loop_sec: f64,
    /// Fastest iteration
    pub best_loop_sec: f64,
    /// Second fastest iteration
    pub second_best_loop_sec: Option<f64>,
    /// Slowest iteration
    pub worst_loop_sec: f64,
    /// Second slowest iteration
    pub second_worst_loop_sec: Option<f64>,
}

/// Running reduction of per-iteration measurements.
#[derive(Debug, Clone)]
pub(crate) struct SampleAccumulator {
    loops: u64,
    total: f64,
    best: f64,
    second_best: f64,
    worst: f64,
    second_worst: f64,
}

impl SampleAccumulator {
    pub(crate) fn new() -> Self {
        Self {
            loops: 0,
            total: 0.0,
            best: f64::INFINITY,
            second_best: f64::INFINITY,
            worst: 0.0,
            second_worst: 0.0,
        }
    }

    /// Fold one iteration's measured time into the running statistics.
    #[inline]
    pub(crate) fn record(&mut self, elapsed: f64) {
        self.loops += 1;
        self.total += elapsed;

        if elapsed <= self.best {
            self.second_best = self.best;
            self.best = elapsed;
        } else if elapsed < self.second_best {
            self.second_best = elapsed;
        }

        if elapsed >= self.worst {
            self.second_worst = self.worst;
            self.worst = elapsed;
        } else if elapsed > self.second_worst {
            self.second_worst = elapsed;
        }
    }

    pub(crate) fn loops(&self) -> u64 {
        self.loops
    }

    pub(crate) fn finish(self, name: impl Into<String>) -> TimingSample {
        let loops = self.loops.max(1);
        let measured_twice = self.loops > 1;
        TimingSample {
            name: name.into(),
            loops,
            all_loops_time_sec: self.total,
            avg_loop_sec: self.total / loops as f64,
            best_loop_sec: if self.best.is_finite() { self.best } else { 0.0 },
            second_best_loop_sec: measured_twice.then_some(self.second_best),
            worst_loop_sec: self.worst,
            second_worst_loop_sec: measured_twice.then_some(self.second_worst),
        }
    }
}
