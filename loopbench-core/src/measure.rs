//! Wall-Clock Timing
//!
//! Thin wrappers over the monotonic host clock. All engine durations are
//! expressed as `f64` seconds so that they can be summed, compared against the
//! calibrated floor and reported without unit juggling.

use std::time::Duration;

// ─── Instant ─────────────────────────────────────────────────────────────────

/// Monotonic instant used by probes and the loop driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant {
    instant: std::time::Instant,
}

impl Instant {
    /// Capture current instant
    #[inline(always)]
    pub fn now() -> Self {
        Self {
            instant: std::time::Instant::now(),
        }
    }

    /// Elapsed time since this instant
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }

    /// Elapsed time since this instant, in seconds
    #[inline(always)]
    pub fn elapsed_secs(&self) -> f64 {
        self.instant.elapsed().as_secs_f64()
    }
}

// ─── Timer ───────────────────────────────────────────────────────────────────

/// Stopwatch for a single timed span
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds elapsed since the timer was started
    #[inline(always)]
    pub fn stop(&self) -> f64 {
        self.start.elapsed_secs()
    }
}
