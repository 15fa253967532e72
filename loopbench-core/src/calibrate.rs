//! Reference Timer Calibration
//!
//! Establishes the measurability floor of the host clock: twice the smallest
//! non-zero delta observed between two back-to-back clock reads. Regions that
//! finish faster than the floor cannot be timed reliably.

use crate::measure::Instant;
use serde::{Deserialize, Serialize};

/// Number of calibration rounds
pub const CALIBRATION_ROUNDS: usize = 50;

/// Back-to-back clock pairs read per round
pub const READS_PER_ROUND: usize = 3_000;

/// Used when the clock never reports a non-zero delta
const FALLBACK_RESOLUTION_SECS: f64 = 1e-9;

/// Twice the smallest observable clock delta, in seconds.
///
/// Computed once per benchmarking pass and shared by every target in it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurabilityFloor(f64);

impl MeasurabilityFloor {
    /// Sample the clock and derive the floor.
    pub fn calibrate() -> Self {
        let resolution = smallest_clock_delta(CALIBRATION_ROUNDS, READS_PER_ROUND);
        let floor = Self(resolution * 2.0);
        tracing::debug!(
            resolution_secs = resolution,
            floor_secs = floor.0,
            "calibrated measurability floor"
        );
        floor
    }

    /// Use a known floor instead of calibrating.
    pub fn from_secs(secs: f64) -> Self {
        Self(secs.max(0.0))
    }

    /// Floor in seconds
    pub fn as_secs(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for MeasurabilityFloor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.11}", self.0)
    }
}

/// Minimum non-zero delta between two consecutive clock reads.
fn smallest_clock_delta(rounds: usize, reads_per_round: usize) -> f64 {
    let mut smallest = f64::INFINITY;
    for _ in 0..rounds {
        for _ in 0..reads_per_round {
            let start = Instant::now();
            let delta = start.elapsed_secs();
            if delta > 0.0 && delta < smallest {
                smallest = delta;
            }
        }
    }

    if smallest.is_finite() {
        smallest
    } else {
        tracing::warn!(
            fallback_secs = FALLBACK_RESOLUTION_SECS,
            "clock reported no non-zero delta during calibration"
        );
        FALLBACK_RESOLUTION_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_is_positive_and_small() {
        let floor = MeasurabilityFloor::calibrate();
        assert!(floor.as_secs() > 0.0);
        // Any usable monotonic clock resolves well below a millisecond
        assert!(floor.as_secs() < 1e-3);
    }

    #[test]
    fn test_smallest_delta_is_finite() {
        let delta = smallest_clock_delta(2, 100);
        assert!(delta > 0.0);
        assert!(delta.is_finite());
    }

    #[test]
    fn test_from_secs_clamps_negative() {
        assert_eq!(MeasurabilityFloor::from_secs(-1.0).as_secs(), 0.0);
        assert_eq!(MeasurabilityFloor::from_secs(2e-8).as_secs(), 2e-8);
    }
}
