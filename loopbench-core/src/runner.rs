//! Collector-Controlled Runner
//!
//! Runs a routine with the collector forced to the requested state, restoring
//! the previous state afterwards whether the routine succeeded, failed or
//! panicked.

use crate::calibrate::MeasurabilityFloor;
use crate::driver::{IterationBody, LoopDriver, RunBudget};
use crate::error::Result;
use crate::gc::CollectorGuard;
use crate::sample::TimingSample;

/// Settings shared by every measurement of a benchmarking pass
#[derive(Debug, Clone, Copy)]
pub struct MeasureSettings {
    /// How long each routine loops
    pub budget: RunBudget,
    /// Calibrated floor for the too-fast check
    pub floor: MeasurabilityFloor,
    /// Reject regions faster than the floor
    pub check_too_fast: bool,
    /// Keep the collector enabled while measuring
    pub with_gc: bool,
}

impl MeasureSettings {
    /// Settings with the too-fast check off and the collector disabled.
    pub fn new(budget: RunBudget, floor: MeasurabilityFloor) -> Self {
        Self {
            budget,
            floor,
            check_too_fast: false,
            with_gc: false,
        }
    }
}

/// Invoke `f` with the collector forced to `enabled`.
///
/// The prior collector state is restored on every exit path.
pub fn run_with_collector<T>(enabled: bool, f: impl FnOnce() -> T) -> T {
    let _guard = CollectorGuard::acquire(enabled);
    f()
}

/// Measure `body` as the target `name` under `settings`.
pub fn measure<B>(name: &str, body: &mut B, settings: &MeasureSettings) -> Result<TimingSample>
where
    B: IterationBody + ?Sized,
{
    let driver = LoopDriver::new(name, settings.budget, settings.floor)
        .check_too_fast(settings.check_too_fast);
    run_with_collector(settings.with_gc, || driver.run(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::gc;
    use crate::regions::ClosureRoutine;

    #[test]
    fn test_collector_state_inside_run() {
        let inside = run_with_collector(false, gc::is_enabled);
        assert!(!inside);
        let inside = run_with_collector(true, gc::is_enabled);
        assert!(inside);
    }

    #[test]
    fn test_state_restored_after_failure() {
        let settings = MeasureSettings {
            check_too_fast: true,
            with_gc: false,
            ..MeasureSettings::new(RunBudget::Once, MeasurabilityFloor::from_secs(10.0))
        };
        let mut routine = ClosureRoutine::new("fails", |r| {
            r.measure("noop", || ())?;
            Ok(())
        });

        let err = measure("fails", &mut routine, &settings).unwrap_err();
        assert!(matches!(err, BenchError::MeasurementTooFast { .. }));

        let guard = CollectorGuard::acquire(true);
        assert!(guard.prior(), "collector must be re-enabled after the failure");
    }

    #[test]
    fn test_measure_closure_once() {
        let settings = MeasureSettings::new(RunBudget::Once, MeasurabilityFloor::from_secs(1e-9));
        let mut routine = ClosureRoutine::new("once", |_r| {
            let x = 1;
            let y = 2;
            std::hint::black_box(x + y);
            Ok(())
        });

        let sample = measure("once", &mut routine, &settings).unwrap();
        assert_eq!(sample.name, "once");
        assert_eq!(sample.loops, 1);
        assert!(sample.all_loops_time_sec >= 0.0);
        assert_eq!(sample.second_best_loop_sec, None);
        assert_eq!(sample.second_worst_loop_sec, None);
    }
}
