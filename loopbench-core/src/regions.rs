//! Regions - The Closure Benchmark API
//!
//! Benchmarks written in Rust pass their work as a closure. Inside the
//! closure, each call to [`Regions::measure`] times one named block; blocks
//! run sequentially and their times add up to the iteration's measured time.
//! Code outside `measure` runs every iteration but is never timed.
//!
//! A closure that never calls `measure` is timed as a whole, the same way a
//! script body without region markers is.
//!
//! ```ignore
//! let mut data: Vec<u64> = (0..1_000).rev().collect();
//! let routine = ClosureRoutine::new("sort", |r| {
//!     data.reverse();                      // unmeasured
//!     r.measure("sort", || data.sort())?; // measured
//!     Ok(())
//! });
//! ```

use crate::driver::{IterationBody, IterationProbe};
use crate::error::Result;
use crate::measure::Timer;

/// Label reported for the implicit whole-body region
pub const WHOLE_BODY: &str = "<whole body>";

/// Handle through which a closure benchmark times its regions.
pub struct Regions<'p, 'n> {
    probe: &'p mut IterationProbe<'n>,
    measured: u32,
}

impl<'p, 'n> Regions<'p, 'n> {
    fn new(probe: &'p mut IterationProbe<'n>) -> Self {
        Self { probe, measured: 0 }
    }

    /// Run `f` as a measured region named `label`.
    ///
    /// Fails with `MeasurementTooFast` when the too-fast check is enabled and
    /// the region finished below the measurability floor.
    #[inline]
    pub fn measure<T, F>(&mut self, label: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> T,
    {
        self.probe.start();
        let out = std::hint::black_box(f());
        self.probe.accumulate();
        self.measured += 1;
        self.probe.guard(label)?;
        Ok(out)
    }

    /// Regions measured so far in this iteration
    pub fn measured(&self) -> u32 {
        self.measured
    }
}

/// A Rust closure measured under the timed-loop driver.
pub struct ClosureRoutine<F> {
    name: String,
    body: F,
}

impl<F> ClosureRoutine<F>
where
    F: FnMut(&mut Regions<'_, '_>) -> Result<()>,
{
    /// Wrap `body` as the routine called `name`.
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    /// Routine name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F> IterationBody for ClosureRoutine<F>
where
    F: FnMut(&mut Regions<'_, '_>) -> Result<()>,
{
    fn run_iteration(&mut self, probe: &mut IterationProbe<'_>) -> Result<()> {
        let timer = Timer::start();
        let measured = {
            let mut regions = Regions::new(probe);
            (self.body)(&mut regions)?;
            regions.measured()
        };
        let whole = timer.stop();

        if measured == 0 {
            probe.add_region(whole);
            probe.guard(WHOLE_BODY)?;
        }
        Ok(())
    }
}
