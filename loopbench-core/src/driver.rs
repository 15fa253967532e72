//! Timed-Loop Driver
//!
//! Runs an iteration body repeatedly under a run budget and reduces the
//! per-iteration measured time into a [`TimingSample`].
//!
//! Only time spent inside regions counts. A region is opened with
//! [`IterationProbe::start`] and closed with [`IterationProbe::accumulate`];
//! the measured time of an iteration is the sum over all its regions. Work
//! done outside regions (argument setup, shuffling, bookkeeping) still runs
//! but is never measured.
//!
//! ```text
//! start_wall = now
//! loop:
//!     elapsed = 0
//!     body(probe)              regions add into `elapsed`
//!     record(elapsed)          total / best / second best / worst / second worst
//!     stop after one pass (RunBudget::Once) or once now - start_wall >= budget
//! ```

use crate::calibrate::MeasurabilityFloor;
use crate::error::{BenchError, Result};
use crate::measure::Instant;
use crate::sample::{SampleAccumulator, TimingSample};
use std::time::Duration;

/// Smallest accepted run budget, in seconds
pub const MIN_RUN_SECS: f64 = 0.1;

/// Configuration value that requests a single pass
pub const RUN_ONCE_SECS: f64 = -1.0;

/// How long the loop keeps iterating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunBudget {
    /// Exactly one iteration
    Once,
    /// Iterate until this much wall time has passed since the loop started
    For(Duration),
}

impl RunBudget {
    /// Interpret a `run_sec` configuration value.
    ///
    /// `-1` means a single pass; anything else must be at least
    /// [`MIN_RUN_SECS`].
    pub fn from_secs(secs: f64) -> Result<Self> {
        if secs == RUN_ONCE_SECS {
            return Ok(RunBudget::Once);
        }
        if !secs.is_finite() || secs < MIN_RUN_SECS {
            return Err(BenchError::InvalidRunBudget { secs });
        }
        Ok(RunBudget::For(Duration::from_secs_f64(secs)))
    }

    /// The budget as a `run_sec` value (`-1` for a single pass).
    pub fn as_secs(&self) -> f64 {
        match self {
            RunBudget::Once => RUN_ONCE_SECS,
            RunBudget::For(d) => d.as_secs_f64(),
        }
    }

    /// Whether the loop stops after the first iteration.
    pub fn is_once(&self) -> bool {
        matches!(self, RunBudget::Once)
    }
}

impl std::fmt::Display for RunBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunBudget::Once => write!(f, "-1"),
            RunBudget::For(d) => write!(f, "{}", d.as_secs_f64()),
        }
    }
}

/// Per-iteration region timer handed to the iteration body.
#[derive(Debug)]
pub struct IterationProbe<'a> {
    function: &'a str,
    too_fast_floor: Option<f64>,
    open: Option<Instant>,
    last_region: f64,
    elapsed: f64,
    regions: u32,
}

impl<'a> IterationProbe<'a> {
    /// A fresh probe. When `too_fast_floor` is set, [`guard`](Self::guard)
    /// rejects regions faster than it.
    pub fn new(function: &'a str, too_fast_floor: Option<f64>) -> Self {
        Self {
            function,
            too_fast_floor,
            open: None,
            last_region: 0.0,
            elapsed: 0.0,
            regions: 0,
        }
    }

    /// Record the current time as the start of a region.
    #[inline(always)]
    pub fn start(&mut self) {
        self.open = Some(Instant::now());
    }

    /// Close the open region and add its duration to the iteration total.
    ///
    /// Returns the region's duration. Closing with no open region adds
    /// nothing.
    #[inline(always)]
    pub fn accumulate(&mut self) -> f64 {
        let region = match self.open.take() {
            Some(start) => start.elapsed_secs(),
            None => 0.0,
        };
        self.add_region(region);
        region
    }

    /// Add an externally timed region to the iteration total.
    #[inline]
    pub fn add_region(&mut self, secs: f64) {
        self.last_region = secs;
        self.elapsed += secs;
        self.regions += 1;
    }

    /// Reject the most recently closed region if it ran below the floor.
    pub fn guard(&self, region: &str) -> Result<()> {
        match self.too_fast_floor {
            Some(floor) if self.last_region < floor => Err(BenchError::MeasurementTooFast {
                function: self.function.to_string(),
                region: region.to_string(),
                elapsed: self.last_region,
                floor,
            }),
            _ => Ok(()),
        }
    }

    /// Whether the too-fast guard is active
    pub fn checks_too_fast(&self) -> bool {
        self.too_fast_floor.is_some()
    }

    /// Measured time of this iteration so far
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Number of regions closed in this iteration
    pub fn regions(&self) -> u32 {
        self.regions
    }

    /// Name of the callable being measured
    pub fn function(&self) -> &str {
        self.function
    }
}

/// One iteration of a measured routine.
pub trait IterationBody {
    /// Execute the body once, opening and closing regions on `probe`.
    fn run_iteration(&mut self, probe: &mut IterationProbe<'_>) -> Result<()>;
}

/// Iteration body backed by a closure, see [`body_fn`].
pub struct BodyFn<F>(F);

/// Wrap a closure as an [`IterationBody`].
pub fn body_fn<F>(f: F) -> BodyFn<F>
where
    F: FnMut(&mut IterationProbe<'_>) -> Result<()>,
{
    BodyFn(f)
}

impl<F> IterationBody for BodyFn<F>
where
    F: FnMut(&mut IterationProbe<'_>) -> Result<()>,
{
    fn run_iteration(&mut self, probe: &mut IterationProbe<'_>) -> Result<()> {
        (self.0)(probe)
    }
}

/// Drives an [`IterationBody`] under a [`RunBudget`].
#[derive(Debug, Clone)]
pub struct LoopDriver {
    name: String,
    budget: RunBudget,
    floor: MeasurabilityFloor,
    check_too_fast: bool,
}

impl LoopDriver {
    /// Create a driver for the target called `name`.
    pub fn new(name: impl Into<String>, budget: RunBudget, floor: MeasurabilityFloor) -> Self {
        Self {
            name: name.into(),
            budget,
            floor,
            check_too_fast: false,
        }
    }

    /// Enable or disable the too-fast guard.
    pub fn check_too_fast(mut self, enabled: bool) -> Self {
        self.check_too_fast = enabled;
        self
    }

    /// Target name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run budget
    pub fn budget(&self) -> RunBudget {
        self.budget
    }

    /// Run the loop to completion.
    ///
    /// The first error raised by the body aborts the loop and discards every
    /// measurement taken so far.
    pub fn run<B>(&self, body: &mut B) -> Result<TimingSample>
    where
        B: IterationBody + ?Sized,
    {
        let floor = self.check_too_fast.then_some(self.floor.as_secs());
        let mut acc = SampleAccumulator::new();
        let start_wall = Instant::now();

        loop {
            let mut probe = IterationProbe::new(&self.name, floor);
            body.run_iteration(&mut probe)?;
            acc.record(probe.elapsed());

            match self.budget {
                RunBudget::Once => break,
                RunBudget::For(budget) => {
                    if start_wall.elapsed() >= budget {
                        break;
                    }
                }
            }
        }

        tracing::debug!(
            target_name = %self.name,
            loops = acc.loops(),
            wall_secs = start_wall.elapsed_secs(),
            "timed loop finished"
        );
        Ok(acc.finish(self.name.clone()))
    }
}
