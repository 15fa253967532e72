#![warn(missing_docs)]
//! # LoopBench
//!
//! Micro-benchmarking harness that times function bodies, or marked regions
//! inside them, under a repeated-execution protocol and ranks the results.
//!
//! LoopBench measures two kinds of targets:
//! - **Script functions**: `def` blocks in `.lbs` modules. The body is
//!   rewritten into a timed routine; `# @region` / `# @endregion` comments
//!   restrict timing to the code between them.
//! - **Rust closures**: [`ClosureRoutine`] bodies that mark regions with
//!   [`Regions::measure`].
//!
//! Both run on the same loop driver: a fixed wall-clock budget (or a single
//! iteration), collector disabled unless asked otherwise, and a too-fast
//! check against the calibrated clock resolution.
//!
//! ## Script Quick Start
//!
//! ```ignore
//! use loopbench::prelude::*;
//!
//! let module = ScriptModule::load("demos/sorting.lbs")?;
//! let floor = MeasurabilityFloor::calibrate();
//! let synth = Synthesizer::new(SynthSettings::new(0.5, floor)?.check_too_fast(true));
//!
//! let mut samples = Vec::new();
//! for name in ["sort_builtin", "sort_insertion"] {
//!     let routine = synth.synthesize(module.callable(name)?, &Args::new().arg(200i64))?;
//!     samples.push(routine.run(false)?);
//! }
//! for row in rank_samples(samples, RankBy::Best) {
//!     println!("{} {} {:.3}", row.rank, row.name(), row.compare);
//! }
//! ```
//!
//! ## Closure Quick Start
//!
//! ```ignore
//! use loopbench::prelude::*;
//!
//! let mut routine = ClosureRoutine::new("sum", |r| {
//!     let data: Vec<u64> = (0..10_000).collect();      // unmeasured setup
//!     r.measure("sum", || data.iter().sum::<u64>())?;  // measured region
//!     Ok(())
//! });
//! let settings = MeasureSettings::new(RunBudget::from_secs(0.5)?, MeasurabilityFloor::calibrate());
//! let sample = measure("sum", &mut routine, &settings)?;
//! ```

// Re-export core types
pub use loopbench_core::{
    BenchError, ClosureRoutine, IterationBody, IterationProbe, LoopDriver, MIN_RUN_SECS,
    MeasurabilityFloor, MeasureSettings, RUN_ONCE_SECS, Regions, RunBudget, TimingSample,
    WHOLE_BODY, gc, measure, run_with_collector,
};

// Re-export script types
pub use loopbench_script::{
    Args, Callable, ParamKind, Parameter, Scope, ScriptError, ScriptModule, SynthSettings,
    SynthesizedRoutine, Synthesizer, Value,
};

// Re-export report types
pub use loopbench_report::{
    FailureInfo, ModuleReport, OutputFormat, RankBy, RankedRow, Report, RowCells,
    generate_json_report, rank_samples,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Args, BenchError, ClosureRoutine, MeasurabilityFloor, MeasureSettings, RankBy, Regions,
        RunBudget, ScriptModule, SynthSettings, Synthesizer, TimingSample, measure,
        rank_samples,
    };
}

/// Run the LoopBench CLI harness.
///
/// ```ignore
/// fn main() {
///     loopbench::run().unwrap();
/// }
/// ```
pub use loopbench_cli::run;

/// Render ranked rows as an aligned terminal table.
pub use loopbench_cli::format_table;
