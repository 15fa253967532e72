#![warn(missing_docs)]
//! LoopBench Core - Measurement Runtime
//!
//! This crate provides the measurement machinery shared by every front-end:
//! - Reference timer calibration (the measurability floor)
//! - The timed-loop driver and its per-iteration region probe
//! - The closure region API for benchmarks written in Rust
//! - Deferred-reclamation collector control around measurements

mod calibrate;
mod driver;
mod error;
pub mod gc;
mod measure;
mod regions;
mod runner;
mod sample;

pub use calibrate::MeasurabilityFloor;
pub use driver::{
    BodyFn, IterationBody, IterationProbe, LoopDriver, MIN_RUN_SECS, RUN_ONCE_SECS, RunBudget,
    body_fn,
};
pub use error::{BenchError, Result};
pub use measure::{Instant, Timer};
pub use regions::{ClosureRoutine, Regions, WHOLE_BODY};
pub use runner::{MeasureSettings, measure, run_with_collector};
pub use sample::TimingSample;
