//! Benchmark Executor
//!
//! Runs planned targets and renders the results.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ExecutionPlan (from loopbench.toml)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Calibrate, synthesize, measure and rank, per pass
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Pass orchestration and failure handling
//! - [`formatting`] - Human-readable output formatting

mod execution;
mod formatting;

// Re-export public API
pub use execution::{Executor, FailurePolicy};
pub use formatting::{format_human_output, format_table};
