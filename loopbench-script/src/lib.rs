#![warn(missing_docs)]
//! LoopBench Script - Source-Level Benchmark Targets
//!
//! Benchmarks written in the LoopBench script dialect (`.lbs`) are measured
//! by rewriting their source into a timed routine:
//! - the extractor strips a function down to its executable body
//! - the tagger turns `# @region` / `# @endregion` comments into timing probes
//! - the binder renders the supplied arguments as literal assignments
//! - the synthesizer compiles the result and runs it on the shared loop driver
//!
//! Expressions are evaluated by `evalexpr`; statement blocks (`if`, `while`,
//! `for`) are handled by this crate's own block interpreter.

mod binder;
mod block;
mod callable;
mod error;
mod extract;
pub mod literal;
mod module;
mod scope;
mod synth;
mod tagger;

pub use binder::{Args, Binding, bind};
pub use block::Program;
pub use callable::{Callable, ParamKind, Parameter};
pub use error::ScriptError;
pub use evalexpr::Value;
pub use extract::{SourceLine, extract, extract_lines};
pub use module::ScriptModule;
pub use scope::{NativeFn, Scope};
pub use synth::{ScriptRoutine, SynthSettings, SynthesizedRoutine, Synthesizer};
pub use tagger::{END_TOKEN, Marker, Probe, START_TOKEN, TaggedLine, parse_marker, tag};
