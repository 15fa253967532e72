//! Engine Errors
//!
//! Every failure the engine can raise while preparing or running a
//! measurement. Errors are structural: none of them is retried, and any of
//! them discards the sample of the callable being measured.

use thiserror::Error;

/// Convenience alias used throughout the engine crates.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Failures raised while extracting, binding, synthesizing or running a
/// benchmark routine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BenchError {
    /// Body indentation is not a consistent multiple of the first statement's.
    #[error(
        "<{function}>: line {line}: indentation of {indent} columns is not a multiple of the body indentation unit ({unit}): `{text}`"
    )]
    MalformedIndentation {
        /// Callable name
        function: String,
        /// 1-based source line
        line: usize,
        /// Offending indentation relative to the signature line
        indent: usize,
        /// Indentation unit established by the first statement
        unit: usize,
        /// Offending line, trimmed
        text: String,
    },

    /// A region marker appeared where its counterpart was expected.
    #[error("<{function}>: line {line}: unbalanced region markers, expected an {expected} marker: `{text}`")]
    UnbalancedRegionMarkers {
        /// Callable name
        function: String,
        /// 1-based source line of the offending marker
        line: usize,
        /// The marker kind that would have been valid here (`START` or `END`)
        expected: &'static str,
        /// Offending marker line, trimmed
        text: String,
    },

    /// A required parameter received no value.
    #[error(
        "<{function}>: missing argument for parameter `{parameter}`: no such keyword and not enough positional arguments ({positional} supplied)"
    )]
    MissingArgument {
        /// Callable name
        function: String,
        /// First unsatisfied parameter
        parameter: String,
        /// Number of positional arguments supplied by the caller
        positional: usize,
    },

    /// A parameter or value shape the binder cannot render.
    #[error("<{function}>: not supported: {detail}")]
    NotImplementedCase {
        /// Callable name
        function: String,
        /// What could not be handled
        detail: String,
    },

    /// More positional arguments than positional parameters.
    #[error("<{function}>: takes {expected} positional argument(s) but {given} were supplied")]
    TooManyArguments {
        /// Callable name
        function: String,
        /// Positional parameters accepted
        expected: usize,
        /// Positional arguments supplied
        given: usize,
    },

    /// A keyword argument matches no parameter.
    #[error("<{function}>: unexpected keyword argument `{keyword}`")]
    UnexpectedKeyword {
        /// Callable name
        function: String,
        /// The unmatched keyword
        keyword: String,
    },

    /// `run_sec` is neither -1 nor at least 0.1 seconds.
    #[error("run_sec must be at least 0.1 seconds or -1 to run once, got {secs}")]
    InvalidRunBudget {
        /// Rejected value in seconds
        secs: f64,
    },

    /// A measured region finished faster than the clock can reliably resolve.
    #[error(
        "<{function}>: region `{region}` too fast to measure: {elapsed:.11} s is below the measurability floor of {floor:.11} s"
    )]
    MeasurementTooFast {
        /// Callable name
        function: String,
        /// First statement of the offending region
        region: String,
        /// Elapsed region time in seconds
        elapsed: f64,
        /// Calibrated floor in seconds
        floor: f64,
    },

    /// The measured body returns a value out of its outermost scope.
    #[error("<{function}>: line {line}: the measured body must not return: `{text}`")]
    ReturnInMeasuredBody {
        /// Callable name
        function: String,
        /// 1-based source line
        line: usize,
        /// Offending line, trimmed
        text: String,
    },

    /// The callable has no executable statement.
    #[error("<{function}>: body has no executable statements")]
    EmptyBody {
        /// Callable name
        function: String,
    },

    /// A statement form the script runtime does not execute.
    #[error("<{function}>: line {line}: unsupported statement: `{text}`")]
    UnsupportedStatement {
        /// Callable name
        function: String,
        /// 1-based source line
        line: usize,
        /// Offending line, trimmed
        text: String,
    },

    /// An expression failed to compile while loading the routine.
    #[error("<{function}>: line {line}: {message}")]
    Compile {
        /// Callable name
        function: String,
        /// 1-based source line (0 for synthesized lines)
        line: usize,
        /// Compiler message
        message: String,
    },

    /// A statement failed while the routine was executing.
    #[error("<{function}>: line {line}: runtime error: {message}")]
    Runtime {
        /// Callable name
        function: String,
        /// 1-based source line (0 for synthesized lines)
        line: usize,
        /// Evaluation message
        message: String,
    },
}

impl BenchError {
    /// Short stable identifier of the error kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            BenchError::MalformedIndentation { .. } => "malformed-indentation",
            BenchError::UnbalancedRegionMarkers { .. } => "unbalanced-region-markers",
            BenchError::MissingArgument { .. } => "missing-argument",
            BenchError::NotImplementedCase { .. } => "not-implemented",
            BenchError::TooManyArguments { .. } => "too-many-arguments",
            BenchError::UnexpectedKeyword { .. } => "unexpected-keyword",
            BenchError::InvalidRunBudget { .. } => "invalid-run-budget",
            BenchError::MeasurementTooFast { .. } => "measurement-too-fast",
            BenchError::ReturnInMeasuredBody { .. } => "return-in-measured-body",
            BenchError::EmptyBody { .. } => "empty-body",
            BenchError::UnsupportedStatement { .. } => "unsupported-statement",
            BenchError::Compile { .. } => "compile",
            BenchError::Runtime { .. } => "runtime",
        }
    }

    /// Name of the callable the error belongs to, when it has one.
    pub fn function(&self) -> Option<&str> {
        match self {
            BenchError::InvalidRunBudget { .. } => None,
            BenchError::MalformedIndentation { function, .. }
            | BenchError::UnbalancedRegionMarkers { function, .. }
            | BenchError::MissingArgument { function, .. }
            | BenchError::NotImplementedCase { function, .. }
            | BenchError::TooManyArguments { function, .. }
            | BenchError::UnexpectedKeyword { function, .. }
            | BenchError::MeasurementTooFast { function, .. }
            | BenchError::ReturnInMeasuredBody { function, .. }
            | BenchError::EmptyBody { function }
            | BenchError::UnsupportedStatement { function, .. }
            | BenchError::Compile { function, .. }
            | BenchError::Runtime { function, .. } => Some(function),
        }
    }
}
