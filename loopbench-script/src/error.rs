//! Script Errors

use loopbench_core::BenchError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while loading script modules or preparing their callables.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The module file could not be read.
    #[error("cannot read script module {path}: {source}")]
    Io {
        /// Module path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A module-level line is not valid script syntax.
    #[error("{module}:{line}: syntax error: {message}")]
    Syntax {
        /// Module name
        module: String,
        /// 1-based source line
        line: usize,
        /// What was wrong
        message: String,
    },

    /// Two `def` blocks share a name.
    #[error("{module}:{line}: function `{name}` is already defined on line {previous}")]
    DuplicateFunction {
        /// Module name
        module: String,
        /// Function name
        name: String,
        /// 1-based line of the second definition
        line: usize,
        /// 1-based line of the first definition
        previous: usize,
    },

    /// A benchmark refers to a function the module does not define.
    #[error("module {module} has no function `{name}`")]
    UnknownFunction {
        /// Module name
        module: String,
        /// Requested function name
        name: String,
    },

    /// A `def` line could not be parsed.
    #[error("{module}:{line}: invalid signature `{text}`: {message}")]
    InvalidSignature {
        /// Module name
        module: String,
        /// 1-based source line
        line: usize,
        /// Signature line, trimmed
        text: String,
        /// What was wrong
        message: String,
    },

    /// An engine failure while evaluating module code or preparing a routine.
    #[error(transparent)]
    Bench(#[from] BenchError),
}

impl ScriptError {
    /// Short stable identifier of the error kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ScriptError::Io { .. } => "io",
            ScriptError::Syntax { .. } => "syntax",
            ScriptError::DuplicateFunction { .. } => "duplicate-function",
            ScriptError::UnknownFunction { .. } => "unknown-function",
            ScriptError::InvalidSignature { .. } => "invalid-signature",
            ScriptError::Bench(e) => e.kind(),
        }
    }
}
