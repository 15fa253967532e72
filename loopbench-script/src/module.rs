//! Script Modules
//!
//! A `.lbs` file: module-level statements that build the globals, plus `def`
//! blocks that become benchmarkable callables.
//!
//! ```text
//! SIZE = 500                       global, evaluated at load time
//! DATA = shuffle(range(SIZE))
//!
//! def sort_plain(n=SIZE):          callable; defaults see earlier globals
//!     xs = shuffle(range(n))
//!     # @region
//!     xs = sorted(xs)
//!     # @endregion
//! ```
//!
//! Globals are evaluated in file order. Bodies resolve names against the
//! finished module scope, so they also see globals defined after them.

use crate::callable::{Callable, Parameter, parse_signature};
use crate::error::ScriptError;
use crate::extract::{docstring_end, indent_of, is_docstring_start, strip_comment};
use crate::scope::Scope;
use evalexpr::build_operator_tree;
use loopbench_core::BenchError;
use std::path::Path;
use std::sync::Arc;

/// Leading keywords of statements that are not allowed at module level
const BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "class", "import", "from", "return", "try", "with",
];

struct Definition {
    name: String,
    params: Vec<Parameter>,
    source: Vec<String>,
    first_line: usize,
}

/// A loaded script module.
#[derive(Debug, Clone)]
pub struct ScriptModule {
    name: String,
    scope: Arc<Scope>,
    callables: Vec<Callable>,
}

impl ScriptModule {
    /// Read and load the module at `path` with the standard prelude.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        Self::load_with_scope(path, Scope::with_prelude())
    }

    /// Read and load the module at `path` on top of `scope`.
    pub fn load_with_scope(path: impl AsRef<Path>, scope: Scope) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&path.display().to_string(), &text, scope)
    }

    /// Load a module from its source text.
    ///
    /// `scope` provides the native functions and any host globals the module
    /// builds on.
    pub fn parse(name: &str, text: &str, mut scope: Scope) -> Result<Self, ScriptError> {
        let lines: Vec<&str> = text.lines().collect();
        let mut definitions: Vec<Definition> = Vec::new();
        let mut first_statement = true;
        let mut i = 0;

        while i < lines.len() {
            let raw = lines[i];
            let line = i + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                i += 1;
                continue;
            }
            if first_statement && is_docstring_start(trimmed) {
                i = docstring_end(&lines, i);
                first_statement = false;
                continue;
            }
            first_statement = false;

            if indent_of(raw) > 0 {
                return Err(syntax(name, line, "unexpected indentation at module level"));
            }

            if trimmed.starts_with("def ") {
                let start = i;
                i += 1;
                while i < lines.len() && (is_filler(lines[i]) || indent_of(lines[i]) > 0) {
                    i += 1;
                }
                // Column-0 comments after the last body line belong to the module
                let mut end = i;
                while end > start + 1
                    && (lines[end - 1].trim().is_empty() || indent_of(lines[end - 1]) == 0)
                {
                    end -= 1;
                }

                let (fn_name, params) = parse_signature(name, line, raw, &scope)?;
                if let Some(previous) = definitions.iter().find(|d| d.name == fn_name) {
                    return Err(ScriptError::DuplicateFunction {
                        module: name.to_string(),
                        name: fn_name,
                        line,
                        previous: previous.first_line,
                    });
                }
                tracing::debug!(module = name, function = %fn_name, line, "function defined");
                definitions.push(Definition {
                    name: fn_name,
                    params,
                    source: lines[start..end].iter().map(|l| l.to_string()).collect(),
                    first_line: line,
                });
                continue;
            }

            let code = strip_comment(trimmed);
            let keyword = code
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .next()
                .unwrap_or_default();
            if BLOCK_KEYWORDS.contains(&keyword) {
                return Err(syntax(
                    name,
                    line,
                    &format!("`{keyword}` statements are only allowed inside functions"),
                ));
            }

            let node = build_operator_tree(code).map_err(|e| syntax(name, line, &e.to_string()))?;
            node.eval_with_context_mut(&mut scope)
                .map_err(|e| BenchError::Runtime {
                    function: name.to_string(),
                    line,
                    message: e.to_string(),
                })?;
            i += 1;
        }

        let scope = Arc::new(scope);
        let callables = definitions
            .into_iter()
            .map(|d| Callable::new(d.name, d.params, d.source, d.first_line, Arc::clone(&scope)))
            .collect::<Vec<_>>();
        tracing::debug!(module = name, functions = callables.len(), "module loaded");

        Ok(Self {
            name: name.to_string(),
            scope,
            callables,
        })
    }

    /// Module name (its path when loaded from a file)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module scope after all globals were evaluated
    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    /// All functions in definition order
    pub fn callables(&self) -> &[Callable] {
        &self.callables
    }

    /// Look up a function by name.
    pub fn callable(&self, name: &str) -> Result<&Callable, ScriptError> {
        self.callables
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| ScriptError::UnknownFunction {
                module: self.name.clone(),
                name: name.to_string(),
            })
    }
}

/// Blank or comment-only line.
fn is_filler(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn syntax(module: &str, line: usize, message: &str) -> ScriptError {
    ScriptError::Syntax {
        module: module.to_string(),
        line,
        message: message.to_string(),
    }
}
