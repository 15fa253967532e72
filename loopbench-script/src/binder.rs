//! Parameter Binder
//!
//! Matches supplied arguments against a callable's declared parameters and
//! renders one literal assignment per parameter. The assignments run at the
//! top of every loop iteration, outside any measured region.

use crate::callable::{Callable, ParamKind};
use crate::literal;
use evalexpr::Value;
use loopbench_core::{BenchError, Result};
use std::collections::BTreeMap;

/// Arguments supplied for one benchmark target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    /// Positional arguments in order
    pub positional: Vec<Value>,
    /// Keyword arguments by name
    pub keyword: BTreeMap<String, Value>,
}

impl Args {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }
}

/// One rendered parameter assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Parameter name
    pub name: String,
    /// Source literal of the bound value
    pub literal: String,
}

impl Binding {
    /// The assignment statement, `name = literal`.
    pub fn statement(&self) -> String {
        format!("{} = {}", self.name, self.literal)
    }
}

/// Bind `args` to the parameters of `callable`, in declaration order.
pub fn bind(callable: &Callable, args: &Args) -> Result<Vec<Binding>> {
    let function = callable.name();
    let mut positional = args.positional.iter();
    let mut keyword: BTreeMap<&str, &Value> =
        args.keyword.iter().map(|(k, v)| (k.as_str(), v)).collect();
    let mut bindings = Vec::with_capacity(callable.params().len());
    let mut accepts_extra_keywords = false;

    for param in callable.params() {
        let name = param.name.as_str();
        let literal = match param.kind {
            ParamKind::PositionalOrKeyword => {
                let value = match keyword.remove(name) {
                    Some(value) => value,
                    None => match positional.next().or(param.default.as_ref()) {
                        Some(value) => value,
                        None => return Err(missing(function, name, args)),
                    },
                };
                literal::render(function, value)?
            }
            ParamKind::PositionalOnly => {
                return Err(BenchError::NotImplementedCase {
                    function: function.to_string(),
                    detail: format!("positional-only parameter `{name}`"),
                });
            }
            ParamKind::VarPositional => {
                let rest: Vec<Value> = positional.by_ref().cloned().collect();
                literal::render_seq(function, &rest)?
            }
            ParamKind::KeywordOnly => {
                let value = match keyword.remove(name).or(param.default.as_ref()) {
                    Some(value) => value,
                    None => return Err(missing(function, name, args)),
                };
                literal::render(function, value)?
            }
            ParamKind::VarKeyword => {
                accepts_extra_keywords = true;
                let rest = std::mem::take(&mut keyword);
                literal::render_mapping(function, rest)?
            }
        };
        bindings.push(Binding {
            name: name.to_string(),
            literal,
        });
    }

    let leftover = positional.count();
    if leftover > 0 {
        return Err(BenchError::TooManyArguments {
            function: function.to_string(),
            expected: args.positional.len() - leftover,
            given: args.positional.len(),
        });
    }
    if !accepts_extra_keywords {
        if let Some((keyword, _)) = keyword.into_iter().next() {
            return Err(BenchError::UnexpectedKeyword {
                function: function.to_string(),
                keyword: keyword.to_string(),
            });
        }
    }

    tracing::debug!(function, bindings = bindings.len(), "arguments bound");
    Ok(bindings)
}

fn missing(function: &str, parameter: &str, args: &Args) -> BenchError {
    BenchError::MissingArgument {
        function: function.to_string(),
        parameter: parameter.to_string(),
        positional: args.positional.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;
    use std::sync::Arc;

    fn callable(signature: &str) -> Callable {
        Callable::from_source(
            &format!("{signature}\n    pass\n"),
            Arc::new(Scope::with_prelude()),
        )
        .unwrap()
    }

    fn statements(bindings: &[Binding]) -> Vec<String> {
        bindings.iter().map(Binding::statement).collect()
    }

    #[test]
    fn test_positional_then_keyword_then_default() {
        let f = callable("def f(a, b, c=3):");
        let bindings = bind(&f, &Args::new().arg(1i64).kwarg("b", "two")).unwrap();
        assert_eq!(statements(&bindings), vec!["a = 1", "b = \"two\"", "c = 3"]);
    }

    #[test]
    fn test_keyword_wins_over_positional() {
        let f = callable("def f(a, b):");
        let bindings = bind(&f, &Args::new().arg(10i64).kwarg("a", 20i64)).unwrap();
        assert_eq!(statements(&bindings), vec!["a = 20", "b = 10"]);
    }

    #[test]
    fn test_short_positional_list_names_first_missing_parameter() {
        let f = callable("def f(a, b, c):");
        let err = bind(&f, &Args::new().arg(1i64)).unwrap_err();
        assert_eq!(
            err,
            BenchError::MissingArgument {
                function: "f".into(),
                parameter: "b".into(),
                positional: 1,
            }
        );
    }

    #[test]
    fn test_variadics_collect_the_rest() {
        let f = callable("def f(a, *rest, scale=1.5, **opts):");
        let args = Args::new()
            .arg(1i64)
            .arg(2i64)
            .arg(3i64)
            .kwarg("mode", "fast")
            .kwarg("depth", 4i64);
        let bindings = bind(&f, &args).unwrap();
        assert_eq!(
            statements(&bindings),
            vec![
                "a = 1",
                "rest = seq(2, 3)",
                "scale = 1.5",
                "opts = mapping(\"depth\", 4, \"mode\", \"fast\")",
            ]
        );
    }

    #[test]
    fn test_empty_variadics() {
        let f = callable("def f(*rest, **opts):");
        let bindings = bind(&f, &Args::new()).unwrap();
        assert_eq!(statements(&bindings), vec!["rest = seq()", "opts = mapping()"]);
    }

    #[test]
    fn test_keyword_only_without_default() {
        let f = callable("def f(*, seed):");
        let err = bind(&f, &Args::new()).unwrap_err();
        assert!(matches!(err, BenchError::MissingArgument { ref parameter, .. } if parameter == "seed"));
    }

    #[test]
    fn test_positional_only_is_not_supported() {
        let f = callable("def f(a, /, b):");
        let err = bind(&f, &Args::new().arg(1i64).arg(2i64)).unwrap_err();
        assert!(matches!(err, BenchError::NotImplementedCase { .. }));
    }

    #[test]
    fn test_leftover_arguments() {
        let f = callable("def f(a):");
        let err = bind(&f, &Args::new().arg(1i64).arg(2i64)).unwrap_err();
        assert!(matches!(
            err,
            BenchError::TooManyArguments { expected: 1, given: 2, .. }
        ));

        let err = bind(&f, &Args::new().arg(1i64).kwarg("zzz", 0i64)).unwrap_err();
        assert!(matches!(err, BenchError::UnexpectedKeyword { ref keyword, .. } if keyword == "zzz"));
    }
}
