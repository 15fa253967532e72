//! Callable Descriptors
//!
//! A script function as the engine sees it: its name, declared parameters,
//! raw source and the module scope it resolves names against.

use crate::error::ScriptError;
use crate::scope::Scope;
use evalexpr::{Value, build_operator_tree};
use std::sync::Arc;

/// How a declared parameter accepts arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// `name` or `name=default`
    PositionalOrKeyword,
    /// Declared before a `/`
    PositionalOnly,
    /// `*name`
    VarPositional,
    /// Declared after `*` or `*name`
    KeywordOnly,
    /// `**name`
    VarKeyword,
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Accepted argument kind
    pub kind: ParamKind,
    /// Default value, evaluated when the function was defined
    pub default: Option<Value>,
}

impl Parameter {
    fn new(name: &str, kind: ParamKind, default: Option<Value>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default,
        }
    }
}

/// A script function captured from its module. Immutable once built.
#[derive(Debug, Clone)]
pub struct Callable {
    name: String,
    params: Vec<Parameter>,
    source: Vec<String>,
    first_line: usize,
    scope: Arc<Scope>,
}

impl Callable {
    pub(crate) fn new(
        name: String,
        params: Vec<Parameter>,
        source: Vec<String>,
        first_line: usize,
        scope: Arc<Scope>,
    ) -> Self {
        Self {
            name,
            params,
            source,
            first_line,
            scope,
        }
    }

    /// Build a callable from the text of a single `def` block.
    ///
    /// Parameter defaults are evaluated in `scope`, which also becomes the
    /// callable's defining scope.
    pub fn from_source(text: &str, scope: Arc<Scope>) -> Result<Self, ScriptError> {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let Some(start) = lines.iter().position(|l| !l.trim().is_empty()) else {
            return Err(ScriptError::Syntax {
                module: "<source>".into(),
                line: 1,
                message: "no function definition found".into(),
            });
        };
        let mut end = lines.len();
        while end > start + 1 && lines[end - 1].trim().is_empty() {
            end -= 1;
        }

        let (name, params) = parse_signature("<source>", start + 1, &lines[start], &scope)?;
        Ok(Self::new(
            name,
            params,
            lines[start..end].to_vec(),
            start + 1,
            scope,
        ))
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters in order
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Signature line followed by the body lines
    pub fn source(&self) -> &[String] {
        &self.source
    }

    /// 1-based line of the signature in its module
    pub fn first_line(&self) -> usize {
        self.first_line
    }

    /// Scope the body resolves names against
    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }
}

/// Parse `def name(params):`, evaluating defaults in `scope`.
pub(crate) fn parse_signature(
    module: &str,
    line: usize,
    text: &str,
    scope: &Scope,
) -> Result<(String, Vec<Parameter>), ScriptError> {
    let trimmed = crate::extract::strip_comment(text.trim());
    let invalid = |message: &str| ScriptError::InvalidSignature {
        module: module.to_string(),
        line,
        text: trimmed.to_string(),
        message: message.to_string(),
    };

    let rest = trimmed
        .strip_prefix("def ")
        .ok_or_else(|| invalid("expected `def`"))?;
    let rest = rest
        .strip_suffix(':')
        .ok_or_else(|| invalid("expected `:` at the end of the signature"))?
        .trim_end();
    let open = rest.find('(').ok_or_else(|| invalid("expected `(`"))?;
    let inner = rest[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| invalid("expected `)` before `:`"))?;
    let name = rest[..open].trim();
    if !is_identifier(name) {
        return Err(invalid("function name is not an identifier"));
    }

    let mut params: Vec<Parameter> = Vec::new();
    let mut keyword_only = false;
    let mut seen_default = false;

    for part in split_params(inner) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if params.last().is_some_and(|p| p.kind == ParamKind::VarKeyword) {
            return Err(invalid("no parameter may follow `**`"));
        }

        if part == "/" {
            if keyword_only || params.iter().any(|p| p.kind == ParamKind::PositionalOnly) {
                return Err(invalid("`/` must come before `*` and appear once"));
            }
            for p in &mut params {
                p.kind = ParamKind::PositionalOnly;
            }
        } else if part == "*" {
            if keyword_only {
                return Err(invalid("`*` may appear only once"));
            }
            keyword_only = true;
        } else if let Some(var) = part.strip_prefix("**") {
            let var = strip_annotation(var);
            ensure_identifier(var, &invalid)?;
            params.push(Parameter::new(var, ParamKind::VarKeyword, None));
        } else if let Some(var) = part.strip_prefix('*') {
            if keyword_only {
                return Err(invalid("`*` may appear only once"));
            }
            let var = strip_annotation(var);
            ensure_identifier(var, &invalid)?;
            keyword_only = true;
            params.push(Parameter::new(var, ParamKind::VarPositional, None));
        } else {
            let (declared, default) = match part.split_once('=') {
                Some((declared, default)) => (declared, Some(default.trim())),
                None => (part, None),
            };
            let declared = strip_annotation(declared);
            ensure_identifier(declared, &invalid)?;

            let default = match default {
                Some(expr) => Some(
                    build_operator_tree(expr)
                        .and_then(|node| node.eval_with_context(scope))
                        .map_err(|e| invalid(&format!("default of `{declared}`: {e}")))?,
                ),
                None => None,
            };

            let kind = if keyword_only {
                ParamKind::KeywordOnly
            } else {
                if default.is_some() {
                    seen_default = true;
                } else if seen_default {
                    return Err(invalid("non-default parameter follows default parameter"));
                }
                ParamKind::PositionalOrKeyword
            };
            params.push(Parameter::new(declared, kind, default));
        }
    }

    if let Some(dup) = params
        .iter()
        .enumerate()
        .find(|(i, p)| params[..*i].iter().any(|q| q.name == p.name))
    {
        return Err(invalid(&format!("duplicate parameter `{}`", dup.1.name)));
    }
    Ok((name.to_string(), params))
}

/// Split a parameter list on commas outside brackets and strings.
fn split_params(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

fn strip_annotation(declared: &str) -> &str {
    declared.split(':').next().unwrap_or(declared).trim()
}

fn ensure_identifier(
    name: &str,
    invalid: &impl Fn(&str) -> ScriptError,
) -> Result<(), ScriptError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(invalid(&format!("`{name}` is not an identifier")))
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(text: &str) -> Result<(String, Vec<Parameter>), ScriptError> {
        let mut scope = Scope::with_prelude();
        scope.set("LIMIT", Value::Int(64));
        parse_signature("m", 3, text, &scope)
    }

    fn kinds(params: &[Parameter]) -> Vec<(&str, ParamKind)> {
        params.iter().map(|p| (p.name.as_str(), p.kind)).collect()
    }

    #[test]
    fn test_every_parameter_kind() {
        let (name, params) = signature("def f(a, b, /, c, d=2, *rest, e, f=LIMIT * 2, **opts):").unwrap();
        assert_eq!(name, "f");
        assert_eq!(
            kinds(&params),
            vec![
                ("a", ParamKind::PositionalOnly),
                ("b", ParamKind::PositionalOnly),
                ("c", ParamKind::PositionalOrKeyword),
                ("d", ParamKind::PositionalOrKeyword),
                ("rest", ParamKind::VarPositional),
                ("e", ParamKind::KeywordOnly),
                ("f", ParamKind::KeywordOnly),
                ("opts", ParamKind::VarKeyword),
            ]
        );
        assert_eq!(params[3].default, Some(Value::Int(2)));
        assert_eq!(params[6].default, Some(Value::Int(128)));
        assert_eq!(params[5].default, None);
    }

    #[test]
    fn test_bare_star_and_annotations() {
        let (_, params) = signature("def g(n: int, *, seed=7):  # comment").unwrap();
        assert_eq!(
            kinds(&params),
            vec![("n", ParamKind::PositionalOrKeyword), ("seed", ParamKind::KeywordOnly)]
        );
    }

    #[test]
    fn test_defaults_with_commas_inside_calls() {
        let (_, params) = signature("def h(xs=seq(1, 2, 3), label=\"a,b\"):").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].default, Some(Value::String("a,b".into())));
    }

    #[test]
    fn test_invalid_signatures() {
        for text in [
            "def (a):",
            "def f(a)",
            "def f(a=1, b):",
            "def f(**kw, a):",
            "def f(a, a):",
            "def f(*a, *b):",
            "def f(a=undefined_name):",
            "fn f():",
        ] {
            let err = signature(text).unwrap_err();
            assert!(
                matches!(err, ScriptError::InvalidSignature { line: 3, .. }),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn test_from_source_keeps_body_and_line() {
        let callable = Callable::from_source(
            "\n\ndef work(n):\n    total = sum(range(n))\n\n",
            Arc::new(Scope::with_prelude()),
        )
        .unwrap();
        assert_eq!(callable.name(), "work");
        assert_eq!(callable.first_line(), 3);
        assert_eq!(callable.source().len(), 2);
    }
}
