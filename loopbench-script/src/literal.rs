//! Literal Rendering
//!
//! Renders argument values as script source literals, so that evaluating the
//! rendered text in a fresh scope reproduces the value.

use evalexpr::Value;
use loopbench_core::{BenchError, Result};
use std::fmt::Write;

/// Render `value` as a source literal.
///
/// Strings are quoted, floats always carry a decimal point, sequences use
/// `seq(...)`. Fails with `NotImplementedCase` for values the script syntax
/// cannot express.
pub fn render(function: &str, value: &Value) -> Result<String> {
    let mut out = String::new();
    write_value(function, value, &mut out)?;
    Ok(out)
}

/// Render `(key, value)` entries as a `mapping(...)` call.
pub fn render_mapping<'a, I>(function: &str, entries: I) -> Result<String>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut out = String::from("mapping(");
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_string(key, &mut out);
        out.push_str(", ");
        write_value(function, value, &mut out)?;
    }
    out.push(')');
    Ok(out)
}

/// Render a sequence of values as a `seq(...)` call.
pub fn render_seq(function: &str, items: &[Value]) -> Result<String> {
    let mut out = String::new();
    write_seq(function, items, &mut out)?;
    Ok(out)
}

fn write_value(function: &str, value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::String(s) => write_string(s, out),
        Value::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(not_implemented(
                    function,
                    format!("float value {f} has no literal form"),
                ));
            }
            let text = f.to_string();
            out.push_str(&text);
            if !text.contains('.') {
                out.push_str(".0");
            }
        }
        Value::Boolean(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Tuple(items) => write_seq(function, items, out)?,
        Value::Empty => out.push_str("()"),
    }
    Ok(())
}

fn write_seq(function: &str, items: &[Value], out: &mut String) -> Result<()> {
    // A lone argument is passed through unwrapped, so `seq(seq(1, 2))` and
    // `seq(())` cannot produce a one-element sequence.
    if let [only @ (Value::Tuple(_) | Value::Empty)] = items {
        return Err(not_implemented(
            function,
            format!("a one-element sequence holding {only} cannot be written as a literal"),
        ));
    }
    out.push_str("seq(");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(function, item, out)?;
    }
    out.push(')');
    Ok(())
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

fn not_implemented(function: &str, detail: String) -> BenchError {
    BenchError::NotImplementedCase {
        function: function.to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;
    use evalexpr::eval_with_context_mut;

    fn eval(text: &str) -> Value {
        eval_with_context_mut(text, &mut Scope::with_prelude()).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(render("f", &Value::Int(-3)).unwrap(), "-3");
        assert_eq!(render("f", &Value::Float(2.0)).unwrap(), "2.0");
        assert_eq!(render("f", &Value::Float(0.25)).unwrap(), "0.25");
        assert_eq!(render("f", &Value::Boolean(true)).unwrap(), "true");
        assert_eq!(render("f", &Value::Empty).unwrap(), "()");
    }

    #[test]
    fn test_strings_are_quoted_and_escaped() {
        let value = Value::String(r#"say "hi" \o/"#.into());
        let text = render("f", &value).unwrap();
        assert_eq!(text, r#""say \"hi\" \\o/""#);
        assert_eq!(eval(&text), value);
    }

    #[test]
    fn test_sequences_evaluate_back() {
        let value = Value::Tuple(vec![
            Value::Int(1),
            Value::Tuple(vec![Value::String("a".into()), Value::Float(1e20)]),
        ]);
        let text = render("f", &value).unwrap();
        assert_eq!(eval(&text), value);

        assert_eq!(render("f", &Value::Tuple(vec![])).unwrap(), "seq()");
        assert_eq!(render("f", &Value::Tuple(vec![Value::Int(5)])).unwrap(), "seq(5)");
    }

    #[test]
    fn test_nested_single_sequence_is_rejected() {
        let value = Value::Tuple(vec![Value::Tuple(vec![Value::Int(1), Value::Int(2)])]);
        let err = render("nested", &value).unwrap_err();
        assert!(matches!(
            err,
            BenchError::NotImplementedCase { ref function, .. } if function == "nested"
        ));
        assert!(render("f", &Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_mapping_rendering() {
        let a = Value::Int(1);
        let b = Value::String("x".into());
        let text = render_mapping("f", [("a", &a), ("b", &b)]).unwrap();
        assert_eq!(text, r#"mapping("a", 1, "b", "x")"#);
        assert_eq!(render_mapping("f", Vec::<(&str, &Value)>::new()).unwrap(), "mapping()");
        assert_eq!(eval("mapping()"), Value::Tuple(vec![]));
    }
}
