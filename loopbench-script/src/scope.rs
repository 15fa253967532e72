//! Script Scope
//!
//! Name-resolution scope for script code: variables plus host-registered
//! native functions. Implements the `evalexpr` context traits, so compiled
//! expressions read and assign through it directly.

use evalexpr::{
    Context, ContextWithMutableVariables, EvalexprError, EvalexprResult, IntType, Value,
};
use fxhash::FxHashMap;
use loopbench_core::gc;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A host function callable from script expressions.
///
/// `evalexpr` passes arguments as a single value: `f()` receives
/// `Value::Empty`, `f(x)` receives `x`, and `f(a, b)` receives a tuple.
pub type NativeFn = Arc<dyn Fn(&Value) -> EvalexprResult<Value> + Send + Sync>;

/// Variables and functions visible to script code.
#[derive(Clone, Default)]
pub struct Scope {
    vars: FxHashMap<String, Value>,
    functions: FxHashMap<String, NativeFn>,
    builtins_disabled: bool,
}

impl Scope {
    /// An empty scope with no native functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope holding the standard native functions.
    pub fn with_prelude() -> Self {
        let mut scope = Self::new();
        scope.register_fn("range", range);
        scope.register_fn("seq", seq);
        scope.register_fn("mapping", mapping);
        scope.register_fn("get", get);
        scope.register_fn("len", len);
        scope.register_fn("sorted", sorted);
        scope.register_fn("shuffle", shuffle);
        scope.register_fn("sum", sum);
        scope
    }

    /// Make a native function available under `name`, replacing any previous one.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value) -> EvalexprResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Bind a variable. A replaced value is handed to the collector.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(old) = self.vars.insert(name.into(), value) {
            gc::dispose(old);
        }
    }

    /// Whether a native function called `name` is registered.
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Names of all bound variables, sorted.
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort_unstable();
        f.debug_struct("Scope")
            .field("vars", &self.vars)
            .field("functions", &functions)
            .finish()
    }
}

impl Context for Scope {
    fn get_value(&self, identifier: &str) -> Option<&Value> {
        self.vars.get(identifier)
    }

    fn call_function(&self, identifier: &str, argument: &Value) -> EvalexprResult<Value> {
        match self.functions.get(identifier) {
            Some(f) => f(argument),
            None => Err(EvalexprError::FunctionIdentifierNotFound(
                identifier.to_string(),
            )),
        }
    }

    fn are_builtin_functions_disabled(&self) -> bool {
        self.builtins_disabled
    }

    fn set_builtin_functions_disabled(&mut self, disabled: bool) -> EvalexprResult<()> {
        self.builtins_disabled = disabled;
        Ok(())
    }
}

impl ContextWithMutableVariables for Scope {
    fn set_value(&mut self, identifier: String, value: Value) -> EvalexprResult<()> {
        self.set(identifier, value);
        Ok(())
    }
}

/// Python-style truthiness of a script value.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Tuple(items) => !items.is_empty(),
        Value::Empty => false,
    }
}

fn fail<T>(message: impl Into<String>) -> EvalexprResult<T> {
    Err(EvalexprError::CustomMessage(message.into()))
}

// ─── Prelude ───

/// Arguments of a call as a slice: `f()` is empty, `f(x)` has one element.
fn arguments(argument: &Value) -> Vec<&Value> {
    match argument {
        Value::Empty => Vec::new(),
        Value::Tuple(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// The single sequence a function like `sum(xs)` operates on.
fn sequence<'v>(name: &str, argument: &'v Value) -> EvalexprResult<&'v [Value]> {
    match argument {
        Value::Tuple(items) => Ok(items),
        Value::Empty => Ok(&[]),
        other => fail(format!("{name}: expected a sequence, got {other}")),
    }
}

fn int_arg(name: &str, value: &Value) -> EvalexprResult<IntType> {
    match value {
        Value::Int(i) => Ok(*i),
        other => fail(format!("{name}: expected an integer, got {other}")),
    }
}

/// `range(stop)`, `range(start, stop)` or `range(start, stop, step)`
fn range(argument: &Value) -> EvalexprResult<Value> {
    let args = arguments(argument);
    let (start, stop, step) = match args.as_slice() {
        [stop] => (0, int_arg("range", stop)?, 1),
        [start, stop] => (int_arg("range", start)?, int_arg("range", stop)?, 1),
        [start, stop, step] => (
            int_arg("range", start)?,
            int_arg("range", stop)?,
            int_arg("range", step)?,
        ),
        _ => return fail("range: expected 1 to 3 integer arguments"),
    };
    if step == 0 {
        return fail("range: step must not be zero");
    }

    let mut items = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        items.push(Value::Int(i));
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Ok(Value::Tuple(items))
}

/// `seq(a, b, ...)` builds a sequence; `seq()` is empty and `seq(x)` holds one value.
fn seq(argument: &Value) -> EvalexprResult<Value> {
    Ok(match argument {
        Value::Empty => Value::Tuple(Vec::new()),
        Value::Tuple(items) => Value::Tuple(items.clone()),
        other => Value::Tuple(vec![other.clone()]),
    })
}

/// `mapping("k1", v1, "k2", v2, ...)` builds a sequence of `(key, value)` pairs.
fn mapping(argument: &Value) -> EvalexprResult<Value> {
    let args = arguments(argument);
    if args.len() % 2 != 0 {
        return fail("mapping: expected alternating keys and values");
    }
    let mut pairs = Vec::with_capacity(args.len() / 2);
    for pair in args.chunks(2) {
        match pair[0] {
            Value::String(_) => {
                pairs.push(Value::Tuple(vec![pair[0].clone(), pair[1].clone()]));
            }
            other => return fail(format!("mapping: keys must be strings, got {other}")),
        }
    }
    Ok(Value::Tuple(pairs))
}

/// `get(container, key)` or `get(container, key, default)`
///
/// Sequences are indexed by integer (negative counts from the end);
/// mappings are searched by string key.
fn get(argument: &Value) -> EvalexprResult<Value> {
    let args = arguments(argument);
    let (container, key, default) = match args.as_slice() {
        [c, k] => (*c, *k, None),
        [c, k, d] => (*c, *k, Some(*d)),
        _ => return fail("get: expected (container, key) or (container, key, default)"),
    };
    let items = sequence("get", container)?;

    let found = match key {
        Value::Int(i) => {
            let len = items.len() as IntType;
            let index = if *i < 0 { len + i } else { *i };
            (0..len).contains(&index).then(|| items[index as usize].clone())
        }
        Value::String(_) => items.iter().find_map(|item| match item {
            Value::Tuple(pair) if pair.len() == 2 && &pair[0] == key => Some(pair[1].clone()),
            _ => None,
        }),
        other => return fail(format!("get: unsupported key {other}")),
    };

    match (found, default) {
        (Some(value), _) => Ok(value),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => fail(format!("get: no entry for key {key}")),
    }
}

/// `len(seq)` or `len(string)`
fn len(argument: &Value) -> EvalexprResult<Value> {
    let n = match argument {
        Value::String(s) => s.chars().count(),
        other => sequence("len", other)?.len(),
    };
    Ok(Value::Int(n as IntType))
}

fn compare(a: &Value, b: &Value) -> EvalexprResult<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (x, y) => match (x.as_number(), y.as_number()) {
            (Ok(x), Ok(y)) => x
                .partial_cmp(&y)
                .ok_or_else(|| EvalexprError::CustomMessage("sorted: cannot order NaN".into())),
            _ => fail(format!("sorted: cannot compare {x} with {y}")),
        },
    }
}

/// `sorted(seq)` returns an ascending copy.
fn sorted(argument: &Value) -> EvalexprResult<Value> {
    let mut items = sequence("sorted", argument)?.to_vec();
    let mut error = None;
    items.sort_by(|a, b| {
        compare(a, b).unwrap_or_else(|e| {
            error.get_or_insert(e);
            Ordering::Equal
        })
    });
    match error {
        Some(e) => Err(e),
        None => Ok(Value::Tuple(items)),
    }
}

/// `shuffle(seq)` returns a randomly permuted copy.
fn shuffle(argument: &Value) -> EvalexprResult<Value> {
    let mut items = sequence("shuffle", argument)?.to_vec();
    items.shuffle(&mut rand::thread_rng());
    Ok(Value::Tuple(items))
}

/// `sum(seq)` adds numbers; the result is an integer unless a float is present.
fn sum(argument: &Value) -> EvalexprResult<Value> {
    let items = sequence("sum", argument)?;
    if items.iter().all(|v| matches!(v, Value::Int(_))) {
        let mut total: IntType = 0;
        for item in items {
            total = total.wrapping_add(int_arg("sum", item)?);
        }
        return Ok(Value::Int(total));
    }
    let mut total = 0.0;
    for item in items {
        total += item.as_number()?;
    }
    Ok(Value::Float(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalexpr::{build_operator_tree, eval_with_context_mut};

    fn eval(scope: &mut Scope, expr: &str) -> Value {
        eval_with_context_mut(expr, scope).unwrap()
    }

    fn ints(values: &[i64]) -> Value {
        Value::Tuple(values.iter().map(|&i| Value::Int(i)).collect())
    }

    #[test]
    fn test_assignment_chain() {
        let mut scope = Scope::with_prelude();
        eval(&mut scope, "x = 1; y = 2");
        assert_eq!(scope.get("x"), Some(&Value::Int(1)));
        assert_eq!(scope.get("y"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_range_forms() {
        let mut scope = Scope::with_prelude();
        assert_eq!(eval(&mut scope, "range(3)"), ints(&[0, 1, 2]));
        assert_eq!(eval(&mut scope, "range(2, 5)"), ints(&[2, 3, 4]));
        assert_eq!(eval(&mut scope, "range(5, 0, -2)"), ints(&[5, 3, 1]));
        assert!(eval_with_context_mut("range(1, 2, 0)", &mut scope).is_err());
    }

    #[test]
    fn test_range_stops_at_integer_bounds() {
        let mut scope = Scope::with_prelude();
        assert_eq!(
            eval(&mut scope, "range(9223372036854775806, 9223372036854775807, 2)"),
            ints(&[i64::MAX - 1])
        );
        scope.set("low", Value::Int(i64::MIN + 1));
        scope.set("bottom", Value::Int(i64::MIN));
        assert_eq!(eval(&mut scope, "range(low, bottom, -3)"), ints(&[i64::MIN + 1]));
    }

    #[test]
    fn test_seq_and_get() {
        let mut scope = Scope::with_prelude();
        assert_eq!(eval(&mut scope, "seq()"), Value::Tuple(vec![]));
        assert_eq!(eval(&mut scope, "seq(7)"), ints(&[7]));
        eval(&mut scope, "xs = seq(4, 5, 6)");
        assert_eq!(eval(&mut scope, "get(xs, 0)"), Value::Int(4));
        assert_eq!(eval(&mut scope, "get(xs, -1)"), Value::Int(6));
        assert_eq!(eval(&mut scope, "get(xs, 9, 0)"), Value::Int(0));
        assert_eq!(eval(&mut scope, "len(xs)"), Value::Int(3));
    }

    #[test]
    fn test_mapping_lookup() {
        let mut scope = Scope::with_prelude();
        eval(&mut scope, r#"m = mapping("a", 1, "b", 2.5)"#);
        assert_eq!(eval(&mut scope, r#"get(m, "b")"#), Value::Float(2.5));
        assert!(eval_with_context_mut(r#"get(m, "z")"#, &mut scope).is_err());
        assert!(eval_with_context_mut(r#"mapping("a")"#, &mut scope).is_err());
    }

    #[test]
    fn test_sorted_shuffle_sum() {
        let mut scope = Scope::with_prelude();
        eval(&mut scope, "xs = shuffle(range(50))");
        assert_eq!(eval(&mut scope, "len(xs)"), Value::Int(50));
        assert_eq!(eval(&mut scope, "sorted(xs)"), eval(&mut scope, "range(50)"));
        assert_eq!(eval(&mut scope, "sum(xs)"), Value::Int(1225));
        assert_eq!(eval(&mut scope, "sum(seq(1, 0.5))"), Value::Float(1.5));
        assert_eq!(eval(&mut scope, "sum(seq())"), Value::Int(0));
    }

    #[test]
    fn test_builtins_still_resolve() {
        let mut scope = Scope::with_prelude();
        assert_eq!(eval(&mut scope, "max(1, 4, 2)"), Value::Int(4));
    }

    #[test]
    fn test_host_function_registration() {
        let mut scope = Scope::new();
        scope.register_fn("double", |v: &Value| Ok(Value::Int(v.as_int()? * 2)));
        let node = build_operator_tree("double(21)").unwrap();
        assert_eq!(node.eval_with_context_mut(&mut scope).unwrap(), Value::Int(42));
        assert!(scope.has_function("double"));
        assert!(!scope.has_function("range"));
    }

    #[test]
    fn test_overwritten_values_go_through_collector() {
        let _guard = gc::CollectorGuard::acquire(false);
        let mut scope = Scope::new();
        let before = gc::pending();
        scope.set("x", Value::String("first".into()));
        scope.set("x", Value::String("second".into()));
        assert!(gc::pending() >= before + 1);
        assert_eq!(scope.get("x"), Some(&Value::String("second".into())));
    }

    #[test]
    fn test_truthiness() {
        assert!(truthy(&Value::Int(3)));
        assert!(!truthy(&Value::Float(0.0)));
        assert!(!truthy(&Value::Tuple(vec![])));
        assert!(truthy(&Value::String("x".into())));
        assert!(!truthy(&Value::Empty));
    }
}
