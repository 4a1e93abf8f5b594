//! Helpers over `serde_json::Value` shared by the compiler, the store and
//! the evaluator.

use serde_json::{Number, Value};

/// JSON type name, used in construction errors.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `f64` view of a number, falling back to its integer representations.
#[inline]
pub fn number_as_f64(num: &Number) -> Option<f64> {
    num.as_f64()
        .or_else(|| num.as_i64().map(|i| i as f64))
        .or_else(|| num.as_u64().map(|u| u as f64))
}

/// True if the number has no fractional part (`3` and `3.0`, not `2.2`).
pub fn is_integral(num: &Number) -> bool {
    if num.is_i64() || num.is_u64() {
        return true;
    }
    num.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

/// Coerce a predicate argument into a finite number.
///
/// Rule parameters are compiled as literal strings, so `min:5` arrives as
/// `"5"`; references may resolve to real numbers. Anything else is `None`.
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let f = match value? {
        Value::Number(n) => number_as_f64(n)?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

/// Structural equality between two values.
///
/// Numbers compare by value (`2` equals `2.0`), objects compare by key set
/// regardless of insertion order.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| structurally_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, l)| y.get(k).is_some_and(|r| structurally_equal(l, r)))
        }
        _ => false,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(l), Some(r)) = (x.as_i64(), y.as_i64()) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (x.as_u64(), y.as_u64()) {
        return l == r;
    }
    match (number_as_f64(x), number_as_f64(y)) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

/// Length used by size-style predicates: characters for strings, elements
/// for arrays, entries for objects.
pub fn measure(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        Value::Object(o) => Some(o.len()),
        _ => None,
    }
}
