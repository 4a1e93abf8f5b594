//! Built-in predicates
//!
//! The predicate set every [`RuleStore::new`](super::RuleStore::new) starts
//! with, organized by category. All of them are plain functions and can be
//! overwritten through the store's `extend*` methods.
//!
//! Numeric parameters are coerced from numbers or numeric strings; a
//! parameter that cannot be coerced (including an absent one) makes the
//! predicate fail.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use serde_json::Value;

use super::{Args, Predicate};
use crate::value::{coerce_number, is_integral, measure, number_as_f64, structurally_equal};

static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap()
});

static URL_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap());

static GUID_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

type PredicateFn = fn(&Value, &Args<'_>) -> bool;

/// Inserts every built-in predicate into `predicates`.
pub(crate) fn register_all(predicates: &mut HashMap<String, Predicate>) {
    register_type_rules(predicates);
    register_content_rules(predicates);
    register_comparison_rules(predicates);
}

fn insert(predicates: &mut HashMap<String, Predicate>, name: &str, f: PredicateFn) {
    predicates.insert(name.to_owned(), Arc::new(f));
}

fn register_type_rules(p: &mut HashMap<String, Predicate>) {
    insert(p, "string", string);
    insert(p, "string_ne", string_ne);
    insert(p, "number", number);
    insert(p, "integer", integer);
    insert(p, "boolean", boolean);
    insert(p, "array", array);
    insert(p, "array_ne", array_ne);
    insert(p, "object", object);
    insert(p, "object_ne", object_ne);
    insert(p, "null", null);
}

fn register_content_rules(p: &mut HashMap<String, Predicate>) {
    insert(p, "alpha", alpha);
    insert(p, "alpha_num", alpha_num);
    insert(p, "alpha_num_spaces", alpha_num_spaces);
    insert(p, "email", email);
    insert(p, "url", url);
    insert(p, "guid", guid);
}

fn register_comparison_rules(p: &mut HashMap<String, Predicate>) {
    insert(p, "min", min);
    insert(p, "max", max);
    insert(p, "between", between);
    insert(p, "greater_than", greater_than);
    insert(p, "less_than", less_than);
    insert(p, "size", size);
    insert(p, "equal_to", equal_to);
    insert(p, "in", one_of);
}

// ============================================================================
// TYPES
// ============================================================================

fn string(value: &Value, _: &Args<'_>) -> bool {
    value.is_string()
}

fn string_ne(value: &Value, _: &Args<'_>) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}

fn number(value: &Value, _: &Args<'_>) -> bool {
    value.as_number().and_then(number_as_f64).is_some_and(f64::is_finite)
}

fn integer(value: &Value, _: &Args<'_>) -> bool {
    value.as_number().is_some_and(is_integral)
}

fn boolean(value: &Value, _: &Args<'_>) -> bool {
    value.is_boolean()
}

fn array(value: &Value, _: &Args<'_>) -> bool {
    value.is_array()
}

fn array_ne(value: &Value, _: &Args<'_>) -> bool {
    value.as_array().is_some_and(|a| !a.is_empty())
}

fn object(value: &Value, _: &Args<'_>) -> bool {
    value.is_object()
}

fn object_ne(value: &Value, _: &Args<'_>) -> bool {
    value.as_object().is_some_and(|o| !o.is_empty())
}

fn null(value: &Value, _: &Args<'_>) -> bool {
    value.is_null()
}

// ============================================================================
// CONTENT
// ============================================================================

fn alpha(value: &Value, _: &Args<'_>) -> bool {
    value
        .as_str()
        .is_some_and(|s| !s.is_empty() && s.chars().all(char::is_alphabetic))
}

fn alpha_num(value: &Value, _: &Args<'_>) -> bool {
    value
        .as_str()
        .is_some_and(|s| !s.is_empty() && s.chars().all(char::is_alphanumeric))
}

fn alpha_num_spaces(value: &Value, _: &Args<'_>) -> bool {
    value.as_str().is_some_and(|s| {
        !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == ' ')
    })
}

fn email(value: &Value, _: &Args<'_>) -> bool {
    value.as_str().is_some_and(|s| EMAIL_REGEX.is_match(s))
}

fn url(value: &Value, _: &Args<'_>) -> bool {
    value.as_str().is_some_and(|s| URL_REGEX.is_match(s))
}

fn guid(value: &Value, _: &Args<'_>) -> bool {
    value.as_str().is_some_and(|s| GUID_REGEX.is_match(s))
}

// ============================================================================
// COMPARISON
// ============================================================================

/// Magnitude compared by `min`/`max`/`between`: numbers by value, strings
/// by character count, arrays by length.
fn magnitude(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => number_as_f64(n),
        Value::String(_) | Value::Array(_) => measure(value).map(|len| len as f64),
        _ => None,
    }
}

fn min(value: &Value, args: &Args<'_>) -> bool {
    match (magnitude(value), coerce_number(args.get(0))) {
        (Some(v), Some(bound)) => v >= bound,
        _ => false,
    }
}

fn max(value: &Value, args: &Args<'_>) -> bool {
    match (magnitude(value), coerce_number(args.get(0))) {
        (Some(v), Some(bound)) => v <= bound,
        _ => false,
    }
}

fn between(value: &Value, args: &Args<'_>) -> bool {
    match (
        magnitude(value),
        coerce_number(args.get(0)),
        coerce_number(args.get(1)),
    ) {
        (Some(v), Some(low), Some(high)) => low <= v && v <= high,
        _ => false,
    }
}

fn greater_than(value: &Value, args: &Args<'_>) -> bool {
    match (value.as_number().and_then(number_as_f64), coerce_number(args.get(0))) {
        (Some(v), Some(bound)) => v > bound,
        _ => false,
    }
}

fn less_than(value: &Value, args: &Args<'_>) -> bool {
    match (value.as_number().and_then(number_as_f64), coerce_number(args.get(0))) {
        (Some(v), Some(bound)) => v < bound,
        _ => false,
    }
}

fn size(value: &Value, args: &Args<'_>) -> bool {
    match (measure(value), coerce_number(args.get(0))) {
        (Some(len), Some(expected)) => len as f64 == expected,
        _ => false,
    }
}

fn equal_to(value: &Value, args: &Args<'_>) -> bool {
    args.get(0).is_some_and(|other| structurally_equal(value, other))
}

fn one_of(value: &Value, args: &Args<'_>) -> bool {
    let Some(members) = args.get(0) else {
        return false;
    };
    match members {
        Value::Array(members) => members.iter().any(|m| member_matches(value, m)),
        scalar => member_matches(value, scalar),
    }
}

/// Rule literals are strings, so a numeric value also matches a member that
/// parses to the same number.
fn member_matches(value: &Value, member: &Value) -> bool {
    if structurally_equal(value, member) {
        return true;
    }
    match (value, member) {
        (Value::Number(n), Value::String(_)) => {
            number_as_f64(n).is_some_and(|v| coerce_number(Some(member)) == Some(v))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn call(name: &str, value: Value, params: &[Value]) -> bool {
        let mut predicates = HashMap::new();
        register_all(&mut predicates);
        let predicate = &predicates[name];
        let args = Args::new(params.iter().map(Some));
        predicate(&value, &args)
    }

    #[rstest]
    #[case("string", json!("x"), true)]
    #[case("string", json!(1), false)]
    #[case("string_ne", json!("  "), false)]
    #[case("number", json!(1.5), true)]
    #[case("number", json!("1.5"), false)]
    #[case("integer", json!(2), true)]
    #[case("integer", json!(2.2), false)]
    #[case("integer", json!("a"), false)]
    #[case("boolean", json!(false), true)]
    #[case("array_ne", json!([]), false)]
    #[case("object_ne", json!({"a": 1}), true)]
    #[case("null", json!(null), true)]
    #[case("alpha", json!("abc"), true)]
    #[case("alpha", json!("ab1"), false)]
    #[case("alpha_num_spaces", json!("John Doe 3"), true)]
    #[case("alpha_num_spaces", json!("John-Doe"), false)]
    #[case("email", json!("dev@example.com"), true)]
    #[case("email", json!("dev.example.com"), false)]
    #[case("url", json!("https://example.com/path"), true)]
    #[case("guid", json!("123e4567-e89b-12d3-a456-426614174000"), true)]
    #[case("guid", json!("123e4567"), false)]
    fn unary_predicates(#[case] name: &str, #[case] value: Value, #[case] expected: bool) {
        assert_eq!(call(name, value, &[]), expected);
    }

    #[rstest]
    #[case("min", json!(5), &[json!("5")], true)]
    #[case("min", json!(4.9), &[json!("5")], false)]
    #[case("min", json!("ab"), &[json!("2")], true)]
    #[case("max", json!([1, 2, 3]), &[json!(2)], false)]
    #[case("between", json!(7), &[json!("5"), json!("10")], true)]
    #[case("between", json!(7), &[json!("5")], false)]
    #[case("greater_than", json!(3), &[json!("2")], true)]
    #[case("less_than", json!("1"), &[json!("2")], false)]
    #[case("size", json!("abc"), &[json!("3")], true)]
    #[case("min", json!(5), &[json!("five")], false)]
    fn comparison_predicates(
        #[case] name: &str,
        #[case] value: Value,
        #[case] params: &[Value],
        #[case] expected: bool,
    ) {
        assert_eq!(call(name, value, params), expected);
    }

    #[test]
    fn equal_to_is_structural() {
        assert!(call("equal_to", json!({"a": [1]}), &[json!({"a": [1.0]})]));
        assert!(!call("equal_to", json!("hello"), &[]));
    }

    #[test]
    fn in_accepts_lists_and_scalars() {
        assert!(call("in", json!("b"), &[json!(["a", "b", "c"])]));
        assert!(!call("in", json!("d"), &[json!(["a", "b", "c"])]));
        assert!(call("in", json!(2), &[json!(["1", "2"])]));
        assert!(call("in", json!("a"), &[json!("a")]));
        assert!(!call("in", json!("a"), &[]));
    }
}
