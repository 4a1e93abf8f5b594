//! Dot-path resolution

use serde_json::Value;

/// Resolves a dot-delimited path against a record.
///
/// Every step must land on an object; anything else (including arrays)
/// resolves to `None`. A present key holding `null` resolves to
/// `Some(&Value::Null)`, which is distinct from absent.
///
/// # Examples
///
/// ```
/// use nebula_rules::eval::path::lookup;
/// use serde_json::json;
///
/// let data = json!({"user": {"name": "Ada", "nick": null}});
/// assert_eq!(lookup(&data, "user.name"), Some(&json!("Ada")));
/// assert_eq!(lookup(&data, "user.nick"), Some(&json!(null)));
/// assert_eq!(lookup(&data, "user.age"), None);
/// ```
pub fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(data, |cursor, segment| cursor.as_object()?.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_keys() {
        let data = json!({"a": {"b": {"c": 3}}});
        assert_eq!(lookup(&data, "a.b.c"), Some(&json!(3)));
        assert_eq!(lookup(&data, "a.b"), Some(&json!({"c": 3})));
    }

    #[test]
    fn null_is_not_absent() {
        let data = json!({"a": null});
        assert_eq!(lookup(&data, "a"), Some(&Value::Null));
        assert_eq!(lookup(&data, "a.b"), None);
    }

    #[test]
    fn arrays_are_not_records() {
        let data = json!({"list": [{"x": 1}]});
        assert_eq!(lookup(&data, "list.0.x"), None);
        assert_eq!(lookup(&json!([1, 2]), "0"), None);
    }

    #[test]
    fn scalars_stop_descent() {
        let data = json!({"a": "text"});
        assert_eq!(lookup(&data, "a.len"), None);
        assert_eq!(lookup(&data, "missing"), None);
    }
}
