//! Validation plan builder
//!
//! Flattens a (possibly nested) rule specification into an ordered list of
//! [`FieldPlan`]s keyed by full dot path.

use serde_json::{Map, Value};
use tracing::debug;

use super::rule::{RuleGroup, compile};
use crate::error::{ConfigError, ConfigResult};
use crate::value::value_type_name;

/// One compiled field: its dot path plus the compiled rule group.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    /// Dot-delimited field path, e.g. `address.street`.
    pub key: String,
    /// Compiled rules for the field.
    pub group: RuleGroup,
}

/// An immutable, ordered list of compiled field plans.
///
/// Paths are not deduplicated: two plans for the same path are evaluated
/// independently and their errors merge in the report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    fields: Vec<FieldPlan>,
}

impl Plan {
    /// Builds a plan from a rule specification.
    ///
    /// The specification must be a JSON object whose leaves are non-blank
    /// rule strings or nested objects.
    ///
    /// # Examples
    ///
    /// ```
    /// use nebula_rules::compile::Plan;
    /// use serde_json::json;
    ///
    /// let plan = Plan::build(&json!({
    ///     "name": "string_ne",
    ///     "address": { "street": "string", "zip": "?integer" },
    /// }))
    /// .unwrap();
    ///
    /// let keys: Vec<_> = plan.iter().map(|f| f.key.as_str()).collect();
    /// assert_eq!(keys, ["name", "address.street", "address.zip"]);
    /// ```
    pub fn build(spec: &Value) -> ConfigResult<Self> {
        let Value::Object(map) = spec else {
            return Err(ConfigError::InvalidSpec {
                found: value_type_name(spec),
            });
        };

        let mut fields = Vec::new();
        flatten(map, "", &mut fields)?;

        debug!(fields = fields.len(), "compiled validation plan");
        Ok(Self { fields })
    }

    /// Number of field plans.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the plan has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates field plans in evaluation order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldPlan> {
        self.fields.iter()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a FieldPlan;
    type IntoIter = std::slice::Iter<'a, FieldPlan>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn flatten(map: &Map<String, Value>, parent: &str, out: &mut Vec<FieldPlan>) -> ConfigResult<()> {
    for (key, value) in map {
        let path = if parent.is_empty() {
            key.clone()
        } else {
            format!("{parent}.{key}")
        };

        match value {
            Value::Object(nested) => flatten(nested, &path, out)?,
            Value::String(raw) if !raw.trim().is_empty() => {
                let group = compile(raw)?;
                out.push(FieldPlan { key: path, group });
            }
            _ => return Err(ConfigError::InvalidRule { key: path }),
        }
    }
    Ok(())
}
