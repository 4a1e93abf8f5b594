//! Validation reports
//!
//! Evaluation never fails: every problem found in the input becomes a
//! [`ValidationIssue`] filed under the dot path of the field it concerns.
//! Issue codes are symbolic (`not_found`, `iterable_max`, `not_email`, ...),
//! never localized text.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Symbolic codes for structural issues.
pub mod codes {
    /// Required field missing from the input.
    pub const NOT_FOUND: &str = "not_found";
    /// Iterable field is not an array.
    pub const ITERABLE: &str = "iterable";
    /// Array shorter than `min`.
    pub const ITERABLE_MIN: &str = "iterable_min";
    /// Array longer than `max`.
    pub const ITERABLE_MAX: &str = "iterable_max";
    /// Array holds a repeated element under `unique`.
    pub const ITERABLE_UNIQUE: &str = "iterable_unique";
    /// Rule name not present in the predicate store.
    pub const RULE_NOT_FOUND: &str = "rule_not_found";
    /// Input is not a key-value record.
    pub const NO_DATA: &str = "NO_DATA";
}

// ============================================================================
// ISSUE
// ============================================================================

/// One failed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Element index for per-element failures of iterable fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idx: Option<usize>,

    /// Issue code: the rule name, `not_<rule>` for a failed negation, or one
    /// of [`codes`].
    pub msg: Cow<'static, str>,

    /// Parameter values as resolved at evaluation time; `None` marks an
    /// unresolved reference.
    pub params: Vec<Option<Value>>,
}

impl ValidationIssue {
    /// Creates an issue with no parameters.
    pub fn new(msg: impl Into<Cow<'static, str>>) -> Self {
        Self {
            idx: None,
            msg: msg.into(),
            params: Vec::new(),
        }
    }

    /// Sets the resolved parameters.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_params(mut self, params: Vec<Option<Value>>) -> Self {
        self.params = params;
        self
    }

    /// Sets the element index.
    #[must_use = "builder methods must be chained or built"]
    pub fn at(mut self, idx: usize) -> Self {
        self.idx = Some(idx);
        self
    }

    /// Creates a "not_found" issue.
    pub fn not_found() -> Self {
        Self::new(codes::NOT_FOUND)
    }

    /// Creates an "iterable" issue.
    pub fn not_iterable() -> Self {
        Self::new(codes::ITERABLE)
    }

    /// Creates an "iterable_min" issue.
    pub fn iterable_min(min: usize) -> Self {
        Self::new(codes::ITERABLE_MIN).with_params(vec![Some(Value::from(min))])
    }

    /// Creates an "iterable_max" issue.
    pub fn iterable_max(max: usize) -> Self {
        Self::new(codes::ITERABLE_MAX).with_params(vec![Some(Value::from(max))])
    }

    /// Creates an "iterable_unique" issue.
    pub fn iterable_unique() -> Self {
        Self::new(codes::ITERABLE_UNIQUE)
    }

    /// Creates a "rule_not_found" issue naming the missing rule.
    pub fn rule_not_found(name: &str) -> Self {
        Self::new(codes::RULE_NOT_FOUND).with_params(vec![Some(Value::from(name))])
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Issues keyed by full dot path, in plan order.
pub type FieldErrors = IndexMap<String, Vec<ValidationIssue>>;

/// Error payload of a [`ValidationReport`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReportErrors {
    /// The input was not a key-value record and the plan had fields.
    NoData,
    /// Per-field issues; only paths with at least one issue are present.
    Fields(FieldErrors),
}

impl Serialize for ReportErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::NoData => serializer.serialize_str(codes::NO_DATA),
            Self::Fields(fields) => fields.serialize(serializer),
        }
    }
}

/// Outcome of a full validation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    is_valid: bool,
    errors: ReportErrors,
}

impl ValidationReport {
    /// Report for input that is not a record.
    pub(crate) fn no_data(plan_is_empty: bool) -> Self {
        Self {
            is_valid: plan_is_empty,
            errors: if plan_is_empty {
                ReportErrors::Fields(FieldErrors::new())
            } else {
                ReportErrors::NoData
            },
        }
    }

    /// Report built from collected field issues.
    pub(crate) fn from_fields(fields: FieldErrors) -> Self {
        Self {
            is_valid: fields.is_empty(),
            errors: ReportErrors::Fields(fields),
        }
    }

    /// True if no issue was found.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// The error payload.
    pub fn errors(&self) -> &ReportErrors {
        &self.errors
    }

    /// True if the input was rejected as a whole for not being a record.
    pub fn is_no_data(&self) -> bool {
        matches!(self.errors, ReportErrors::NoData)
    }

    /// Issues recorded for `path`; empty if there are none.
    pub fn errors_at(&self, path: &str) -> &[ValidationIssue] {
        match &self.errors {
            ReportErrors::Fields(fields) => {
                fields.get(path).map(Vec::as_slice).unwrap_or_default()
            }
            ReportErrors::NoData => &[],
        }
    }

    /// Per-field issues, `None` for a no-data report.
    pub fn fields(&self) -> Option<&FieldErrors> {
        match &self.errors {
            ReportErrors::Fields(fields) => Some(fields),
            ReportErrors::NoData => None,
        }
    }

    /// Renders the issues as JSON nested along the dot paths.
    ///
    /// `{"address.street": [...]}` becomes `{"address": {"street": [...]}}`.
    /// Shorter paths are placed first; a path whose prefix already holds an
    /// issue list is kept under its full dotted key.
    ///
    /// # Examples
    ///
    /// ```
    /// use nebula_rules::Validator;
    /// use serde_json::json;
    ///
    /// let validator = Validator::new(&json!({"address": {"street": "string"}})).unwrap();
    /// let report = validator.validate(&json!({"address": {}}));
    /// assert_eq!(
    ///     report.to_nested(),
    ///     json!({"address": {"street": [{"msg": "not_found", "params": []}]}})
    /// );
    /// ```
    pub fn to_nested(&self) -> Value {
        let fields = match &self.errors {
            ReportErrors::NoData => return Value::String(codes::NO_DATA.to_owned()),
            ReportErrors::Fields(fields) => fields,
        };

        let mut ordered: Vec<_> = fields.iter().collect();
        ordered.sort_by_key(|(path, _)| path.matches('.').count());

        let mut root = Map::new();
        for (path, issues) in ordered {
            let issues = serde_json::to_value(issues).unwrap_or(Value::Null);
            if let Err(issues) = insert_nested(&mut root, path, issues) {
                root.insert(path.clone(), issues);
            }
        }
        Value::Object(root)
    }
}

/// Places `issues` at `path`, handing them back if a prefix is occupied by a
/// non-object.
fn insert_nested(root: &mut Map<String, Value>, path: &str, issues: Value) -> Result<(), Value> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return Err(issues);
    };

    let mut cursor = root;
    for segment in segments {
        let slot = cursor
            .entry(segment)
            .or_insert_with(|| Value::Object(Map::new()));
        match slot {
            Value::Object(next) => cursor = next,
            _ => return Err(issues),
        }
    }

    match cursor.get_mut(last) {
        Some(Value::Array(existing)) => {
            if let Value::Array(more) = issues {
                existing.extend(more);
            }
        }
        Some(_) => return Err(issues),
        None => {
            cursor.insert(last.to_owned(), issues);
        }
    }
    Ok(())
}
