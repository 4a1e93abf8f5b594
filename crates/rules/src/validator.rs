//! The `Validator` value object

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::compile::Plan;
use crate::error::ConfigResult;
use crate::eval::Evaluator;
use crate::report::ValidationReport;
use crate::store::{PredicateStore, RuleStore};

/// A compiled rule specification bound to a predicate store.
///
/// The plan is built once and never changes, so a `Validator` can be shared
/// across threads and reused for any number of inputs.
///
/// # Examples
///
/// ```
/// use nebula_rules::Validator;
/// use serde_json::json;
///
/// let validator = Validator::new(&json!({
///     "name": "string_ne|min:2",
///     "tags": "?[unique|max:5]alpha_num_spaces",
///     "password_confirm": "equal_to:<password>",
/// }))
/// .unwrap();
///
/// let input = json!({
///     "name": "Ada",
///     "tags": ["math", "engines"],
///     "password": "hunter2",
///     "password_confirm": "hunter2",
/// });
/// assert!(validator.check(&input));
///
/// let report = validator.validate(&json!({
///     "name": "A",
///     "tags": ["x", "x"],
///     "password": "hunter2",
///     "password_confirm": "hunter3",
/// }));
/// assert!(!report.is_valid());
/// assert_eq!(report.errors_at("name")[0].msg, "min");
/// assert_eq!(report.errors_at("tags")[0].msg, "iterable_unique");
/// assert_eq!(report.errors_at("password_confirm")[0].msg, "equal_to");
/// ```
#[derive(Clone)]
pub struct Validator {
    plan: Plan,
    store: Arc<dyn PredicateStore>,
}

impl Validator {
    /// Compiles `spec` against the global rule store.
    pub fn new(spec: &Value) -> ConfigResult<Self> {
        Self::with_store(spec, RuleStore::global())
    }

    /// Compiles `spec` against an explicit predicate store.
    pub fn with_store(spec: &Value, store: Arc<dyn PredicateStore>) -> ConfigResult<Self> {
        let plan = Plan::build(spec)?;
        Ok(Self { plan, store })
    }

    /// Wraps an already built plan.
    pub fn from_plan(plan: Plan, store: Arc<dyn PredicateStore>) -> Self {
        Self { plan, store }
    }

    /// The compiled plan.
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Returns whether `data` passes, stopping at the first failure.
    pub fn check(&self, data: &Value) -> bool {
        self.evaluator().check(&self.plan, data)
    }

    /// Evaluates every field and returns all issues found.
    pub fn validate(&self, data: &Value) -> ValidationReport {
        self.evaluator().validate(&self.plan, data)
    }

    fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(self.store.as_ref())
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}
