//! Evaluation engine
//!
//! Walks a compiled [`Plan`] against an input record. Two modes share the
//! same field logic:
//!
//! - [`Evaluator::check`] answers yes/no and stops at the first failure.
//! - [`Evaluator::validate`] evaluates every field and collects every issue.
//!
//! `check(plan, data) == validate(plan, data).is_valid()` holds for any plan
//! and input.

pub mod path;
pub mod unique;

use serde_json::Value;
use tracing::{debug, trace};

use crate::compile::{FieldPlan, IterableSpec, Plan, RuleInvocation};
use crate::report::{FieldErrors, ValidationIssue, ValidationReport};
use crate::store::{Args, PredicateStore};
use unique::UniqueTracker;

/// Result of applying one invocation to one value.
enum Outcome<'a> {
    Pass,
    Fail(Args<'a>),
    RuleNotFound,
}

/// Evaluates plans against input using a predicate store.
#[derive(Clone, Copy)]
pub struct Evaluator<'s> {
    store: &'s dyn PredicateStore,
}

impl<'s> Evaluator<'s> {
    /// Creates an evaluator reading predicates from `store`.
    pub fn new(store: &'s dyn PredicateStore) -> Self {
        Self { store }
    }

    // ========================================================================
    // FAST CHECK
    // ========================================================================

    /// Returns whether `data` satisfies `plan`, stopping at the first failure.
    ///
    /// Input that is not an object is valid only against an empty plan.
    pub fn check(&self, plan: &Plan, data: &Value) -> bool {
        if !data.is_object() {
            return plan.is_empty();
        }
        plan.iter().all(|field| self.check_field(field, data))
    }

    fn check_field(&self, field: &FieldPlan, data: &Value) -> bool {
        let group = &field.group;
        let Some(value) = path::lookup(data, &field.key) else {
            trace!(field = %field.key, sometimes = group.sometimes, "field not found");
            return group.sometimes;
        };

        let Some(spec) = group.iterable else {
            return self.check_rules(&field.key, &group.list, value, data);
        };
        let Some(items) = value.as_array() else {
            trace!(field = %field.key, "iterable field is not an array");
            return false;
        };
        if let Some(issue) = length_violation(spec, items.len()) {
            trace!(field = %field.key, code = %issue.msg, len = items.len(), "short-circuit on length");
            return false;
        }

        let mut tracker = spec.unique.then(UniqueTracker::new);
        items.iter().enumerate().all(|(idx, item)| {
            if tracker.as_mut().is_some_and(|seen| !seen.insert(item)) {
                trace!(field = %field.key, idx, "short-circuit on duplicate element");
                return false;
            }
            self.check_rules(&field.key, &group.list, item, data)
        })
    }

    fn check_rules(&self, key: &str, list: &[RuleInvocation], value: &Value, data: &Value) -> bool {
        list.iter().all(|rule| {
            let passed = matches!(self.invoke(rule, value, data), Outcome::Pass);
            if !passed {
                trace!(field = key, rule = %rule.name, negated = rule.negated, "short-circuit on rule");
            }
            passed
        })
    }

    // ========================================================================
    // FULL VALIDATE
    // ========================================================================

    /// Evaluates every field of `plan` against `data` and collects all issues.
    pub fn validate(&self, plan: &Plan, data: &Value) -> ValidationReport {
        if !data.is_object() {
            return ValidationReport::no_data(plan.is_empty());
        }

        let mut fields = FieldErrors::new();
        for field in plan {
            let issues = self.validate_field(field, data);
            if !issues.is_empty() {
                fields.entry(field.key.clone()).or_default().extend(issues);
            }
        }
        ValidationReport::from_fields(fields)
    }

    fn validate_field(&self, field: &FieldPlan, data: &Value) -> Vec<ValidationIssue> {
        let group = &field.group;
        let Some(value) = path::lookup(data, &field.key) else {
            if group.sometimes {
                trace!(field = %field.key, "optional field absent, skipping");
                return Vec::new();
            }
            return vec![ValidationIssue::not_found()];
        };

        let mut issues = Vec::new();
        let Some(spec) = group.iterable else {
            self.collect(&group.list, value, data, None, &mut issues);
            return issues;
        };

        let Some(items) = value.as_array() else {
            return vec![ValidationIssue::not_iterable()];
        };
        // Length violations suppress element diagnostics entirely.
        if let Some(issue) = length_violation(spec, items.len()) {
            return vec![issue];
        }

        for (idx, item) in items.iter().enumerate() {
            self.collect(&group.list, item, data, Some(idx), &mut issues);
        }
        if spec.unique && has_duplicate(items) {
            issues.insert(0, ValidationIssue::iterable_unique());
        }
        issues
    }

    fn collect(
        &self,
        list: &[RuleInvocation],
        value: &Value,
        data: &Value,
        idx: Option<usize>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for rule in list {
            let issue = match self.invoke(rule, value, data) {
                Outcome::Pass => continue,
                Outcome::Fail(args) => {
                    ValidationIssue::new(rule.failure_code()).with_params(args.to_params())
                }
                Outcome::RuleNotFound => ValidationIssue::rule_not_found(&rule.name),
            };
            issues.push(match idx {
                Some(idx) => issue.at(idx),
                None => issue,
            });
        }
    }

    // ========================================================================
    // INVOCATION
    // ========================================================================

    /// Applies one invocation. References resolve against the whole record
    /// on every call.
    fn invoke<'a>(&self, rule: &'a RuleInvocation, value: &Value, data: &'a Value) -> Outcome<'a> {
        let Some(predicate) = self.store.get(&rule.name) else {
            debug!(rule = %rule.name, "rule not found in store");
            return Outcome::RuleNotFound;
        };

        let args = Args::new(rule.params.iter().map(|param| param.resolve(data)));
        if predicate(value, &args) == rule.negated {
            Outcome::Fail(args)
        } else {
            Outcome::Pass
        }
    }
}

/// The bound an array of `len` elements breaks, if any.
fn length_violation(spec: IterableSpec, len: usize) -> Option<ValidationIssue> {
    match (spec.min, spec.max) {
        (Some(min), _) if len < min => Some(ValidationIssue::iterable_min(min)),
        (_, Some(max)) if len > max => Some(ValidationIssue::iterable_max(max)),
        _ => None,
    }
}

fn has_duplicate(items: &[Value]) -> bool {
    let mut tracker = UniqueTracker::new();
    items.iter().any(|item| !tracker.insert(item))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::RuleStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store() -> RuleStore {
        let store = RuleStore::empty();
        store.extend("number", |v, _| v.is_number()).unwrap();
        store.extend("string", |v, _| v.is_string()).unwrap();
        store
            .extend("equal_to", |v, args| args.get(0) == Some(v))
            .unwrap();
        store
    }

    fn plan(spec: Value) -> Plan {
        Plan::build(&spec).unwrap()
    }

    fn errors(store: &RuleStore, spec: Value, data: Value) -> Value {
        let report = Evaluator::new(store).validate(&plan(spec), &data);
        serde_json::to_value(report.errors()).unwrap()
    }

    #[test]
    fn missing_required_field() {
        let store = store();
        assert_eq!(
            errors(&store, json!({"a": "number"}), json!({})),
            json!({"a": [{"msg": "not_found", "params": []}]})
        );
    }

    #[test]
    fn missing_optional_field_has_no_entry() {
        let store = store();
        let report = Evaluator::new(&store).validate(&plan(json!({"a": "?number"})), &json!({}));
        assert!(report.is_valid());
        assert!(report.fields().unwrap().get("a").is_none());
    }

    #[test]
    fn present_null_is_evaluated() {
        let store = store();
        assert_eq!(
            errors(&store, json!({"a": "?number"}), json!({"a": null})),
            json!({"a": [{"msg": "number", "params": []}]})
        );
    }

    #[test]
    fn unknown_rule_does_not_stop_the_group() {
        let store = store();
        assert_eq!(
            errors(&store, json!({"a": "nope|string"}), json!({"a": 1})),
            json!({"a": [
                {"msg": "rule_not_found", "params": ["nope"]},
                {"msg": "string", "params": []},
            ]})
        );
        let evaluator = Evaluator::new(&store);
        assert!(!evaluator.check(&plan(json!({"a": "nope"})), &json!({"a": 1})));
    }

    #[test]
    fn negation_reports_not_code() {
        let store = store();
        assert_eq!(
            errors(&store, json!({"a": "!number"}), json!({"a": 4})),
            json!({"a": [{"msg": "not_number", "params": []}]})
        );
        assert_eq!(
            errors(&store, json!({"a": "!number"}), json!({"a": "x"})),
            json!({})
        );
    }

    #[test]
    fn references_resolve_against_the_root_record() {
        let store = store();
        let spec = json!({"list": "[]equal_to:<target>"});
        assert_eq!(
            errors(&store, spec, json!({"list": [1, 2], "target": 1})),
            json!({"list": [{"idx": 1, "msg": "equal_to", "params": [1]}]})
        );
    }

    #[test]
    fn duplicate_paths_merge() {
        let store = store();
        let plan = Plan::build(&json!({"x": {"y": "string"}, "x.y": "number"})).unwrap();
        let report = Evaluator::new(&store).validate(&plan, &json!({"x": {"y": true}}));
        let codes: Vec<_> = report.errors_at("x.y").iter().map(|i| i.msg.as_ref()).collect();
        assert_eq!(codes, ["string", "number"]);
    }

    #[test]
    fn non_record_input() {
        let store = store();
        let evaluator = Evaluator::new(&store);
        let empty = Plan::default();
        let plan = plan(json!({"a": "number"}));

        for data in [json!(null), json!([1]), json!("x")] {
            assert!(evaluator.check(&empty, &data));
            assert!(evaluator.validate(&empty, &data).is_valid());
            assert!(!evaluator.check(&plan, &data));
            assert!(evaluator.validate(&plan, &data).is_no_data());
        }
    }

    #[test]
    fn check_short_circuits() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let store = RuleStore::empty();
        let counter = Arc::clone(&calls);
        store
            .extend("counted_fail", move |_, _| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                false
            })
            .unwrap();

        let plan = plan(json!({"a": "[]counted_fail", "b": "counted_fail"}));
        let data = json!({"a": [1, 2, 3], "b": 1});
        assert!(!Evaluator::new(&store).check(&plan, &data));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        Evaluator::new(&store).validate(&plan, &data);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 5);
    }

    /// Runs `f` with a TRACE subscriber and returns what it logged.
    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || LogSink(Arc::clone(&sink)))
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        String::from_utf8_lossy(&buffer.lock()).into_owned()
    }

    struct LogSink(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn check_traces_where_it_stopped() {
        let store = store();
        let evaluator = Evaluator::new(&store);

        let logs = captured_logs(|| {
            assert!(!evaluator.check(&plan(json!({"a": "number"})), &json!({"a": "x"})));
        });
        assert!(logs.contains("short-circuit on rule"), "{logs}");

        let logs = captured_logs(|| {
            assert!(!evaluator.check(&plan(json!({"a": "[max:1]number"})), &json!({"a": [1, 2]})));
        });
        assert!(logs.contains("short-circuit on length"), "{logs}");

        let logs = captured_logs(|| {
            assert!(!evaluator.check(&plan(json!({"a": "[unique]number"})), &json!({"a": [1, 1]})));
        });
        assert!(logs.contains("short-circuit on duplicate element"), "{logs}");
    }

    #[test]
    fn length_bounds() {
        let spec = IterableSpec {
            unique: false,
            min: Some(2),
            max: Some(3),
        };
        assert_eq!(length_violation(spec, 1), Some(ValidationIssue::iterable_min(2)));
        assert_eq!(length_violation(spec, 2), None);
        assert_eq!(length_violation(spec, 4), Some(ValidationIssue::iterable_max(3)));
    }
}
