//! Predicate store
//!
//! Maps rule names to predicate functions. A [`RuleStore`] is shared by every
//! validator built on it and may be extended at runtime; the process-wide
//! default is available through [`RuleStore::global`] and the free functions
//! in this module.
//!
//! # Thread Safety
//!
//! The store uses `parking_lot::RwLock` for concurrent access. Lookups clone
//! an `Arc` handle, so no lock is held while a predicate runs.

#[cfg(feature = "builtins")]
pub mod builtins;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::value::structurally_equal;

/// Characters that would make a name unreachable from the rule grammar.
const RESERVED: &[char] = &['|', ':', ',', '!', '?', '[', ']', '<', '>'];

// ============================================================================
// PREDICATES
// ============================================================================

/// A predicate function: `(value, args) -> bool`.
pub type Predicate = Arc<dyn Fn(&Value, &Args<'_>) -> bool + Send + Sync>;

/// Resolved arguments handed to a predicate.
///
/// Positions past the end read as absent, so a predicate invoked with fewer
/// parameters than it expects sees `None` for the missing ones.
#[derive(Debug, Clone, Default)]
pub struct Args<'a> {
    values: SmallVec<[Option<&'a Value>; 4]>,
}

impl<'a> Args<'a> {
    /// Creates an argument list.
    pub fn new(values: impl IntoIterator<Item = Option<&'a Value>>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Argument at `index`, `None` if absent or past the end.
    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index).copied().flatten()
    }

    /// Number of arguments written in the rule.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the rule carried no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Owned copies for error reporting.
    pub fn to_params(&self) -> Vec<Option<Value>> {
        self.values.iter().map(|v| v.cloned()).collect()
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Source of predicates for evaluation.
pub trait PredicateStore: Send + Sync {
    /// Looks up a predicate by rule name.
    fn get(&self, name: &str) -> Option<Predicate>;

    /// Registers or overwrites a predicate.
    fn register(&self, name: &str, predicate: Predicate) -> ConfigResult<()>;
}

// ============================================================================
// RULE STORE
// ============================================================================

/// The default [`PredicateStore`]: predicates plus named enums.
pub struct RuleStore {
    predicates: RwLock<HashMap<String, Predicate>>,
    enums: RwLock<HashMap<String, Vec<Value>>>,
}

static GLOBAL: LazyLock<Arc<RuleStore>> = LazyLock::new(|| Arc::new(RuleStore::new()));

impl RuleStore {
    /// Creates a store with the built-in predicates (when the `builtins`
    /// feature is enabled).
    pub fn new() -> Self {
        let store = Self::empty();
        #[cfg(feature = "builtins")]
        builtins::register_all(&mut store.predicates.write());
        store
    }

    /// Creates a store with no predicates at all.
    pub fn empty() -> Self {
        Self {
            predicates: RwLock::new(HashMap::new()),
            enums: RwLock::new(HashMap::new()),
        }
    }

    /// The shared process-wide store.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Registers or overwrites a single predicate.
    ///
    /// Overwriting an enum's name drops the enum from [`enums`](Self::enums).
    ///
    /// # Examples
    ///
    /// ```
    /// use nebula_rules::store::RuleStore;
    /// use serde_json::json;
    ///
    /// let store = RuleStore::empty();
    /// store
    ///     .extend("even", |value, _args| value.as_i64().is_some_and(|n| n % 2 == 0))
    ///     .unwrap();
    /// assert!(store.contains("even"));
    /// ```
    pub fn extend<F>(&self, name: &str, predicate: F) -> ConfigResult<()>
    where
        F: Fn(&Value, &Args<'_>) -> bool + Send + Sync + 'static,
    {
        self.register(name, Arc::new(predicate))
    }

    /// Registers several predicates at once.
    ///
    /// Every name is checked before any predicate is inserted.
    pub fn extend_multiple<I, S>(&self, predicates: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = (S, Predicate)>,
        S: Into<String>,
    {
        let entries: Vec<(String, Predicate)> = predicates
            .into_iter()
            .map(|(name, predicate)| (name.into(), predicate))
            .collect();
        for (name, _) in &entries {
            validate_name(name)?;
        }

        let mut predicates = self.predicates.write();
        let mut enums = self.enums.write();
        for (name, predicate) in entries {
            debug!(rule = %name, "registered predicate");
            enums.remove(&name);
            predicates.insert(name, predicate);
        }
        Ok(())
    }

    /// Registers named enums and a membership predicate for each.
    ///
    /// Values must be non-empty strings or finite numbers, and every enum
    /// needs at least one. Nothing is registered if any definition is
    /// invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use nebula_rules::store::RuleStore;
    /// use serde_json::json;
    ///
    /// let store = RuleStore::empty();
    /// store
    ///     .extend_enums([("color", vec![json!("red"), json!("green")])])
    ///     .unwrap();
    /// assert!(store.contains("color"));
    /// assert_eq!(store.enums()["color"].len(), 2);
    /// ```
    pub fn extend_enums<I, S>(&self, enums: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let entries: Vec<(String, Vec<Value>)> = enums
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .collect();
        for (name, values) in &entries {
            validate_enum(name, values)?;
        }

        let mut predicates = self.predicates.write();
        let mut enums = self.enums.write();
        for (name, values) in entries {
            debug!(enum_name = %name, values = values.len(), "registered enum");
            predicates.insert(name.clone(), membership(values.clone()));
            enums.insert(name, values);
        }
        Ok(())
    }

    /// Snapshot of every registered predicate.
    ///
    /// The returned map is a copy; changing it does not affect the store.
    pub fn rules(&self) -> HashMap<String, Predicate> {
        self.predicates.read().clone()
    }

    /// Snapshot of every registered enum.
    pub fn enums(&self) -> HashMap<String, Vec<Value>> {
        self.enums.read().clone()
    }

    /// True if a predicate is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.predicates.read().contains_key(name)
    }

    /// Number of registered predicates.
    pub fn len(&self) -> usize {
        self.predicates.read().len()
    }

    /// True if no predicates are registered.
    pub fn is_empty(&self) -> bool {
        self.predicates.read().is_empty()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.predicates.read().keys().cloned().collect();
        names.sort_unstable();
        f.debug_struct("RuleStore")
            .field("predicates", &names)
            .field("enums", &self.enums.read().len())
            .finish()
    }
}

impl PredicateStore for RuleStore {
    fn get(&self, name: &str) -> Option<Predicate> {
        self.predicates.read().get(name).cloned()
    }

    fn register(&self, name: &str, predicate: Predicate) -> ConfigResult<()> {
        validate_name(name)?;
        debug!(rule = name, "registered predicate");
        let mut predicates = self.predicates.write();
        self.enums.write().remove(name);
        predicates.insert(name.to_owned(), predicate);
        Ok(())
    }
}

fn validate_name(name: &str) -> ConfigResult<()> {
    let valid = !name.is_empty()
        && !name.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            name: name.to_owned(),
        })
    }
}

fn validate_enum(name: &str, values: &[Value]) -> ConfigResult<()> {
    validate_name(name)?;
    if values.is_empty() {
        return Err(ConfigError::invalid_enum(name, "at least one value is required"));
    }
    for value in values {
        let ok = match value {
            Value::String(s) => !s.trim().is_empty(),
            Value::Number(n) => n.as_f64().is_some_and(f64::is_finite),
            _ => false,
        };
        if !ok {
            return Err(ConfigError::invalid_enum(
                name,
                format!("values must be non-empty strings or finite numbers, got {value}"),
            ));
        }
    }
    Ok(())
}

fn membership(values: Vec<Value>) -> Predicate {
    Arc::new(move |value: &Value, _args: &Args<'_>| {
        values.iter().any(|allowed| structurally_equal(allowed, value))
    })
}

// ============================================================================
// GLOBAL STORE HELPERS
// ============================================================================

/// Registers or overwrites a predicate in the global store.
pub fn extend<F>(name: &str, predicate: F) -> ConfigResult<()>
where
    F: Fn(&Value, &Args<'_>) -> bool + Send + Sync + 'static,
{
    GLOBAL.extend(name, predicate)
}

/// Registers several predicates in the global store.
pub fn extend_multiple<I, S>(predicates: I) -> ConfigResult<()>
where
    I: IntoIterator<Item = (S, Predicate)>,
    S: Into<String>,
{
    GLOBAL.extend_multiple(predicates)
}

/// Registers named enums in the global store.
pub fn extend_enums<I, S>(enums: I) -> ConfigResult<()>
where
    I: IntoIterator<Item = (S, Vec<Value>)>,
    S: Into<String>,
{
    GLOBAL.extend_enums(enums)
}

/// Snapshot of the global store's predicates.
pub fn rules() -> HashMap<String, Predicate> {
    GLOBAL.rules()
}

/// Snapshot of the global store's enums.
pub fn enums() -> HashMap<String, Vec<Value>> {
    GLOBAL.enums()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn always(result: bool) -> Predicate {
        Arc::new(move |_: &Value, _: &Args<'_>| result)
    }

    #[test]
    fn args_pad_with_absent() {
        let five = json!(5);
        let args = Args::new([Some(&five), None]);
        assert_eq!(args.len(), 2);
        assert_eq!(args.get(0), Some(&five));
        assert_eq!(args.get(1), None);
        assert_eq!(args.get(7), None);
        assert_eq!(args.to_params(), vec![Some(json!(5)), None]);
    }

    #[test]
    fn register_and_overwrite() {
        let store = RuleStore::empty();
        store.register("flag", always(false)).unwrap();
        let before = store.get("flag").unwrap();
        assert!(!before(&json!(1), &Args::default()));

        store.register("flag", always(true)).unwrap();
        let after = store.get("flag").unwrap();
        assert!(after(&json!(1), &Args::default()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn invalid_names_are_rejected() {
        let store = RuleStore::empty();
        for name in ["", "has space", "a|b", "a:b", "!neg", "x<y>"] {
            let err = store.register(name, always(true)).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidName { .. }), "{name}");
        }
        assert!(store.is_empty());
    }

    #[test]
    fn extend_multiple_is_all_or_nothing() {
        let store = RuleStore::empty();
        let result = store.extend_multiple([("ok", always(true)), ("not ok", always(true))]);
        assert!(result.is_err());
        assert!(!store.contains("ok"));

        store
            .extend_multiple([("a", always(true)), ("b", always(false))])
            .unwrap();
        assert!(store.contains("a") && store.contains("b"));
    }

    #[test]
    fn enums_synthesize_membership_predicates() {
        let store = RuleStore::empty();
        store
            .extend_enums([("size", vec![json!("S"), json!("M"), json!(42)])])
            .unwrap();

        let size = store.get("size").unwrap();
        assert!(size(&json!("M"), &Args::default()));
        assert!(size(&json!(42.0), &Args::default()));
        assert!(!size(&json!("XL"), &Args::default()));
        assert!(!size(&json!(null), &Args::default()));
    }

    #[test]
    fn invalid_enums_are_rejected_entirely() {
        let store = RuleStore::empty();
        let cases = [
            vec![],
            vec![json!("")],
            vec![json!("ok"), json!(null)],
            vec![json!({"a": 1})],
        ];
        for values in cases {
            let err = store
                .extend_enums([("good", vec![json!("x")]), ("bad", values)])
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEnum { .. }));
        }
        assert!(!store.contains("good"));
        assert!(store.enums().is_empty());
    }

    #[test]
    fn plain_predicate_replaces_enum() {
        let store = RuleStore::empty();
        store
            .extend_enums([("color", vec![json!("red")]), ("size", vec![json!("S")])])
            .unwrap();

        store.extend("color", |v, _| v.is_number()).unwrap();
        store.extend_multiple([("size", always(true))]).unwrap();

        assert!(store.enums().is_empty());
        let color = store.get("color").unwrap();
        assert!(color(&json!(1), &Args::default()));
        assert!(!color(&json!("red"), &Args::default()));
    }

    #[test]
    fn snapshots_are_detached() {
        let store = RuleStore::empty();
        store.register("one", always(true)).unwrap();

        let mut snapshot = store.rules();
        snapshot.insert("two".into(), always(true));
        snapshot.remove("one");

        assert!(store.contains("one"));
        assert!(!store.contains("two"));
    }

    #[test]
    fn global_store_is_shared() {
        extend("store_test_global_flag", |v, _| v.is_boolean()).unwrap();
        assert!(RuleStore::global().contains("store_test_global_flag"));
        assert!(rules().contains_key("store_test_global_flag"));
    }
}
