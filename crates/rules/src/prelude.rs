//! Prelude module for convenient imports.
//!
//! ```rust
//! use nebula_rules::prelude::*;
//! ```

pub use crate::compile::{Plan, compile};
pub use crate::error::{ConfigError, ConfigResult};
pub use crate::eval::Evaluator;
pub use crate::report::{FieldErrors, ReportErrors, ValidationIssue, ValidationReport};
pub use crate::store::{Args, Predicate, PredicateStore, RuleStore};
pub use crate::validator::Validator;
