//! # nebula-rules
//!
//! Declarative validation driven by compact rule strings.
//!
//! A rule specification maps field names to rule strings (or nested
//! mappings). It is compiled once into a [`Plan`](compile::Plan) and then
//! evaluated against any number of JSON records.
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_rules::prelude::*;
//! use serde_json::json;
//!
//! let validator = Validator::new(&json!({
//!     "email": "email",
//!     "age": "?integer|between:18,120",
//!     "address": { "street": "string_ne", "zip": "alpha_num" },
//! }))
//! .unwrap();
//!
//! assert!(validator.check(&json!({
//!     "email": "ada@example.com",
//!     "address": { "street": "Main St", "zip": "12345" },
//! })));
//!
//! let report = validator.validate(&json!({"email": "nope", "age": 7}));
//! assert_eq!(report.errors_at("age")[0].msg, "between");
//! assert_eq!(report.errors_at("address.street")[0].msg, "not_found");
//! ```
//!
//! ## Rule Grammar
//!
//! - `?`: the field may be absent
//! - `[unique|min:1|max:5]`: the field is an array; rules apply per element
//! - `rule|rule`: every rule must pass, in order
//! - `!rule`: the rule must fail
//! - `rule:a,b`: literal parameters; `rule:<other.field>` reads the input
//!
//! ## Extending
//!
//! Predicates live in a [`RuleStore`](store::RuleStore). The process-wide
//! store starts with the built-in set and can be extended with
//! [`store::extend`], [`store::extend_multiple`] and [`store::extend_enums`].

pub mod compile;
pub mod error;
pub mod eval;
pub mod prelude;
pub mod report;
pub mod store;
pub mod value;
mod validator;

pub use error::{ConfigError, ConfigResult};
pub use report::{FieldErrors, ReportErrors, ValidationIssue, ValidationReport};
pub use validator::Validator;
