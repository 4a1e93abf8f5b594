//! Rule compilation
//!
//! - [`rule`]: rule-string grammar → [`RuleGroup`]
//! - [`plan`]: rule specification tree → flat [`Plan`]

pub mod plan;
pub mod rule;

pub use plan::{FieldPlan, Plan};
pub use rule::{IterableSpec, Param, RuleGroup, RuleInvocation, compile};
