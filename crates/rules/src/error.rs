//! Configuration errors
//!
//! Everything that can go wrong while compiling rule strings, building a
//! validation plan, or extending a rule store. These are the only errors the
//! crate returns; problems found while evaluating input are reported as data
//! in a [`ValidationReport`](crate::report::ValidationReport).

/// A misconfigured rule specification or extension call.
///
/// Returned by [`Validator::new`](crate::Validator::new),
/// [`compile`](crate::compile::compile) and the `extend*` family. A call that
/// returns one of these has not applied any of its changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The `[...]` block of a rule string is misplaced, unterminated, or
    /// holds an option other than `unique`, `min:<int>` or `max:<int>`.
    #[error("Iterable misconfiguration in rule `{rule}`: {reason}")]
    IterableMisconfiguration {
        /// Raw rule string.
        rule: String,
        /// What was wrong with the block.
        reason: &'static str,
    },

    /// A `|`-separated token with no rule name, such as `!` or `:5`.
    #[error("Rule misconfiguration in rule `{rule}`: token `{token}` names no rule")]
    RuleMisconfiguration {
        /// Raw rule string.
        rule: String,
        /// Offending token.
        token: String,
    },

    /// A `<...>` parameter whose path contains characters outside
    /// `[a-zA-Z0-9_.]`.
    #[error("Parameterization misconfiguration in rule `{rule}`: invalid reference `{param}`")]
    ParameterMisconfiguration {
        /// Raw rule string.
        rule: String,
        /// Offending parameter token.
        param: String,
    },

    /// The rule specification is not a key-value mapping.
    #[error("Validator expects a key-value mapping of rules, got {found}")]
    InvalidSpec {
        /// JSON type name of what was passed instead.
        found: &'static str,
    },

    /// A leaf of the rule specification is neither a non-blank string nor a
    /// nested mapping.
    #[error("Rule for a key needs to be a string: `{key}`")]
    InvalidRule {
        /// Dot path of the offending key.
        key: String,
    },

    /// A predicate or enum name that cannot be referenced from a rule string.
    #[error("Invalid rule name `{name}`")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// An enum definition with no values or with an unsupported value.
    #[error("Invalid enum `{name}`: {reason}")]
    InvalidEnum {
        /// Enum name.
        name: String,
        /// What was wrong with the definition.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn iterable(rule: &str, reason: &'static str) -> Self {
        Self::IterableMisconfiguration {
            rule: rule.to_owned(),
            reason,
        }
    }

    pub(crate) fn unnamed_rule(rule: &str, token: &str) -> Self {
        Self::RuleMisconfiguration {
            rule: rule.to_owned(),
            token: token.to_owned(),
        }
    }

    pub(crate) fn parameter(rule: &str, param: &str) -> Self {
        Self::ParameterMisconfiguration {
            rule: rule.to_owned(),
            param: param.to_owned(),
        }
    }

    pub(crate) fn invalid_enum(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEnum {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration-time operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = ConfigError::iterable("[unique", "missing closing bracket");
        assert_eq!(
            err.to_string(),
            "Iterable misconfiguration in rule `[unique`: missing closing bracket"
        );

        let err = ConfigError::parameter("equal_to:<a-b>", "<a-b>");
        assert!(err.to_string().contains("<a-b>"));

        let err = ConfigError::InvalidRule {
            key: "address.street".into(),
        };
        assert!(err.to_string().contains("address.street"));
    }
}
