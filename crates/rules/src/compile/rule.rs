//! Rule-string compiler
//!
//! Turns one rule string such as `?[unique|max:5]alpha_num_spaces|min:2`
//! into a [`RuleGroup`]:
//!
//! ```text
//! rule_string    := "?"? iterable_spec? rule_part ("|" rule_part)*
//! iterable_spec  := "[" iterable_opt ("|" iterable_opt)* "]"
//! iterable_opt   := "unique" | "max:" INT | "min:" INT
//! rule_part      := "!"? IDENT (":" param ("," param)*)?
//! param          := "<" PATH ">" | LITERAL
//! PATH           := [a-zA-Z0-9_.]+
//! ```
//!
//! Literal parameters stay strings. The one exception is `in:a,b,c`, which
//! compiles to a single parameter holding the list `["a", "b", "c"]`.

use std::sync::LazyLock;

use serde_json::Value;
use smallvec::SmallVec;

use crate::error::{ConfigError, ConfigResult};

static REFERENCE_PATH: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[a-zA-Z0-9_.]+$").unwrap());

/// Rule name whose comma-separated parameter segment is a single list.
const IN_RULE: &str = "in";

// ============================================================================
// COMPILED FORMS
// ============================================================================

/// A rule parameter as written in the rule string.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Fixed at compile time.
    Literal(Value),
    /// Dot path resolved against the whole input record at evaluation time.
    Reference(String),
}

impl Param {
    /// Resolves the parameter against the top-level input record.
    ///
    /// References that do not resolve yield `None`.
    pub fn resolve<'a>(&'a self, data: &'a Value) -> Option<&'a Value> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Reference(path) => crate::eval::path::lookup(data, path),
        }
    }
}

/// One `name[:params]` segment of a rule string.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleInvocation {
    /// Predicate name looked up in the rule store.
    pub name: String,
    /// Set by a leading `!`: the invocation passes when the predicate fails.
    pub negated: bool,
    /// Parameters in the order they were written.
    pub params: SmallVec<[Param; 2]>,
}

impl RuleInvocation {
    /// Error code reported when this invocation fails.
    pub fn failure_code(&self) -> String {
        if self.negated {
            format!("not_{}", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Array constraints declared in a `[...]` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IterableSpec {
    /// Elements must be pairwise distinct.
    pub unique: bool,
    /// Minimum number of elements.
    pub min: Option<usize>,
    /// Maximum number of elements.
    pub max: Option<usize>,
}

/// Compiled form of one rule string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleGroup {
    /// Set by a leading `?`: the field may be absent.
    pub sometimes: bool,
    /// When set, every invocation applies to each array element.
    pub iterable: Option<IterableSpec>,
    /// Invocations in evaluation (and error reporting) order.
    pub list: Vec<RuleInvocation>,
}

// ============================================================================
// COMPILER
// ============================================================================

/// Compiles a rule string into a [`RuleGroup`].
///
/// # Examples
///
/// ```
/// use nebula_rules::compile::{Param, compile};
///
/// let group = compile("?[unique|max:5]string|!email").unwrap();
/// assert!(group.sometimes);
/// assert_eq!(group.iterable.unwrap().max, Some(5));
/// assert_eq!(group.list.len(), 2);
/// assert!(group.list[1].negated);
///
/// let group = compile("equal_to:<user.name>").unwrap();
/// assert_eq!(group.list[0].params[0], Param::Reference("user.name".into()));
/// ```
pub fn compile(raw: &str) -> ConfigResult<RuleGroup> {
    RuleParser::new(raw).parse()
}

/// Left-to-right parser over a single rule string.
struct RuleParser<'a> {
    raw: &'a str,
    rest: &'a str,
}

impl<'a> RuleParser<'a> {
    fn new(raw: &'a str) -> Self {
        Self { raw, rest: raw }
    }

    fn parse(mut self) -> ConfigResult<RuleGroup> {
        let sometimes = self.sometimes();
        let iterable = self.iterable()?;

        let mut list = Vec::new();
        for token in self.rest.split('|') {
            if token.trim().is_empty() {
                continue;
            }
            list.push(self.invocation(token)?);
        }

        Ok(RuleGroup {
            sometimes,
            iterable,
            list,
        })
    }

    fn sometimes(&mut self) -> bool {
        match self.rest.strip_prefix('?') {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn iterable(&mut self) -> ConfigResult<Option<IterableSpec>> {
        if !self.rest.contains(['[', ']']) {
            return Ok(None);
        }
        if !self.rest.starts_with('[') {
            return Err(ConfigError::iterable(self.raw, "`[` must open the rule"));
        }
        let Some(close) = self.rest.find(']') else {
            return Err(ConfigError::iterable(self.raw, "missing closing `]`"));
        };

        let config = &self.rest[1..close];
        self.rest = &self.rest[close + 1..];

        let mut spec = IterableSpec::default();
        for option in config.split('|').map(str::trim).filter(|o| !o.is_empty()) {
            match option.split_once(':') {
                None if option == "unique" => spec.unique = true,
                Some(("min", bound)) => spec.min = Some(self.bound(bound)?),
                Some(("max", bound)) => spec.max = Some(self.bound(bound)?),
                _ => {
                    return Err(ConfigError::iterable(self.raw, "unknown iterable option"));
                }
            }
        }
        Ok(Some(spec))
    }

    fn bound(&self, raw: &str) -> ConfigResult<usize> {
        raw.trim()
            .parse()
            .map_err(|_| ConfigError::iterable(self.raw, "bound must be a non-negative integer"))
    }

    fn invocation(&self, token: &str) -> ConfigResult<RuleInvocation> {
        let (name, segment) = match token.split_once(':') {
            Some((name, segment)) => (name, Some(segment)),
            None => (token, None),
        };

        let name = name.trim();
        let (name, negated) = match name.strip_prefix('!') {
            Some(stripped) => (stripped.trim(), true),
            None => (name, false),
        };
        if name.is_empty() {
            return Err(ConfigError::unnamed_rule(self.raw, token));
        }

        let mut params = SmallVec::new();
        match segment {
            Some(segment) if name == IN_RULE && segment.contains(',') => {
                let members = segment.split(',').map(|m| Value::String(m.to_owned()));
                params.push(Param::Literal(Value::Array(members.collect())));
            }
            Some(segment) => {
                for token in segment.split(',') {
                    params.push(self.param(token)?);
                }
            }
            None => {}
        }

        Ok(RuleInvocation {
            name: name.to_owned(),
            negated,
            params,
        })
    }

    fn param(&self, token: &str) -> ConfigResult<Param> {
        let inner = token
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'));
        match inner {
            Some(path) if REFERENCE_PATH.is_match(path) => Ok(Param::Reference(path.to_owned())),
            Some(_) => Err(ConfigError::parameter(self.raw, token)),
            None => Ok(Param::Literal(Value::String(token.to_owned()))),
        }
    }
}
