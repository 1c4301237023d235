// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compiled pattern predicates
//!
//! A `Predicate` is a closed tree of constraints over a JSON payload. Every
//! operation over it (matching, flattening, SQL lowering) is one exhaustive
//! `match`, so a new variant is a compile error until each site handles it.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A compiled pattern node
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every value; the default filter
    #[default]
    Pass,
    /// Scalar equality, numeric-type aware
    Literal(Value),
    /// String prefix test
    Prefix(String),
    /// Field presence test, only meaningful under a field map key
    Exists(bool),
    /// Conjunction of numeric comparisons
    Numeric(Vec<NumericPredicate>),
    /// Disjunction over members and, for arrays, over elements
    AnyOf(Vec<Predicate>),
    /// Conjunction over named fields of an object
    FieldMap(BTreeMap<String, Predicate>),
}

/// Comparison operator in a numeric constraint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Relation {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
}

impl Relation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "=" => Some(Self::Eq),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
        }
    }

    fn holds(&self, x: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => x < threshold,
            Self::Le => x <= threshold,
            Self::Gt => x > threshold,
            Self::Ge => x >= threshold,
            Self::Eq => x == threshold,
        }
    }
}

/// One `(relation, threshold)` pair of a numeric constraint
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NumericPredicate {
    pub relation: Relation,
    pub threshold: f64,
}

impl NumericPredicate {
    pub fn new(relation: Relation, threshold: f64) -> Self {
        Self {
            relation,
            threshold,
        }
    }

    pub fn matches(&self, x: f64) -> bool {
        self.relation.holds(x, self.threshold)
    }
}

impl Predicate {
    /// Check a value against this predicate
    ///
    /// The value is treated as present; field maps handle absent keys
    /// through [`Predicate::matches_field`].
    pub fn matches(&self, value: &Value) -> bool {
        self.matches_field(Some(value))
    }

    /// Check a possibly-absent field value against this predicate
    pub fn matches_field(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return matches!(self, Predicate::Exists(false));
        };

        match self {
            Predicate::Pass => true,
            Predicate::Literal(expected) => literal_eq(expected, value),
            Predicate::Prefix(prefix) => value.as_str().is_some_and(|s| s.starts_with(prefix)),
            Predicate::Exists(want) => *want,
            Predicate::Numeric(preds) => match value.as_f64() {
                Some(x) => preds.iter().all(|p| p.matches(x)),
                None => false,
            },
            Predicate::AnyOf(members) => candidates(value)
                .iter()
                .any(|candidate| members.iter().any(|m| m.matches(candidate))),
            Predicate::FieldMap(fields) => match value.as_object() {
                Some(object) => fields
                    .iter()
                    .all(|(key, child)| child.matches_field(object.get(key))),
                None => false,
            },
        }
    }

    /// Short name of the variant, for logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Predicate::Pass => "pass",
            Predicate::Literal(_) => "literal",
            Predicate::Prefix(_) => "prefix",
            Predicate::Exists(_) => "exists",
            Predicate::Numeric(_) => "numeric",
            Predicate::AnyOf(_) => "any_of",
            Predicate::FieldMap(_) => "field_map",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

/// Sequence view of a value: arrays yield their elements, scalars themselves
fn candidates(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Literal equality with integer/float cross-type comparison
pub(crate) fn literal_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
                return x == y;
            }
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "predicate_tests.rs"]
mod tests;
