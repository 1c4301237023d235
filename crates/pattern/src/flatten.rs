// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Field-path decomposition of patterns and events
//!
//! A pattern flattens into branches, one per leaf reached through field
//! maps. An event flattens into index rows, one per scalar it contains
//! plus one per empty container under a key. A pattern matches a
//! flattened event when every branch finds a row.
//!
//! The index is lossy where arrays are involved: array elements are stored
//! under the array's own path, so a literal, prefix or numeric leaf that
//! would reject an array directly accepts it here when any element matches.

use crate::predicate::Predicate;
use serde_json::Value;

/// Separator between keys in a rendered field path
pub const PATH_SEPARATOR: &str = "/";

/// A leaf predicate and the field path leading to it
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub path: Vec<String>,
    pub predicate: Predicate,
}

impl Branch {
    /// Field path joined with `/`
    pub fn path_string(&self) -> String {
        self.path.join(PATH_SEPARATOR)
    }

    /// Evaluate this branch against a flattened event, as the index query would
    ///
    /// A field exists when a row sits at its path or anywhere below it.
    pub fn matches_rows(&self, rows: &[IndexRow]) -> bool {
        let path = self.path_string();

        match &self.predicate {
            Predicate::Exists(want) => rows.iter().any(|row| row.is_at_or_below(&path)) == *want,
            predicate => rows
                .iter()
                .filter(|row| row.path == path)
                .any(|row| predicate.matches(&row.value)),
        }
    }
}

/// One scalar (or empty container) of a flattened event
#[derive(Clone, Debug, PartialEq)]
pub struct IndexRow {
    pub path: String,
    pub value: Value,
}

impl IndexRow {
    fn is_at_or_below(&self, path: &str) -> bool {
        match self.path.strip_prefix(path) {
            Some(rest) => rest.is_empty() || rest.starts_with(PATH_SEPARATOR),
            None => false,
        }
    }
}

/// Decompose a predicate into field-path branches
///
/// `Pass` constrains nothing and yields no branches.
pub fn flatten_pattern(predicate: &Predicate) -> Vec<Branch> {
    let mut branches = Vec::new();
    let mut prefix = Vec::new();
    flatten_into(predicate, &mut prefix, &mut branches);
    branches
}

fn flatten_into(predicate: &Predicate, prefix: &mut Vec<String>, out: &mut Vec<Branch>) {
    match predicate {
        Predicate::Pass => {}
        Predicate::FieldMap(fields) => {
            for (key, child) in fields {
                prefix.push(key.clone());
                flatten_into(child, prefix, out);
                prefix.pop();
            }
        }
        Predicate::Literal(_)
        | Predicate::Prefix(_)
        | Predicate::Exists(_)
        | Predicate::Numeric(_)
        | Predicate::AnyOf(_) => out.push(Branch {
            path: prefix.clone(),
            predicate: predicate.clone(),
        }),
    }
}

/// Decompose an event value into `(path, scalar)` rows
///
/// Array elements share their parent's path. An empty object or array under
/// a key yields one row holding the container itself, so the key still
/// exists; at the root it yields nothing.
pub fn flatten_event(value: &Value) -> Vec<IndexRow> {
    let mut rows = Vec::new();
    let mut prefix = Vec::new();
    flatten_event_into(value, &mut prefix, &mut rows);
    rows
}

fn flatten_event_into(value: &Value, prefix: &mut Vec<String>, out: &mut Vec<IndexRow>) {
    match value {
        Value::Object(object) if object.is_empty() => push_container(value, prefix, out),
        Value::Array(items) if items.is_empty() => push_container(value, prefix, out),
        Value::Object(object) => {
            for (key, child) in object {
                prefix.push(key.clone());
                flatten_event_into(child, prefix, out);
                prefix.pop();
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_event_into(item, prefix, out);
            }
        }
        scalar => out.push(IndexRow {
            path: prefix.join(PATH_SEPARATOR),
            value: scalar.clone(),
        }),
    }
}

fn push_container(value: &Value, prefix: &[String], out: &mut Vec<IndexRow>) {
    if !prefix.is_empty() {
        out.push(IndexRow {
            path: prefix.join(PATH_SEPARATOR),
            value: value.clone(),
        });
    }
}

/// Conjunction of every branch over a flattened event
pub fn matches_flattened(branches: &[Branch], rows: &[IndexRow]) -> bool {
    branches.iter().all(|branch| branch.matches_rows(rows))
}

#[cfg(test)]
#[path = "flatten_tests.rs"]
mod tests;
