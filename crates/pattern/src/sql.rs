// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lowering patterns onto a flat relational index
//!
//! Schema (see [`create_tables`]):
//!   - events table: `(eid TEXT PRIMARY KEY, event TEXT)` holding serialized events
//!   - index table: `(eid TEXT, ts TEXT, path TEXT, value)`, one row per scalar field
//!
//! A query self-joins one aliased copy of the index table per pattern branch
//! on the shared event id, so an event is selected only when every branch
//! finds a row.

use crate::error::QueryError;
use crate::flatten::{flatten_event, flatten_pattern};
use crate::parser::parse_pattern;
use crate::predicate::Predicate;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// SQL text with positional `?` parameters
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A WHERE fragment over one index alias
struct Fragment {
    sql: String,
    params: Vec<Value>,
}

impl Fragment {
    fn bare(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// Render a timestamp the way index rows store it
///
/// Fixed-width nanoseconds keep lexical and chronological order aligned.
pub fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// DDL for the events and index tables
pub fn create_tables(events_table: &str, index_table: &str) -> Vec<Statement> {
    vec![
        Statement::new(
            format!("CREATE TABLE {events_table}(eid TEXT PRIMARY KEY, event TEXT)"),
            Vec::new(),
        ),
        Statement::new(
            format!("CREATE TABLE {index_table}(eid TEXT, ts TEXT, path TEXT, value)"),
            Vec::new(),
        ),
    ]
}

/// Compile a pattern document into a query for events newer than `since`
pub fn compile_query(
    events_table: &str,
    index_table: &str,
    since: DateTime<Utc>,
    pattern: &Value,
) -> Result<Statement, QueryError> {
    let predicate = parse_pattern(pattern)?;
    compile_predicate(events_table, index_table, since, &predicate)
}

/// Compile an already-parsed predicate into a query for events newer than `since`
pub fn compile_predicate(
    events_table: &str,
    index_table: &str,
    since: DateTime<Utc>,
    predicate: &Predicate,
) -> Result<Statement, QueryError> {
    let ts = Value::String(timestamp(since));
    let mut aliases: Vec<String> = Vec::new();
    let mut conjuncts = Vec::new();
    let mut params = Vec::new();
    let mut absent = Vec::new();

    for branch in flatten_pattern(predicate) {
        let path = branch.path_string();

        // Absence cannot be found by joining; it becomes an anti-join below
        if branch.predicate == Predicate::Exists(false) {
            absent.push(path);
            continue;
        }

        let alias = format!("t{}", aliases.len());
        if branch.predicate == Predicate::Exists(true) {
            conjuncts.push(format!(
                "({alias}.ts > ? AND {})",
                at_or_below(&format!("{alias}.path"))
            ));
            params.push(ts.clone());
            params.extend(path_params(path));
        } else {
            let fragment = where_leaf(&branch.predicate, &format!("{alias}.value"), &path)?;
            conjuncts.push(format!(
                "({alias}.ts > ? AND {alias}.path = ? AND {})",
                fragment.sql
            ));
            params.push(ts.clone());
            params.push(Value::String(path));
            params.extend(fragment.params);
        }
        aliases.push(alias);
    }

    if aliases.is_empty() {
        aliases.push("t0".to_string());
        conjuncts.push("(t0.ts > ?)".to_string());
        params.push(ts);
    }

    for path in absent {
        conjuncts.push(format!(
            "NOT EXISTS (SELECT 1 FROM {index_table} AS x WHERE x.eid = t0.eid AND {})",
            at_or_below("x.path")
        ));
        params.extend(path_params(path));
    }

    let mut lines = vec![
        format!("SELECT DISTINCT t0.eid AS eid, {events_table}.event AS event"),
        format!("FROM {index_table} AS t0"),
    ];
    for alias in aliases.iter().skip(1) {
        lines.push(format!(
            "JOIN {index_table} AS {alias} ON {alias}.eid = t0.eid"
        ));
    }
    lines.push(format!(
        "JOIN {events_table} ON {events_table}.eid = t0.eid"
    ));
    lines.push(format!("WHERE {}", conjuncts.join(" AND\n  ")));

    Ok(Statement::new(lines.join("\n"), params))
}

/// Lower a leaf predicate to a condition on `column`
fn where_leaf(predicate: &Predicate, column: &str, path: &str) -> Result<Fragment, QueryError> {
    let fragment = match predicate {
        Predicate::Pass => Fragment::bare("1 = 1"),
        Predicate::Literal(Value::Null) => Fragment::bare(format!("{column} IS NULL")),
        Predicate::Literal(value) => Fragment {
            sql: format!("{column} = ?"),
            params: vec![value.clone()],
        },
        Predicate::Prefix(prefix) => Fragment {
            sql: format!("{column} LIKE ? ESCAPE '\\'"),
            params: vec![Value::String(format!("{}%", escape_like(prefix)))],
        },
        // Inside a disjunction the value is present, whatever it holds
        Predicate::Exists(true) => Fragment::bare("1 = 1"),
        Predicate::Exists(false) => Fragment::bare("1 = 0"),
        Predicate::Numeric(preds) if preds.is_empty() => {
            Fragment::bare(format!("{column} IS NOT NULL"))
        }
        Predicate::Numeric(preds) => Fragment {
            sql: preds
                .iter()
                .map(|p| format!("{column} {} ?", p.relation.as_str()))
                .collect::<Vec<_>>()
                .join(" AND "),
            params: preds.iter().map(|p| Value::from(p.threshold)).collect(),
        },
        Predicate::AnyOf(members) if members.is_empty() => Fragment::bare("1 = 0"),
        Predicate::AnyOf(members) => {
            let literals: Option<Vec<Value>> = members
                .iter()
                .map(|m| match m {
                    Predicate::Literal(v) if !v.is_null() => Some(v.clone()),
                    _ => None,
                })
                .collect();

            match literals {
                Some(values) => Fragment {
                    sql: format!("{column} IN ({})", qmarks(values.len())),
                    params: values,
                },
                None => {
                    let mut parts = Vec::with_capacity(members.len());
                    let mut params = Vec::new();
                    for member in members {
                        let fragment = where_leaf(member, column, path)?;
                        parts.push(format!("({})", fragment.sql));
                        params.extend(fragment.params);
                    }
                    Fragment {
                        sql: format!("({})", parts.join(" OR ")),
                        params,
                    }
                }
            }
        }
        Predicate::FieldMap(_) => return Err(QueryError::NestedFieldMap(path.to_string())),
    };
    Ok(fragment)
}

/// Index rows and the raw event row for one stored event
///
/// The index insert is omitted when the event holds no scalars.
pub fn compile_insert(
    events_table: &str,
    index_table: &str,
    ts: DateTime<Utc>,
    eid: &str,
    event: &Value,
) -> Vec<Statement> {
    let ts = timestamp(ts);
    let rows = flatten_event(event);
    let mut statements = Vec::with_capacity(2);

    if !rows.is_empty() {
        let mut params = Vec::with_capacity(rows.len() * 4);
        for row in &rows {
            params.push(Value::String(eid.to_string()));
            params.push(Value::String(ts.clone()));
            params.push(Value::String(row.path.clone()));
            params.push(row.value.clone());
        }
        statements.push(Statement::new(
            format!(
                "INSERT INTO {index_table} (eid,ts,path,value) VALUES {}",
                vec!["(?,?,?,?)"; rows.len()].join(", ")
            ),
            params,
        ));
    }

    statements.push(Statement::new(
        format!("INSERT INTO {events_table} (eid,event) VALUES (?,?)"),
        vec![
            Value::String(eid.to_string()),
            Value::String(event.to_string()),
        ],
    ));

    statements
}

/// Path condition for a field and everything nested under it
fn at_or_below(column: &str) -> String {
    format!("({column} = ? OR {column} LIKE ? ESCAPE '\\')")
}

fn path_params(path: String) -> [Value; 2] {
    let nested = format!("{}/%", escape_like(&path));
    [Value::String(path), Value::String(nested)]
}

fn qmarks(n: usize) -> String {
    vec!["?"; n].join(",")
}

/// Escape LIKE wildcards so a prefix matches literally
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[path = "sql_tests.rs"]
mod tests;
