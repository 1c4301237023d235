// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pattern document parser
//!
//! Documents are plain JSON:
//!   - arrays become `AnyOf` over leaf constraints
//!   - `{"prefix": s}`, `{"exists": b}` and `{"numeric": [op, n, ...]}` are special forms
//!   - any other object is a field map whose values are sub-patterns
//!   - everything else is a literal

use crate::error::ParseError;
use crate::predicate::{NumericPredicate, Predicate, Relation};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Compile a pattern document into a predicate tree
pub fn parse_pattern(document: &Value) -> Result<Predicate, ParseError> {
    match document {
        Value::Array(items) => items
            .iter()
            .map(parse_leaf)
            .collect::<Result<Vec<_>, _>>()
            .map(Predicate::AnyOf),
        Value::Object(object) => parse_object(object),
        scalar => Ok(Predicate::Literal(scalar.clone())),
    }
}

/// Compile `pattern` and check `value` against it in one step
pub fn matches(pattern: &Value, value: &Value) -> Result<bool, ParseError> {
    Ok(parse_pattern(pattern)?.matches(value))
}

/// Parse one element of an array pattern
fn parse_leaf(element: &Value) -> Result<Predicate, ParseError> {
    match element {
        Value::Array(_) => Err(ParseError::NestedArray(element.to_string())),
        Value::Object(object) => parse_object(object),
        scalar => Ok(Predicate::Literal(scalar.clone())),
    }
}

fn parse_object(object: &Map<String, Value>) -> Result<Predicate, ParseError> {
    if let Some(special) = parse_special(object)? {
        return Ok(special);
    }

    let mut fields = BTreeMap::new();
    for (key, value) in object {
        fields.insert(key.clone(), parse_pattern(value)?);
    }
    Ok(Predicate::FieldMap(fields))
}

/// Recognize the `prefix`, `exists` and `numeric` forms, in that order
fn parse_special(object: &Map<String, Value>) -> Result<Option<Predicate>, ParseError> {
    if let Some(value) = object.get("prefix") {
        let prefix = value
            .as_str()
            .ok_or_else(|| ParseError::BadPrefix(value.to_string()))?;
        return Ok(Some(Predicate::Prefix(prefix.to_string())));
    }

    if let Some(value) = object.get("exists") {
        let want = value
            .as_bool()
            .ok_or_else(|| ParseError::BadExists(value.to_string()))?;
        return Ok(Some(Predicate::Exists(want)));
    }

    if let Some(value) = object.get("numeric") {
        return parse_numeric(value).map(Some);
    }

    Ok(None)
}

fn parse_numeric(value: &Value) -> Result<Predicate, ParseError> {
    let items = value
        .as_array()
        .ok_or_else(|| ParseError::BadNumeric(value.to_string()))?;
    if items.len() % 2 != 0 {
        return Err(ParseError::OddNumeric(items.len()));
    }

    let mut preds = Vec::with_capacity(items.len() / 2);
    for pair in items.chunks(2) {
        let name = pair[0]
            .as_str()
            .ok_or_else(|| ParseError::BadRelation(pair[0].to_string()))?;
        let relation =
            Relation::parse(name).ok_or_else(|| ParseError::UnknownRelation(name.to_string()))?;
        let threshold = pair[1]
            .as_f64()
            .ok_or_else(|| ParseError::BadThreshold(pair[1].to_string()))?;
        preds.push(NumericPredicate::new(relation, threshold));
    }

    Ok(Predicate::Numeric(preds))
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
