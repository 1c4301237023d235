// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for pattern compilation

use thiserror::Error;

/// Errors raised while compiling a pattern document
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("bad prefix: {0}")]
    BadPrefix(String),
    #[error("bad exists value: {0}")]
    BadExists(String),
    #[error("bad numeric: {0}")]
    BadNumeric(String),
    #[error("bad numeric array size {0}: relations and thresholds must pair up")]
    OddNumeric(usize),
    #[error("bad numeric relation: {0}")]
    BadRelation(String),
    #[error("unknown numeric relation '{0}'")]
    UnknownRelation(String),
    #[error("bad numeric threshold: {0}")]
    BadThreshold(String),
    #[error("arrays are not valid inside arrays: {0}")]
    NestedArray(String),
}

/// Errors raised while lowering a predicate to SQL
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("field map in leaf position at '{0}' cannot be indexed")]
    NestedFieldMap(String),
}
