// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sift-pattern: declarative event patterns
//!
//! This crate provides:
//! - `Predicate` - compiled pattern tree evaluated against JSON payloads
//! - `parse_pattern` - pattern document to predicate compiler
//! - `flatten_pattern` / `flatten_event` - field-path decomposition
//! - `compile_query` / `compile_insert` - lowering onto a flat relational index

mod error;
mod flatten;
mod parser;
mod predicate;
pub mod sql;

pub use error::{ParseError, QueryError};
pub use flatten::{flatten_event, flatten_pattern, matches_flattened, Branch, IndexRow};
pub use parser::{matches, parse_pattern};
pub use predicate::{NumericPredicate, Predicate, Relation};
pub use sql::{compile_insert, compile_predicate, compile_query, create_tables, Statement};
