// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer queries

use crate::event::Event;
use serde_json::Value;
use sift_pattern::{parse_pattern, ParseError, Predicate};

/// Replay count used when a subscriber does not ask for one
pub const DEFAULT_LIMIT: usize = 10;

/// What a consumer wants from the bus
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Deliver matching history before live events
    pub replay: bool,
    /// Upper bound on replayed events
    pub limit: usize,
    /// Filter over event payloads
    pub filter: Predicate,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            replay: true,
            limit: DEFAULT_LIMIT,
            filter: Predicate::Pass,
        }
    }
}

impl Query {
    pub fn new(filter: Predicate) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Compile a pattern document into a query with default replay settings
    pub fn from_pattern(pattern: &Value) -> Result<Self, ParseError> {
        Ok(Self::new(parse_pattern(pattern)?))
    }

    pub fn with_replay(mut self, replay: bool) -> Self {
        self.replay = replay;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Bound the replay limit by a bus-wide maximum
    pub fn clamp_limit(mut self, max: usize) -> Self {
        self.limit = self.limit.min(max);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.filter.matches(&event.payload)
    }

    /// Matching events in input order
    pub fn select<'a>(&self, events: impl IntoIterator<Item = &'a Event>) -> Vec<Event> {
        events
            .into_iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
