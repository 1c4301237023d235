// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event type carried by the bus

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One published unit: an optional type tag, an opaque payload and an optional id
///
/// Events are immutable once published. Filters are evaluated against
/// `payload` only; `kind` and `id` are delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Event {
    pub fn new(payload: Value) -> Self {
        Self {
            kind: None,
            payload,
            id: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
