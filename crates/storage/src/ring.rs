// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded circular replay buffer

use crate::error::StoreError;
use crate::store::Store;
use async_trait::async_trait;
use sift_core::{Event, Query};
use std::sync::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Fixed-capacity in-memory history
///
/// Once full, each write overwrites the oldest slot. Reads snapshot under a
/// shared lock and filter after releasing it.
pub struct Ring {
    capacity: usize,
    state: RwLock<RingState>,
}

struct RingState {
    slots: Vec<Option<Event>>,
    /// Slot the next write lands in
    next: usize,
    len: usize,
    closed: bool,
}

impl Ring {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: RwLock::new(RingState {
                slots: vec![None; capacity],
                next: 0,
                len: 0,
                closed: false,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(|e| e.into_inner()).len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `n` stored events, newest first
    pub fn recent(&self, n: usize) -> Vec<Event> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let take = n.min(state.len);
        let mut out = Vec::with_capacity(take);
        for back in 1..=take {
            let slot = (state.next + self.capacity - back) % self.capacity;
            if let Some(event) = &state.slots[slot] {
                out.push(event.clone());
            }
        }
        out
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.state.read().unwrap_or_else(|e| e.into_inner()).closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for Ring {
    async fn open(&self, cancel: &CancellationToken) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        self.state.write().unwrap_or_else(|e| e.into_inner()).closed = false;
        Ok(())
    }

    async fn close(&self, _cancel: &CancellationToken) -> Result<(), StoreError> {
        self.state.write().unwrap_or_else(|e| e.into_inner()).closed = true;
        Ok(())
    }

    async fn write(&self, cancel: &CancellationToken, batch: &[Event]) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return Err(StoreError::Closed);
        }
        if self.capacity == 0 {
            return Ok(());
        }
        for event in batch {
            let slot = state.next;
            state.slots[slot] = Some(event.clone());
            state.next = (slot + 1) % self.capacity;
            state.len = (state.len + 1).min(self.capacity);
        }
        Ok(())
    }

    async fn read(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<mpsc::Receiver<Vec<Event>>, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        self.ensure_open()?;

        let snapshot = self.recent(self.capacity);
        let matches: Vec<Event> = snapshot
            .iter()
            .filter(|e| query.matches(e))
            .take(query.limit)
            .cloned()
            .collect();

        let (tx, rx) = mpsc::channel(matches.len().max(1));
        for event in matches {
            // Best-effort: anything past the queue bound is dropped
            if tx.try_send(vec![event]).is_err() {
                break;
            }
        }
        Ok(rx)
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
