// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::error::StoreError;
use crate::store::Store;
use async_trait::async_trait;
use sift_core::{Event, Query};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Open,
    Close,
    Write { len: usize },
    Read { limit: usize },
}

#[derive(Default)]
struct FakeState {
    events: Vec<Event>,
    calls: Vec<StoreCall>,
    write_error: Option<StoreError>,
}

/// Unbounded in-memory store that records calls and can be told to fail
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later write fail with `error`
    pub fn fail_writes(&self, error: StoreError) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .write_error = Some(error);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Stored events, oldest first
    pub fn events(&self) -> Vec<Event> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .events
            .clone()
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn open(&self, _cancel: &CancellationToken) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(StoreCall::Open);
        Ok(())
    }

    async fn close(&self, _cancel: &CancellationToken) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(StoreCall::Close);
        Ok(())
    }

    async fn write(&self, cancel: &CancellationToken, batch: &[Event]) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(StoreCall::Write { len: batch.len() });
        if let Some(error) = &state.write_error {
            return Err(error.clone());
        }
        state.events.extend_from_slice(batch);
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
        let matches: Vec<Event> = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.calls.push(StoreCall::Read { limit: query.limit });
            state
                .events
                .iter()
                .rev()
                .filter(|e| query.matches(e))
                .take(query.limit)
                .cloned()
                .collect()
        };
        let (tx, rx) = mpsc::channel(matches.len().max(1));
        for event in matches {
            let _ = tx.try_send(vec![event]);
        }
        Ok(rx)
    }
}
