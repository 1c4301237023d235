// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History capability consumed by the bus

use crate::error::StoreError;
use async_trait::async_trait;
use sift_core::{Event, Query};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Event history the bus writes every publish to and replays from
///
/// Implementations do their own synchronization: the coordinator writes
/// while any number of replay tasks read.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn open(&self, cancel: &CancellationToken) -> Result<(), StoreError>;

    async fn close(&self, cancel: &CancellationToken) -> Result<(), StoreError>;

    /// Persist a published batch
    async fn write(&self, cancel: &CancellationToken, batch: &[Event]) -> Result<(), StoreError>;

    /// Stream stored events matching `query.filter`, at most `query.limit` of them
    ///
    /// The returned receiver yields batches and finishes once the read is exhausted.
    async fn read(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<mpsc::Receiver<Vec<Event>>, StoreError>;
}
