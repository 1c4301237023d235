// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use crate::error::StoreError;
use crate::store::Store;
use async_trait::async_trait;
use sift_core::{Event, Query};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Wrapper that adds tracing to any Store
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for TracedStore<S> {
    async fn open(&self, cancel: &CancellationToken) -> Result<(), StoreError> {
        let result = self.inner.open(cancel).await;
        match &result {
            Ok(()) => tracing::info!("store opened"),
            Err(e) => tracing::error!(error = %e, "store open failed"),
        }
        result
    }

    async fn close(&self, cancel: &CancellationToken) -> Result<(), StoreError> {
        let result = self.inner.close(cancel).await;
        match &result {
            Ok(()) => tracing::info!("store closed"),
            Err(e) => tracing::warn!(error = %e, "store close failed"),
        }
        result
    }

    async fn write(&self, cancel: &CancellationToken, batch: &[Event]) -> Result<(), StoreError> {
        let span = tracing::debug_span!("store.write", events = batch.len());
        async {
            let start = std::time::Instant::now();
            let result = self.inner.write(cancel, batch).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::debug!(elapsed_us = elapsed.as_micros() as u64, "written"),
                Err(StoreError::Canceled) => tracing::debug!("write canceled"),
                Err(e) => tracing::error!(
                    elapsed_us = elapsed.as_micros() as u64,
                    error = %e,
                    "write failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn read(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<mpsc::Receiver<Vec<Event>>, StoreError> {
        let span = tracing::debug_span!("store.read", limit = query.limit, filter = %query.filter);
        async {
            let result = self.inner.read(cancel, query).await;
            match &result {
                Ok(_) => tracing::debug!("read started"),
                Err(e) => tracing::warn!(error = %e, "read failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
