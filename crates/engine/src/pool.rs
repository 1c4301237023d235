// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded pool of background workers

use crate::error::BusError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Fixed set of interchangeable tokens gating background tasks
#[derive(Clone, Debug)]
pub struct WorkerPool {
    size: usize,
    semaphore: Arc<Semaphore>,
}

/// Proof of a held worker slot; dropping it returns the slot
#[derive(Debug)]
pub struct WorkerToken {
    _permit: OwnedSemaphorePermit,
}

impl WorkerPool {
    /// Sizes above the semaphore's permit limit are clamped to it
    pub fn new(size: usize) -> Self {
        let size = size.min(Semaphore::MAX_PERMITS);
        Self {
            size,
            semaphore: Arc::new(Semaphore::new(size)),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Tokens not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait up to `timeout` for a free token
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<WorkerToken, BusError> {
        let acquire = tokio::time::timeout(timeout, self.semaphore.clone().acquire_owned());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BusError::Canceled),
            acquired = acquire => match acquired {
                Ok(Ok(permit)) => Ok(WorkerToken { _permit: permit }),
                Ok(Err(_)) => Err(BusError::Closed),
                Err(_) => Err(BusError::Timeout),
            },
        }
    }

    /// Return a token to the pool
    pub fn release(&self, token: WorkerToken) {
        drop(token);
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
