// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store operation canceled")]
    Canceled,
    #[error("store is closed")]
    Closed,
    #[error("store backend failed: {0}")]
    Backend(String),
}
