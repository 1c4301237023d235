// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the bus

use sift_pattern::ParseError;
use sift_storage::StoreError;
use thiserror::Error;

/// Errors that can occur on the bus
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BusError {
    #[error("operation canceled")]
    Canceled,
    #[error("timed out")]
    Timeout,
    #[error("bus closed")]
    Closed,
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
