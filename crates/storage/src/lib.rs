// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! sift-storage: event history for replay
//!
//! This crate provides:
//! - `Store` - the history capability the bus persists to and replays from
//! - `Ring` - fixed-capacity in-memory circular buffer
//! - `TracedStore` - wrapper that logs every store call

mod error;
mod ring;
mod store;
mod traced;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use error::StoreError;
pub use ring::Ring;
pub use store::Store;
pub use traced::TracedStore;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStore, StoreCall};
