// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sift-core: data model shared by the bus and its adapters
//!
//! This crate provides:
//! - `Event` - one published unit with optional type tag and id
//! - `Query` - a consumer's replay settings and compiled filter
//! - `BusConfig` - explicit bus tuning values
//! - `Clock` - time source for event ids and timestamps

pub mod clock;
pub mod config;
pub mod event;
pub mod query;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::BusConfig;
pub use event::Event;
pub use query::Query;
