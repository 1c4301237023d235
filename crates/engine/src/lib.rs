// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sift-engine: the filtered pub/sub bus

mod bus;
mod error;
mod pool;

pub use bus::{Bus, ConsumerId, Coordinator, Forwarded, Subscription};
pub use error::BusError;
pub use pool::{WorkerPool, WorkerToken};
