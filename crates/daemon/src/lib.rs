// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sift daemon: HTTP transport, stdin ingestion and process lifecycle

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod ingest;
pub mod lifecycle;
pub mod server;

pub use config::{Args, ConfigError, DaemonConfig};
pub use lifecycle::{startup, Daemon, LifecycleError, Running};
