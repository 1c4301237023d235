// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus tuning values
//!
//! Threaded explicitly through constructors; there is no global default.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Workers per available CPU
const WORKERS_PER_CPU: usize = 50;

/// Bus configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Background fan-out/replay tasks allowed at once
    pub workers: usize,
    /// Bus-wide ceiling on a consumer's replay limit
    pub max_replay: usize,
    /// How long one delivery to a consumer may block
    #[serde(with = "humantime_serde")]
    pub consumer_timeout: Duration,
    /// How long to wait for a worker before dropping a fan-out or replay
    #[serde(with = "humantime_serde")]
    pub workers_timeout: Duration,
    /// Events retained by the replay ring
    pub ring_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            workers: cpus * WORKERS_PER_CPU,
            max_replay: 100,
            consumer_timeout: Duration::from_secs(20),
            workers_timeout: Duration::from_secs(10),
            ring_capacity: 100,
        }
    }
}

impl BusConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_replay(mut self, max_replay: usize) -> Self {
        self.max_replay = max_replay;
        self
    }

    pub fn with_consumer_timeout(mut self, timeout: Duration) -> Self {
        self.consumer_timeout = timeout;
        self
    }

    pub fn with_workers_timeout(mut self, timeout: Duration) -> Self {
        self.workers_timeout = timeout;
        self
    }

    pub fn with_ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
