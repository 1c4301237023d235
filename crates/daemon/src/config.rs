// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: defaults, then an optional TOML file, then flags

use clap::Parser;
use serde::{Deserialize, Serialize};
use sift_core::BusConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("cannot render config: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("{field} = {value} exceeds the maximum of {max}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        max: usize,
    },
}

/// Upper bound on `bus.workers`
pub const MAX_WORKERS: usize = 1 << 20;

/// Upper bound on `bus.ring_capacity`; the ring is allocated up front
pub const MAX_RING_CAPACITY: usize = 1 << 20;

/// Command-line flags for siftd
#[derive(Debug, Default, Parser)]
#[command(
    name = "siftd",
    version,
    about = "Filtered publish/subscribe event bus over server-sent events"
)]
pub struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Event type given to lines read from stdin
    #[arg(long)]
    pub topic: Option<String>,

    /// Events delivered per SSE connection before it is closed
    #[arg(long, value_name = "N")]
    pub session_limit: Option<usize>,

    /// Ceiling on events replayed to one subscriber
    #[arg(long, value_name = "N")]
    pub max_replay: Option<usize>,

    /// Background fan-out/replay tasks allowed at once
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Events kept for replay
    #[arg(long, value_name = "N")]
    pub ring_capacity: Option<usize>,

    /// Per-delivery timeout (e.g. "20s", "500ms")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub consumer_timeout: Option<Duration>,

    /// Wait for a free worker before dropping a fan-out (e.g. "10s")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub workers_timeout: Option<Duration>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Do not ingest events from stdin
    #[arg(long)]
    pub no_stdin: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Effective daemon configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub listen: SocketAddr,
    pub topic: String,
    pub session_limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    pub bus: BusConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8000)),
            topic: "stdin".to_string(),
            session_limit: 1000,
            log_file: None,
            bus: BusConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Resolve configuration for the given flags
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let base = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_args(args);
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot be honored without exhausting the process
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("workers", self.bus.workers, MAX_WORKERS),
            ("ring_capacity", self.bus.ring_capacity, MAX_RING_CAPACITY),
        ];
        for (field, value, max) in limits {
            if value > max {
                return Err(ConfigError::OutOfRange { field, value, max });
            }
        }
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay any flags that were given
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(listen) = args.listen {
            self.listen = listen;
        }
        if let Some(topic) = &args.topic {
            self.topic = topic.clone();
        }
        if let Some(n) = args.session_limit {
            self.session_limit = n;
        }
        if let Some(path) = &args.log_file {
            self.log_file = Some(path.clone());
        }
        if let Some(n) = args.max_replay {
            self.bus = self.bus.with_max_replay(n);
        }
        if let Some(n) = args.workers {
            self.bus = self.bus.with_workers(n);
        }
        if let Some(n) = args.ring_capacity {
            self.bus = self.bus.with_ring_capacity(n);
        }
        if let Some(d) = args.consumer_timeout {
            self.bus = self.bus.with_consumer_timeout(d);
        }
        if let Some(d) = args.workers_timeout {
            self.bus = self.bus.with_workers_timeout(d);
        }
        self
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
