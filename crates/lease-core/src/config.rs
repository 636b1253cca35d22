//! Protocol configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default lease window (5 minutes).
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(300);

/// Longest lease window accepted (30 days).
pub const MAX_LEASE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// How a fresh lease is written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Atomic set-if-absent. Two concurrent creators cannot both win.
    #[default]
    IfAbsent,
    /// Read, then unconditional set. Concurrent creators may overwrite
    /// each other (lost update); the later write wins.
    Overwrite,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::IfAbsent => f.write_str("if-absent"),
            WriteMode::Overwrite => f.write_str("overwrite"),
        }
    }
}

/// Invalid protocol configuration.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid lease configuration: {0}")]
pub struct InvalidConfig(String);

/// Settings for a [`LeaseManager`](crate::LeaseManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseConfig {
    /// Lifetime of a freshly minted lease.
    pub ttl: Duration,
    /// Write strategy for lease creation.
    pub write_mode: WriteMode,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_LEASE_TTL,
            write_mode: WriteMode::default(),
        }
    }
}

impl LeaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lease window.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the write strategy.
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Lease window in whole seconds, as reported in `expireAt`.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Reject windows the store cannot express.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.ttl.as_secs() == 0 {
            return Err(InvalidConfig(format!(
                "ttl must be at least one second, got {:?}",
                self.ttl
            )));
        }
        if self.ttl > MAX_LEASE_TTL {
            return Err(InvalidConfig(format!(
                "ttl must be at most {} seconds, got {}",
                MAX_LEASE_TTL.as_secs(),
                self.ttl.as_secs()
            )));
        }
        if self.ttl.subsec_nanos() != 0 {
            return Err(InvalidConfig(format!(
                "ttl must be a whole number of seconds, got {:?}",
                self.ttl
            )));
        }
        Ok(())
    }
}
