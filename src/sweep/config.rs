//! Sweep scheduling configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::backoff::RetryPolicy;

/// Sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweep starts (default: 300)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Subscribers processed concurrently (default: 8)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Orchestrator bound on one hazard check (default: 15000)
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,

    /// Orchestrator bound on one send attempt (default: 45000)
    #[serde(default = "default_notify_timeout_ms")]
    pub notify_timeout_ms: u64,

    /// Time in-flight work gets to finish after shutdown (default: 30)
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Notification retry policy
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_workers() -> usize {
    8
}

fn default_check_timeout_ms() -> u64 {
    15_000
}

fn default_notify_timeout_ms() -> u64 {
    45_000
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            workers: default_workers(),
            check_timeout_ms: default_check_timeout_ms(),
            notify_timeout_ms: default_notify_timeout_ms(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.interval_secs == 0 {
            return Err("sweep.interval_secs must be > 0".into());
        }
        if self.workers == 0 {
            return Err("sweep.workers must be > 0".into());
        }
        if self.check_timeout_ms == 0 || self.notify_timeout_ms == 0 {
            return Err("sweep timeouts must be > 0".into());
        }
        self.retry.validate()
    }
}
