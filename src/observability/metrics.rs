//! Process-lifetime counters for the alert pipeline
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters accumulated across all sweeps of this process
///
/// Relaxed ordering is enough: counters are read for reporting only.
#[derive(Debug, Default)]
pub struct AlertMetrics {
    /// Sweeps that reached Reporting
    sweeps_completed: AtomicU64,
    /// Sweeps aborted because the subscriber list was unreadable
    sweeps_aborted: AtomicU64,
    /// Subscribers checked and found safe
    subscribers_safe: AtomicU64,
    /// Alerts delivered
    notifications_sent: AtomicU64,
    /// Hazard checks that failed or timed out
    check_failures: AtomicU64,
    /// Alerts dropped after exhausting retries
    notify_failures: AtomicU64,
    /// Individual send attempts, including retries
    send_attempts: AtomicU64,
    /// Subscribers not processed because of shutdown
    cancelled: AtomicU64,
}

impl AlertMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_sweeps_completed(&self) {
        self.sweeps_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sweeps_aborted(&self) {
        self.sweeps_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_safe(&self, n: u64) {
        self.subscribers_safe.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_notifications_sent(&self, n: u64) {
        self.notifications_sent.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_check_failures(&self, n: u64) {
        self.check_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_notify_failures(&self, n: u64) {
        self.notify_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_send_attempts(&self, n: u64) {
        self.send_attempts.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_cancelled(&self, n: u64) {
        self.cancelled.fetch_add(n, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sweeps_completed: self.sweeps_completed.load(Ordering::Relaxed),
            sweeps_aborted: self.sweeps_aborted.load(Ordering::Relaxed),
            subscribers_safe: self.subscribers_safe.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            check_failures: self.check_failures.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
            send_attempts: self.send_attempts.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }

    /// Current counters as a JSON object string
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub sweeps_completed: u64,
    pub sweeps_aborted: u64,
    pub subscribers_safe: u64,
    pub notifications_sent: u64,
    pub check_failures: u64,
    pub notify_failures: u64,
    pub send_attempts: u64,
    pub cancelled: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = AlertMetrics::new().snapshot();

        assert_eq!(snapshot.sweeps_completed, 0);
        assert_eq!(snapshot.notifications_sent, 0);
        assert_eq!(snapshot.check_failures, 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = AlertMetrics::new();

        metrics.increment_sweeps_completed();
        metrics.increment_sweeps_completed();
        metrics.increment_sweeps_aborted();
        metrics.add_safe(5);
        metrics.add_notifications_sent(2);
        metrics.add_send_attempts(3);
        metrics.add_check_failures(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sweeps_completed, 2);
        assert_eq!(snapshot.sweeps_aborted, 1);
        assert_eq!(snapshot.subscribers_safe, 5);
        assert_eq!(snapshot.notifications_sent, 2);
        assert_eq!(snapshot.send_attempts, 3);
        assert_eq!(snapshot.check_failures, 1);
        assert_eq!(snapshot.notify_failures, 0);
    }

    #[test]
    fn test_to_json_is_valid() {
        let metrics = AlertMetrics::new();
        metrics.add_notify_failures(4);

        let parsed: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(parsed["notify_failures"], 4);
        assert_eq!(parsed["sweeps_completed"], 0);
    }
}
