//! Per-subscriber outcomes and the sweep summary

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::store::Coordinate;

/// What happened to one subscriber in one sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Checked, not hazardous, no action
    Safe,
    /// Hazardous and the alert was delivered
    Notified { attempts: u32 },
    /// The hazard check failed; no alert attempted
    CheckFailed { reason: String },
    /// Hazardous but every send attempt failed
    NotifyFailed { attempts: u32, reason: String },
    /// Not finished because the service was shutting down; `attempts`
    /// counts sends started before the pipeline was aborted
    Cancelled { attempts: u32 },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Safe => "safe",
            Outcome::Notified { .. } => "notified",
            Outcome::CheckFailed { .. } => "check_failed",
            Outcome::NotifyFailed { .. } => "notify_failed",
            Outcome::Cancelled { .. } => "cancelled",
        }
    }

    /// Send attempts made for this subscriber
    pub fn attempts(&self) -> u32 {
        match self {
            Outcome::Notified { attempts }
            | Outcome::NotifyFailed { attempts, .. }
            | Outcome::Cancelled { attempts } => *attempts,
            _ => 0,
        }
    }
}

/// Outcome for one subscriber
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriberReport {
    pub email: String,
    pub location: Coordinate,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Aggregated result of one sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub sweep_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub safe: usize,
    pub notified: usize,
    pub check_failed: usize,
    pub notify_failed: usize,
    pub cancelled: usize,
    pub reports: Vec<SubscriberReport>,
}

impl SweepSummary {
    pub fn new(sweep_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            sweep_id,
            started_at,
            finished_at: None,
            safe: 0,
            notified: 0,
            check_failed: 0,
            notify_failed: 0,
            cancelled: 0,
            reports: Vec::new(),
        }
    }

    /// Count and keep one subscriber's report
    pub fn record(&mut self, report: SubscriberReport) {
        match report.outcome {
            Outcome::Safe => self.safe += 1,
            Outcome::Notified { .. } => self.notified += 1,
            Outcome::CheckFailed { .. } => self.check_failed += 1,
            Outcome::NotifyFailed { .. } => self.notify_failed += 1,
            Outcome::Cancelled { .. } => self.cancelled += 1,
        }
        self.reports.push(report);
    }

    /// Mark the sweep finished
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Subscribers accounted for
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    /// Send attempts across all subscribers
    pub fn send_attempts(&self) -> u32 {
        self.reports.iter().map(|r| r.outcome.attempts()).sum()
    }

    /// Elapsed milliseconds, once finished
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Report for `email`, if it was part of the sweep
    pub fn report_for(&self, email: &str) -> Option<&SubscriberReport> {
        let key = crate::store::email_key(email);
        self.reports
            .iter()
            .find(|r| crate::store::email_key(&r.email) == key)
    }

    /// Counts as log fields
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("sweep_id", self.sweep_id.to_string()),
            ("total", self.total().to_string()),
            ("safe", self.safe.to_string()),
            ("notified", self.notified.to_string()),
            ("check_failed", self.check_failed.to_string()),
            ("notify_failed", self.notify_failed.to_string()),
            ("cancelled", self.cancelled.to_string()),
            (
                "duration_ms",
                self.duration_ms().map(|d| d.to_string()).unwrap_or_default(),
            ),
        ]
    }
}
