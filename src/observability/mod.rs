//! Observability subsystem for geoalert
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Process-lifetime counters
//!
//! # Usage
//!
//! ```ignore
//! use geoalert::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::SweepComplete, &[("notified", "1")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity, LOG_LEVEL_ENV};
pub use metrics::{AlertMetrics, MetricsSnapshot};

fn default_severity(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(default_severity(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(default_severity(event), event.as_str(), fields);
}

/// Log an event at an explicit severity
pub fn log_event_at(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}
