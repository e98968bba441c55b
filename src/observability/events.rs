//! Observable events for geoalert
//!
//! Every log line the service emits names one of these events.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & Lifecycle
    /// Service startup begins
    BootStart,
    /// Service startup complete, sweeps scheduled
    BootComplete,
    /// Startup failed (FATAL)
    BootFailed,
    /// Shutdown initiated
    ShutdownStart,
    /// Shutdown complete
    ShutdownComplete,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Subscriber store
    /// Subscriber file loaded
    StoreLoaded,
    /// Duplicate row dropped while loading
    StoreDuplicateDropped,
    /// Subscriber added
    SubscriberAdded,
    /// Subscriber removed
    SubscriberRemoved,

    // Mail transport
    /// Mail transport connection verified
    MailVerified,

    // Sweep
    /// Sweep cycle begins
    SweepBegin,
    /// Sweep cycle complete
    SweepComplete,
    /// Sweep cycle aborted, subscriber list unreadable. Fatal for the cycle
    SweepAborted,
    /// Shutdown grace period elapsed, in-flight work aborted
    SweepGraceExpired,

    // Per subscriber
    /// Location checked and not hazardous
    SubscriberSafe,
    /// Location is hazardous
    HazardDetected,
    /// Hazard check failed
    CheckFailed,
    /// Alert delivered
    NotifySent,
    /// Alert send attempt failed, will retry
    NotifyRetry,
    /// Alert send failed after all attempts
    NotifyFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "GEOALERT_STARTUP_BEGIN",
            Event::BootComplete => "GEOALERT_STARTUP_COMPLETE",
            Event::BootFailed => "GEOALERT_STARTUP_FAILED",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::StoreLoaded => "STORE_LOADED",
            Event::StoreDuplicateDropped => "STORE_DUPLICATE_DROPPED",
            Event::SubscriberAdded => "SUBSCRIBER_ADDED",
            Event::SubscriberRemoved => "SUBSCRIBER_REMOVED",

            Event::MailVerified => "MAIL_TRANSPORT_VERIFIED",

            Event::SweepBegin => "SWEEP_BEGIN",
            Event::SweepComplete => "SWEEP_COMPLETE",
            Event::SweepAborted => "SWEEP_ABORTED",
            Event::SweepGraceExpired => "SWEEP_GRACE_EXPIRED",

            Event::SubscriberSafe => "SUBSCRIBER_SAFE",
            Event::HazardDetected => "HAZARD_DETECTED",
            Event::CheckFailed => "CHECK_FAILED",
            Event::NotifySent => "NOTIFY_SENT",
            Event::NotifyRetry => "NOTIFY_RETRY",
            Event::NotifyFailed => "NOTIFY_FAILED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::BootFailed | Event::SweepAborted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
