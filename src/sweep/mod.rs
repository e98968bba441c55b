//! Sweep subsystem for geoalert
//!
//! Periodically lists every subscriber, checks each location against the
//! hazard service and alerts the ones in danger. Concurrency is bounded by
//! a worker semaphore; shutdown is driven by a cancellation token.

mod backoff;
mod config;
mod errors;
mod orchestrator;
mod phase;
mod summary;

pub use backoff::RetryPolicy;
pub use config::SweepConfig;
pub use errors::{SweepError, SweepResult};
pub use orchestrator::Sweeper;
pub use phase::{PhaseCell, SweepPhase};
pub use summary::{Outcome, SubscriberReport, SweepSummary};
