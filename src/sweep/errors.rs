//! # Sweep Errors
//!
//! Per-subscriber failures never become a `SweepError`; they are outcomes in
//! the summary. Only an unreadable subscriber list aborts a cycle.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for sweep cycles
pub type SweepResult<T> = Result<T, SweepError>;

/// Cycle-fatal sweep errors
#[derive(Debug, Clone, Error)]
pub enum SweepError {
    #[error("Subscriber list unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}
