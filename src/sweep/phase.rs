//! Sweep cycle state machine
//!
//! `Idle → Listing → Checking → Notifying → Reporting → Idle`
//!
//! Within a cycle the phase only moves forward, which lets concurrent
//! subscriber pipelines advance it without coordination.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Phase of the current sweep cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SweepPhase {
    Idle = 0,
    Listing = 1,
    Checking = 2,
    Notifying = 3,
    Reporting = 4,
}

impl SweepPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepPhase::Idle => "IDLE",
            SweepPhase::Listing => "LISTING",
            SweepPhase::Checking => "CHECKING",
            SweepPhase::Notifying => "NOTIFYING",
            SweepPhase::Reporting => "REPORTING",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => SweepPhase::Listing,
            2 => SweepPhase::Checking,
            3 => SweepPhase::Notifying,
            4 => SweepPhase::Reporting,
            _ => SweepPhase::Idle,
        }
    }
}

impl fmt::Display for SweepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared, lock-free holder of the current phase
#[derive(Debug, Default)]
pub struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> SweepPhase {
        SweepPhase::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move forward to `phase`; a no-op if already at or past it
    pub fn advance(&self, phase: SweepPhase) {
        self.0.fetch_max(phase as u8, Ordering::SeqCst);
    }

    /// End of cycle
    pub fn reset(&self) {
        self.0.store(SweepPhase::Idle as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        assert_eq!(PhaseCell::new().get(), SweepPhase::Idle);
    }

    #[test]
    fn test_only_moves_forward() {
        let cell = PhaseCell::new();

        cell.advance(SweepPhase::Listing);
        cell.advance(SweepPhase::Notifying);
        cell.advance(SweepPhase::Checking);

        assert_eq!(cell.get(), SweepPhase::Notifying);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let cell = PhaseCell::new();
        cell.advance(SweepPhase::Reporting);
        cell.reset();
        assert_eq!(cell.get(), SweepPhase::Idle);
    }
}
