//! # Hazard Check Errors

use thiserror::Error;

/// Result type for hazard checks
pub type CheckResult<T> = Result<T, CheckError>;

/// A hazard check that produced no answer
///
/// Never interpreted as "safe".
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error("Hazard check timed out after {0}ms")]
    Timeout(u64),

    #[error("Hazard service unreachable: {0}")]
    Transport(String),

    #[error("Hazard service returned HTTP {0}")]
    Status(u16),

    #[error("Invalid hazard service response: {0}")]
    InvalidResponse(String),

    #[error("Invalid hazard client configuration: {0}")]
    Config(String),
}
