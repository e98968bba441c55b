//! # Store Errors

use thiserror::Error;

/// Result type for subscriber store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Subscriber store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Malformed email or coordinate, rejected before persistence
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Email already subscribed
    #[error("Email already subscribed: {0}")]
    DuplicateEmail(String),

    /// No subscriber with this email
    #[error("Subscriber not found: {0}")]
    NotFound(String),

    /// Subscriber file contains a row that cannot be loaded
    #[error("Corrupt subscriber file at line {line}: {reason}")]
    Corrupt { line: u64, reason: String },

    /// Reading or writing the subscriber file failed
    #[error("Subscriber file I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Get HTTP status code for a web adapter
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::InvalidInput(_) => 400,
            StoreError::NotFound(_) => 404,
            StoreError::DuplicateEmail(_) => 409,
            StoreError::Corrupt { .. } => 500,
            StoreError::Io(_) => 500,
            StoreError::Internal(_) => 500,
        }
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidInput(_) => "GEOALERT_STORE_INVALID_INPUT",
            StoreError::DuplicateEmail(_) => "GEOALERT_STORE_DUPLICATE_EMAIL",
            StoreError::NotFound(_) => "GEOALERT_STORE_NOT_FOUND",
            StoreError::Corrupt { .. } => "GEOALERT_STORE_CORRUPT",
            StoreError::Io(_) => "GEOALERT_STORE_IO",
            StoreError::Internal(_) => "GEOALERT_STORE_INTERNAL",
        }
    }

    /// Caller mistakes, as opposed to store failures
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidInput(_) | StoreError::DuplicateEmail(_) | StoreError::NotFound(_)
        )
    }
}
