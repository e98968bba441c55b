//! # Notifier Errors

use thiserror::Error;

/// Result type for alert delivery
pub type SendResult<T> = Result<T, SendError>;

/// Alert delivery errors
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// Sender or recipient address does not parse
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Message could not be assembled
    #[error("Failed to build email: {0}")]
    Build(String),

    /// SMTP connect, STARTTLS, auth or send failure
    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail send timed out after {0}ms")]
    Timeout(u64),
}

impl SendError {
    /// Errors that will fail the same way on every retry
    pub fn is_permanent(&self) -> bool {
        matches!(self, SendError::InvalidAddress(_) | SendError::Build(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_errors() {
        assert!(SendError::InvalidAddress("nobody".into()).is_permanent());
        assert!(SendError::Build("no body".into()).is_permanent());
        assert!(!SendError::Transport("connection refused".into()).is_permanent());
        assert!(!SendError::Timeout(30_000).is_permanent());
    }
}
