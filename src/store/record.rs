//! Subscriber record and input validation

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};

/// An opaque numeric coordinate pair
///
/// Passed to the hazard check unmodified. Both components are finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting NaN and infinities
    pub fn new(x: f64, y: f64) -> StoreResult<Self> {
        if !x.is_finite() || !y.is_finite() {
            return Err(StoreError::InvalidInput(format!(
                "coordinate must be finite numbers, got ({}, {})",
                x, y
            )));
        }
        Ok(Self { x, y })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A subscribed email address and the location it monitors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Delivery address, letter case as registered
    pub email: String,

    /// Monitored location
    pub location: Coordinate,

    /// When the subscription was stored
    pub registered_at: DateTime<Utc>,
}

impl Subscriber {
    /// Build a validated subscriber stamped with the current time
    pub fn new(email: &str, x: f64, y: f64) -> StoreResult<Self> {
        Ok(Self {
            email: validate_email(email)?,
            location: Coordinate::new(x, y)?,
            registered_at: Utc::now(),
        })
    }

    /// Uniqueness key
    pub fn key(&self) -> String {
        email_key(&self.email)
    }
}

/// Trim and validate an email address
///
/// Requires a single `@` with non-empty local and domain parts and no
/// whitespace or control characters.
pub fn validate_email(email: &str) -> StoreResult<String> {
    let email = email.trim();

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| StoreError::InvalidInput(format!("email must contain '@': {:?}", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(StoreError::InvalidInput(format!(
            "malformed email address: {:?}",
            email
        )));
    }

    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(StoreError::InvalidInput(format!(
            "email contains whitespace or control characters: {:?}",
            email
        )));
    }

    Ok(email.to_string())
}

/// Case-insensitive comparison key for an email
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_subscriber() {
        let sub = Subscriber::new("  Alice@Example.com ", 1.5, -2.0).unwrap();

        assert_eq!(sub.email, "Alice@Example.com");
        assert_eq!(sub.key(), "alice@example.com");
        assert_eq!(sub.location, Coordinate { x: 1.5, y: -2.0 });
    }

    #[test]
    fn test_email_requires_at() {
        assert!(matches!(
            validate_email("alice.example.com"),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_email_parts_required() {
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("a@b@c").is_err());
        assert!(validate_email("al ice@example.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_control_characters_rejected() {
        match validate_email("ali\u{7}ce@example.com") {
            Err(StoreError::InvalidInput(msg)) => {
                assert!(msg.contains("whitespace or control characters"))
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_coordinates_rejected() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
        assert!(Subscriber::new("a@b.c", f64::NEG_INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_coordinate_display() {
        let c = Coordinate::new(3.0, 4.25).unwrap();
        assert_eq!(c.to_string(), "(3, 4.25)");
    }
}
