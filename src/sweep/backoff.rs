//! # Retry policy for alert delivery
//!
//! The delay before retry `n` (0-indexed) is `first × factor^n`, clamped to
//! `max`. The base is derived from the attempt number alone.
//!
//! ```rust
//! use std::time::Duration;
//! use geoalert::sweep::RetryPolicy;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.max_attempts, 3);
//! assert_eq!(policy.delay(0), Duration::from_secs(1));
//! assert_eq!(policy.delay(1), Duration::from_secs(2));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded exponential backoff for notification retries
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total send attempts per alert, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(default = "default_first", with = "millis")]
    pub first: Duration,

    /// Maximum delay cap
    #[serde(default = "default_max", with = "millis")]
    pub max: Duration,

    /// Multiplicative growth factor
    #[serde(default = "default_factor")]
    pub factor: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_first() -> Duration {
    Duration::from_secs(1)
}

fn default_max() -> Duration {
    Duration::from_secs(30)
}

fn default_factor() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    /// 3 attempts, 1s then 2s, capped at 30s
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            first: default_first(),
            max: default_max(),
            factor: default_factor(),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (0-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be >= 1".into());
        }
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err("retry.factor must be >= 1.0".into());
        }
        if self.first > self.max {
            return Err("retry.first must not exceed retry.max".into());
        }
        Ok(())
    }
}

/// Durations as integer milliseconds in config files
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
    }

    #[test]
    fn test_clamped_to_max() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay(10), Duration::from_secs(30));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_constant_factor() {
        let policy = RetryPolicy {
            factor: 1.0,
            first: Duration::from_millis(250),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay(0), Duration::from_millis(250));
        assert_eq!(policy.delay(5), Duration::from_millis(250));
    }

    #[test]
    fn test_config_in_millis() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"max_attempts": 5, "first": 200}"#).unwrap();

        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.first, Duration::from_millis(200));
        assert_eq!(policy.max, Duration::from_secs(30));
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        }
        .validate()
        .is_err());
        assert!(RetryPolicy {
            factor: 0.5,
            ..RetryPolicy::default()
        }
        .validate()
        .is_err());
    }
}
