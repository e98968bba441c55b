//! # Subscriber Store
//!
//! Durable mapping of email → coordinate.
//!
//! ## Invariants
//! - Emails are unique, compared case-insensitively
//! - Coordinates are finite numbers
//! - Readers never see a partially written file or set
//! - Every mutation is durable before it is acknowledged
//! - Mutations from separate handles or processes never overwrite each other

mod errors;
mod file;
mod record;
mod subscribers;

pub use errors::{StoreError, StoreResult};
pub use file::{lock_path, HEADER};
pub use record::{email_key, validate_email, Coordinate, Subscriber};
pub use subscribers::{SubscriberSource, SubscriberStore};
