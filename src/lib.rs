//! geoalert - hazard alerts for geo-located email subscribers
//!
//! - `store`: durable, unique-by-email subscriber set
//! - `hazard`: client for the external hazard classifier
//! - `notifier`: alert email composition and SMTP delivery
//! - `sweep`: periodic, bounded-concurrency check-and-notify cycles
//! - `observability`: JSON-line logging and counters
//! - `cli`: configuration and the `geoalert` command line

pub mod cli;
pub mod hazard;
pub mod notifier;
pub mod observability;
pub mod store;
pub mod sweep;
