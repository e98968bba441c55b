//! # Hazard Check
//!
//! Client for the external hazard classifier. The classifier is opaque:
//! this module only knows how to ask it about a coordinate.
//!
//! Failures are always surfaced as [`CheckError`]; there is no retry here.

mod client;
mod errors;

pub use client::{HazardCheck, HazardClientConfig, HttpHazardClient};
pub use errors::{CheckError, CheckResult};
