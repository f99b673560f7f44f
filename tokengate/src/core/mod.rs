//! Core components of the tokengate admission controller
//!
//! This module contains the fundamental building blocks:
//! - [`config`]: Process-wide rate limit parameters and refill policy
//! - [`bucket`]: Per-client token bucket arithmetic
//! - [`store`]: Sharded storage of bucket state
//! - [`limiter`]: The admission decision engine
//! - `sweeper`: Background eviction of idle buckets (feature `sweeper`)

pub(crate) mod bucket;
pub mod config;
pub mod limiter;
pub mod store;
#[cfg(feature = "sweeper")]
mod sweeper;
#[cfg(test)]
mod tests;

pub use config::{RateLimitConfig, RateLimitConfigBuilder, RefillPolicy};
pub use limiter::{AdmissionController, Decision};
pub use store::BucketStore;

use thiserror::Error;

/// Errors that can occur while configuring or driving the admission controller
///
/// Admission queries themselves never fail; these only surface from
/// construction and lifecycle calls.
///
/// # Example
///
/// ```
/// use tokengate::{AdmissionError, RateLimitConfig};
/// use std::time::Duration;
///
/// match RateLimitConfig::new(0, Duration::from_secs(1), 10) {
///     Err(AdmissionError::InvalidConfig(msg)) => println!("rejected: {msg}"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// Rate limit parameters are invalid (zero tokens, interval, bucket size or period)
    #[error("invalid rate limit configuration: {0}")]
    InvalidConfig(String),
    /// The background sweep was started outside of a tokio runtime
    #[error("cleanup sweep requires a running tokio runtime")]
    NoRuntime,
}
