//! # tokengate
//!
//! A concurrent, self-cleaning token bucket admission controller.
//!
//! ## Overview
//!
//! tokengate decides, per client identifier, whether a request may proceed:
//! - **Burst tolerance**: each client holds up to `bucket_size` tokens
//! - **Steady refill**: `tokens_per_interval` tokens are granted every `interval`
//! - **Per-key atomicity**: refill and consume for one client never interleave
//! - **Bounded memory**: idle clients are evicted by a background sweep
//!
//! Limiting is per process ("soft"): instances do not share state, and bucket
//! state is not persisted across restarts.
//!
//! ## Quick Start
//!
//! ```
//! use tokengate::{AdmissionController, RateLimitConfig};
//!
//! // 1 token every 2 seconds, burst of 10 (30 requests/minute steady state)
//! let controller = AdmissionController::new(RateLimitConfig::default());
//!
//! if controller.is_allowed("203.0.113.7") {
//!     println!("Request allowed! Remaining: {}", controller.remaining_tokens("203.0.113.7"));
//! } else {
//!     println!("Rate limited! Retry after: {} seconds", controller.reset_time_seconds("203.0.113.7"));
//! }
//! ```
//!
//! ## Simulated Time
//!
//! Every admission operation has an `_at` variant taking an explicit
//! [`Instant`](std::time::Instant), so tests can step time forward:
//!
//! ```
//! use tokengate::{AdmissionController, RateLimitConfig};
//! use std::time::{Duration, Instant};
//!
//! let controller = AdmissionController::new(RateLimitConfig::default());
//! let now = Instant::now();
//!
//! for _ in 0..10 {
//!     assert!(controller.is_allowed_at("1.2.3.4", now));
//! }
//! assert!(!controller.is_allowed_at("1.2.3.4", now));
//! assert!(controller.is_allowed_at("1.2.3.4", now + Duration::from_millis(2000)));
//! ```
//!
//! ## Cleanup Sweep
//!
//! With the `sweeper` feature (on by default) a tokio task evicts buckets idle
//! for longer than the configured idle timeout (5 minutes by default):
//!
//! ```
//! use tokengate::{AdmissionController, RateLimitConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tokengate::AdmissionError> {
//! let controller = AdmissionController::new(RateLimitConfig::default());
//! controller.start_cleanup(Duration::from_secs(60))?;
//! // ... serve requests ...
//! controller.stop_cleanup();
//! # Ok(())
//! # }
//! ```
//!
//! ## Refill Policy
//!
//! Only whole intervals are credited. [`RefillPolicy::Discard`] (default)
//! drops the partial interval on every check; [`RefillPolicy::Carry`] keeps it
//! for the next check.
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for faster hashing
//! - `sweeper` (default): Background cleanup task on tokio

pub mod core;

pub use core::{
    AdmissionController, AdmissionError, BucketStore, Decision, RateLimitConfig,
    RateLimitConfigBuilder, RefillPolicy,
};
