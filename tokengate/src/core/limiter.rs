//! Token bucket admission controller
//!
//! This module provides the main [`AdmissionController`] which looks up or
//! creates a client's bucket, applies time-based refill, and consumes a
//! token, all as one atomic step per client.

use super::bucket::{TokenBucket, ceil_secs};
use super::{BucketStore, RateLimitConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "sweeper")]
use super::{AdmissionError, sweeper::Sweeper};

/// Outcome of a single admission check
///
/// All fields come from the same locked view of the client's bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// Maximum burst capacity
    pub limit: u32,
    /// Whole tokens left after this check
    pub remaining: u32,
    /// Predicted wait before the next token (zero if a token is available)
    pub retry_after: Duration,
}

impl Decision {
    /// `retry_after` rounded up to whole seconds
    pub fn retry_after_secs(&self) -> u64 {
        ceil_secs(self.retry_after)
    }
}

/// Per-client token bucket admission controller
///
/// A cheap-to-clone handle; clones share the same bucket store and cleanup
/// sweep. Dropping the last handle stops the sweep.
///
/// # Example
///
/// ```
/// use tokengate::{AdmissionController, RateLimitConfig};
///
/// // 1 token every 2 seconds, burst of 10
/// let controller = AdmissionController::new(RateLimitConfig::default());
///
/// for _ in 0..10 {
///     assert!(controller.is_allowed("1.2.3.4"));
/// }
/// assert!(!controller.is_allowed("1.2.3.4"));
/// assert_eq!(controller.reset_time_seconds("1.2.3.4"), 2);
/// ```
#[derive(Clone)]
pub struct AdmissionController {
    inner: Arc<Inner>,
}

struct Inner {
    config: RateLimitConfig,
    store: Arc<BucketStore>,
    #[cfg(feature = "sweeper")]
    sweeper: Sweeper,
}

impl AdmissionController {
    /// Create a controller with a default-sized store
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, BucketStore::new())
    }

    /// Create a controller over a preconfigured store
    pub fn with_store(config: RateLimitConfig, store: BucketStore) -> Self {
        AdmissionController {
            inner: Arc::new(Inner {
                config,
                store: Arc::new(store),
                #[cfg(feature = "sweeper")]
                sweeper: Sweeper::new(),
            }),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.inner.config
    }

    /// Number of clients currently holding a bucket
    pub fn tracked_clients(&self) -> usize {
        self.inner.store.len()
    }

    /// Check and charge one token for `key` at the current instant
    pub fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Instant::now())
    }

    /// Check and charge one token for `key` as of `now`
    ///
    /// An unseen key gets a new bucket with one token already charged and
    /// is admitted without a refill. An existing bucket is refilled by the
    /// whole intervals since its last refill, clamped to capacity, and then
    /// charged if it holds at least one token.
    pub fn is_allowed_at(&self, key: &str, now: Instant) -> bool {
        self.check_at(key, now).allowed
    }

    /// Full admission check for `key` at the current instant
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Full admission check for `key` as of `now`
    ///
    /// Same semantics as [`is_allowed_at`](Self::is_allowed_at), returning the
    /// post-check remaining tokens and wait hint alongside the verdict.
    ///
    /// # Example
    ///
    /// ```
    /// use tokengate::{AdmissionController, RateLimitConfig};
    /// use std::time::Instant;
    ///
    /// let controller = AdmissionController::new(RateLimitConfig::default());
    /// let decision = controller.check_at("user:123", Instant::now());
    /// assert!(decision.allowed);
    /// assert_eq!(decision.limit, 10);
    /// assert_eq!(decision.remaining, 9);
    /// ```
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let config = &self.inner.config;
        let limit = config.bucket_size();

        let decision = self.inner.store.upsert(
            key,
            || {
                let bucket = TokenBucket::fresh(config, now);
                let decision = Decision {
                    allowed: true,
                    limit,
                    remaining: bucket.remaining(),
                    retry_after: bucket.reset_after(config),
                };
                (bucket, decision)
            },
            |bucket| {
                bucket.refill(config, now);
                let allowed = bucket.try_consume();
                Decision {
                    allowed,
                    limit,
                    remaining: bucket.remaining(),
                    retry_after: bucket.reset_after(config),
                }
            },
        );

        if !decision.allowed {
            tracing::debug!(
                client = key,
                retry_after_ms = decision.retry_after.as_millis() as u64,
                "Admission denied"
            );
        }

        decision
    }

    /// Whole tokens held by `key` as of its last admission check
    ///
    /// This is an observational read: it does not refill, so it may
    /// under-report if time has passed since the client's last check.
    /// Returns the full bucket size for an unseen key.
    pub fn remaining_tokens(&self, key: &str) -> u32 {
        self.inner
            .store
            .peek(key, TokenBucket::remaining)
            .unwrap_or(self.inner.config.bucket_size())
    }

    /// Predicted time until `key` can be admitted
    ///
    /// Computed from the last observed bucket state, not a guarantee: a
    /// concurrent check may change it. Zero for an unseen key or when a
    /// token is available.
    pub fn reset_after(&self, key: &str) -> Duration {
        let config = &self.inner.config;
        self.inner
            .store
            .peek(key, |bucket| bucket.reset_after(config))
            .unwrap_or(Duration::ZERO)
    }

    /// [`reset_after`](Self::reset_after) rounded up to whole seconds
    pub fn reset_time_seconds(&self, key: &str) -> u64 {
        ceil_secs(self.reset_after(key))
    }

    /// Run one eviction pass as of `now`, returning the number of evicted buckets
    ///
    /// An evicted client starts over with a full bucket on its next request.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let removed = self
            .inner
            .store
            .sweep(now, self.inner.config.idle_timeout());
        if removed > 0 {
            tracing::debug!(removed, "Evicted idle buckets");
        }
        removed
    }

    /// Start the background cleanup sweep, running every `period`
    ///
    /// Returns `Ok(false)` without spawning if a sweep is already running.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::InvalidConfig`]: `period` is zero
    /// - [`AdmissionError::NoRuntime`]: called outside a tokio runtime
    #[cfg(feature = "sweeper")]
    pub fn start_cleanup(&self, period: Duration) -> Result<bool, AdmissionError> {
        self.inner.sweeper.start(
            Arc::downgrade(&self.inner.store),
            self.inner.config.idle_timeout(),
            period,
        )
    }

    /// Stop the background cleanup sweep
    ///
    /// Returns `false` if no sweep was running.
    #[cfg(feature = "sweeper")]
    pub fn stop_cleanup(&self) -> bool {
        self.inner.sweeper.stop()
    }

    #[cfg(feature = "sweeper")]
    pub fn is_cleanup_running(&self) -> bool {
        self.inner.sweeper.is_running()
    }
}
