//! Rate limit parameters for the token bucket
//!
//! This module provides the [`RateLimitConfig`] type which fixes, for the
//! whole process, how fast tokens are granted and how large a burst may be.
//! It converts human-friendly rate specifications (e.g., "30 requests per
//! minute") into a per-interval grant.

use super::AdmissionError;
use std::time::Duration;

#[cfg(test)]
mod tests;

const DEFAULT_TOKENS_PER_INTERVAL: u32 = 1;
const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);
const DEFAULT_BUCKET_SIZE: u32 = 10;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How sub-interval progress is treated when a bucket is refilled
///
/// Refill only ever credits whole intervals. The policy decides what happens
/// to the time left over after the last whole interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefillPolicy {
    /// Reset `last_refill` to `now` on every check, dropping any partial
    /// interval. A client polling faster than `interval` never earns a token
    /// back until it pauses for a full interval.
    #[default]
    Discard,
    /// Advance `last_refill` only by the whole intervals credited, so the
    /// remainder counts toward the next token. A full bucket drops its
    /// remainder so no credit is banked above capacity.
    Carry,
}

/// Process-wide token bucket parameters, immutable after construction
///
/// # Examples
///
/// ```
/// use tokengate::RateLimitConfig;
/// use std::time::Duration;
///
/// // The reference configuration: 1 token every 2 seconds, burst of 10
/// let config = RateLimitConfig::default();
/// assert_eq!(config.tokens_per_interval(), 1);
/// assert_eq!(config.interval(), Duration::from_millis(2000));
/// assert_eq!(config.bucket_size(), 10);
///
/// // 30 requests per minute with a burst of 10
/// let config = RateLimitConfig::per_minute(30, 10).unwrap();
/// assert_eq!(config.interval(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    tokens_per_interval: u32,
    interval: Duration,
    bucket_size: u32,
    refill_policy: RefillPolicy,
    idle_timeout: Duration,
}

impl RateLimitConfig {
    /// Creates a configuration granting `tokens_per_interval` tokens every
    /// `interval`, with at most `bucket_size` tokens held at once
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::InvalidConfig`] if any parameter is zero.
    pub fn new(
        tokens_per_interval: u32,
        interval: Duration,
        bucket_size: u32,
    ) -> Result<Self, AdmissionError> {
        Self::builder()
            .tokens_per_interval(tokens_per_interval)
            .interval(interval)
            .bucket_size(bucket_size)
            .build()
    }

    /// Creates a rate of `n` tokens per second, one every `1s / n`
    ///
    /// # Example
    ///
    /// ```
    /// use tokengate::RateLimitConfig;
    /// use std::time::Duration;
    ///
    /// let config = RateLimitConfig::per_second(10, 20).unwrap();
    /// assert_eq!(config.interval(), Duration::from_millis(100));
    /// ```
    pub fn per_second(n: u32, bucket_size: u32) -> Result<Self, AdmissionError> {
        Self::from_count_and_period(n, Duration::from_secs(1), bucket_size)
    }

    /// Creates a rate of `n` tokens per minute, one every `60s / n`
    pub fn per_minute(n: u32, bucket_size: u32) -> Result<Self, AdmissionError> {
        Self::from_count_and_period(n, Duration::from_secs(60), bucket_size)
    }

    fn from_count_and_period(
        count: u32,
        period: Duration,
        bucket_size: u32,
    ) -> Result<Self, AdmissionError> {
        if count == 0 {
            return Err(AdmissionError::InvalidConfig(
                "count per period must be greater than zero".into(),
            ));
        }
        Self::new(1, period / count, bucket_size)
    }

    /// Create a new builder starting from the reference configuration
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::default()
    }

    /// Tokens granted per whole `interval`
    pub fn tokens_per_interval(&self) -> u32 {
        self.tokens_per_interval
    }

    /// Duration of one grant cycle
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum burst capacity, also the capacity of a new client
    pub fn bucket_size(&self) -> u32 {
        self.bucket_size
    }

    pub fn refill_policy(&self) -> RefillPolicy {
        self.refill_policy
    }

    /// How long a bucket may go untouched before a sweep evicts it
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            tokens_per_interval: DEFAULT_TOKENS_PER_INTERVAL,
            interval: DEFAULT_INTERVAL,
            bucket_size: DEFAULT_BUCKET_SIZE,
            refill_policy: RefillPolicy::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Builder for configuring a [`RateLimitConfig`]
///
/// # Example
///
/// ```
/// use tokengate::{RateLimitConfig, RefillPolicy};
/// use std::time::Duration;
///
/// let config = RateLimitConfig::builder()
///     .tokens_per_interval(5)
///     .interval(Duration::from_secs(1))
///     .bucket_size(50)
///     .refill_policy(RefillPolicy::Carry)
///     .idle_timeout(Duration::from_secs(600))
///     .build()
///     .unwrap();
/// assert_eq!(config.bucket_size(), 50);
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfigBuilder {
    config: RateLimitConfig,
}

impl Default for RateLimitConfigBuilder {
    fn default() -> Self {
        Self {
            config: RateLimitConfig::default(),
        }
    }
}

impl RateLimitConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens_per_interval(mut self, tokens: u32) -> Self {
        self.config.tokens_per_interval = tokens;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn bucket_size(mut self, size: u32) -> Self {
        self.config.bucket_size = size;
        self
    }

    pub fn refill_policy(mut self, policy: RefillPolicy) -> Self {
        self.config.refill_policy = policy;
        self
    }

    /// Set the staleness threshold used by the cleanup sweep
    ///
    /// Buckets untouched for strictly longer than this are evicted.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::InvalidConfig`] if tokens per interval,
    /// interval, bucket size or idle timeout is zero.
    pub fn build(self) -> Result<RateLimitConfig, AdmissionError> {
        let config = self.config;
        if config.tokens_per_interval == 0 {
            return Err(AdmissionError::InvalidConfig(
                "tokens per interval must be greater than zero".into(),
            ));
        }
        if config.interval.is_zero() {
            return Err(AdmissionError::InvalidConfig(
                "interval must be greater than zero".into(),
            ));
        }
        if config.bucket_size == 0 {
            return Err(AdmissionError::InvalidConfig(
                "bucket size must be greater than zero".into(),
            ));
        }
        if config.idle_timeout.is_zero() {
            return Err(AdmissionError::InvalidConfig(
                "idle timeout must be greater than zero".into(),
            ));
        }
        Ok(config)
    }
}
