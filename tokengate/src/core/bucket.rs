//! Per-client token bucket state and arithmetic

use super::config::{RateLimitConfig, RefillPolicy};
use std::time::{Duration, Instant};

/// Token bucket for a single client
///
/// `tokens` stays within `[0, bucket_size]` and `last_refill` never moves
/// backwards, even if a caller supplies an earlier `now`.
#[derive(Debug, Clone)]
pub(crate) struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A new bucket with one token already charged for the request creating it
    pub(crate) fn fresh(config: &RateLimitConfig, now: Instant) -> Self {
        TokenBucket {
            tokens: f64::from(config.bucket_size()) - 1.0,
            last_refill: now,
        }
    }

    pub(crate) fn last_refill(&self) -> Instant {
        self.last_refill
    }

    /// Credit whole intervals elapsed since `last_refill`
    pub(crate) fn refill(&mut self, config: &RateLimitConfig, now: Instant) {
        if now <= self.last_refill {
            return;
        }

        let elapsed = now - self.last_refill;
        let interval_ns = config.interval().as_nanos();
        let intervals = elapsed.as_nanos() / interval_ns;
        let tokens_to_add = intervals as f64 * f64::from(config.tokens_per_interval());
        let capacity = f64::from(config.bucket_size());
        self.tokens = (self.tokens + tokens_to_add).clamp(0.0, capacity);

        self.last_refill = match config.refill_policy() {
            RefillPolicy::Discard => now,
            RefillPolicy::Carry if self.tokens >= capacity => now,
            RefillPolicy::Carry => {
                // remainder < elapsed, so this never precedes the old last_refill
                let remainder = elapsed.as_nanos() % interval_ns;
                now - Duration::from_nanos(remainder as u64)
            }
        };
    }

    /// Take one token if available
    pub(crate) fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens as of the last refill
    pub(crate) fn remaining(&self) -> u32 {
        self.tokens.floor().max(0.0) as u32
    }

    /// Predicted wait until one token is available, from the last observed state
    ///
    /// Rounded up to whole milliseconds. Zero when a token is available now.
    /// Refill credits whole intervals only, so with more than one token per
    /// interval the actual wait can be up to a full interval.
    pub(crate) fn reset_after(&self, config: &RateLimitConfig) -> Duration {
        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }

        let tokens_needed = 1.0 - self.tokens;
        let interval_ms = config.interval().as_secs_f64() * 1000.0;
        let ms = (tokens_needed / f64::from(config.tokens_per_interval()) * interval_ms).ceil();
        Duration::from_millis(ms.max(0.0) as u64)
    }

    #[cfg(test)]
    pub(crate) fn tokens(&self) -> f64 {
        self.tokens
    }
}

/// Round a wait up to whole seconds
pub(crate) fn ceil_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs();
    if wait.subsec_nanos() > 0 { secs + 1 } else { secs }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(policy: RefillPolicy) -> RateLimitConfig {
        RateLimitConfig::builder()
            .tokens_per_interval(1)
            .interval(Duration::from_millis(2000))
            .bucket_size(10)
            .refill_policy(policy)
            .build()
            .unwrap()
    }

    #[test]
    fn test_fresh_bucket_is_precharged() {
        let config = config(RefillPolicy::Discard);
        let now = Instant::now();
        let bucket = TokenBucket::fresh(&config, now);
        assert_eq!(bucket.remaining(), 9);
        assert_eq!(bucket.last_refill(), now);
    }

    #[test]
    fn test_refill_clamps_to_capacity() {
        let config = config(RefillPolicy::Discard);
        let now = Instant::now();
        let mut bucket = TokenBucket::fresh(&config, now);

        bucket.refill(&config, now + Duration::from_secs(3600));
        assert_eq!(bucket.tokens(), 10.0);
        assert_eq!(bucket.remaining(), 10);
    }

    #[test]
    fn test_discard_drops_partial_interval() {
        let config = config(RefillPolicy::Discard);
        let now = Instant::now();
        let mut bucket = TokenBucket::fresh(&config, now);
        while bucket.try_consume() {}

        // Two checks 1.5s apart: 3s total, but neither saw a whole interval
        bucket.refill(&config, now + Duration::from_millis(1500));
        bucket.refill(&config, now + Duration::from_millis(3000));
        assert_eq!(bucket.remaining(), 0);
        assert_eq!(bucket.last_refill(), now + Duration::from_millis(3000));
    }

    #[test]
    fn test_carry_keeps_partial_interval() {
        let config = config(RefillPolicy::Carry);
        let now = Instant::now();
        let mut bucket = TokenBucket::fresh(&config, now);
        while bucket.try_consume() {}

        bucket.refill(&config, now + Duration::from_millis(1500));
        assert_eq!(bucket.remaining(), 0);
        assert_eq!(bucket.last_refill(), now);

        bucket.refill(&config, now + Duration::from_millis(3000));
        assert_eq!(bucket.remaining(), 1);
        assert_eq!(bucket.last_refill(), now + Duration::from_millis(2000));
    }

    #[test]
    fn test_carry_drops_remainder_when_full() {
        let config = config(RefillPolicy::Carry);
        let now = Instant::now();
        let mut bucket = TokenBucket::fresh(&config, now);

        let later = now + Duration::from_millis(2500);
        bucket.refill(&config, later);
        assert_eq!(bucket.remaining(), 10);
        assert_eq!(bucket.last_refill(), later);
    }

    #[test]
    fn test_last_refill_never_moves_backwards() {
        let config = config(RefillPolicy::Discard);
        let now = Instant::now() + Duration::from_secs(10);
        let mut bucket = TokenBucket::fresh(&config, now);

        bucket.refill(&config, now - Duration::from_secs(5));
        assert_eq!(bucket.last_refill(), now);
        assert_eq!(bucket.remaining(), 9);
    }

    #[test]
    fn test_reset_after() {
        let config = config(RefillPolicy::Discard);
        let now = Instant::now();
        let mut bucket = TokenBucket::fresh(&config, now);
        assert_eq!(bucket.reset_after(&config), Duration::ZERO);

        while bucket.try_consume() {}
        assert_eq!(bucket.reset_after(&config), Duration::from_millis(2000));
        assert_eq!(ceil_secs(bucket.reset_after(&config)), 2);
    }

    #[test]
    fn test_reset_after_scales_with_grant_size() {
        let config = RateLimitConfig::new(4, Duration::from_millis(1000), 2).unwrap();
        let mut bucket = TokenBucket::fresh(&config, Instant::now());
        while bucket.try_consume() {}
        assert_eq!(bucket.reset_after(&config), Duration::from_millis(250));
        assert_eq!(ceil_secs(bucket.reset_after(&config)), 1);
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::ZERO), 0);
        assert_eq!(ceil_secs(Duration::from_millis(1)), 1);
        assert_eq!(ceil_secs(Duration::from_millis(2000)), 2);
        assert_eq!(ceil_secs(Duration::from_millis(2001)), 3);
    }
}
