//! Sharded storage for per-client bucket state
//!
//! Keys are partitioned across shards, each guarded by its own lock. All
//! mutations of one bucket happen under its shard lock, so a refill and
//! the consume that follows it are never interleaved with another request
//! for the same key. Keys on different shards proceed in parallel.

use super::bucket::TokenBucket;
use parking_lot::Mutex;
use std::hash::BuildHasher;
use std::time::{Duration, Instant};

#[cfg(feature = "ahash")]
use ahash::{AHashMap as HashMap, RandomState};
#[cfg(not(feature = "ahash"))]
use std::collections::{HashMap, hash_map::RandomState};


// Shards per available core
const SHARDS_PER_CORE: usize = 4;
const FALLBACK_PARALLELISM: usize = 4;

type Shard = Mutex<HashMap<String, TokenBucket>>;

/// Mapping from client identifier to token bucket
///
/// The store exclusively owns every bucket. Callers outside the crate can
/// size it and observe how many clients it tracks, never the buckets
/// themselves.
///
/// # Example
///
/// ```
/// use tokengate::{AdmissionController, BucketStore, RateLimitConfig};
///
/// let store = BucketStore::with_shards(16);
/// let controller = AdmissionController::with_store(RateLimitConfig::default(), store);
/// assert!(controller.is_allowed("10.0.0.1"));
/// assert_eq!(controller.tracked_clients(), 1);
/// ```
pub struct BucketStore {
    shards: Box<[Shard]>,
    hasher: RandomState,
}

impl BucketStore {
    /// Create a store with four shards per available core
    pub fn new() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(FALLBACK_PARALLELISM);
        Self::with_shards(cores * SHARDS_PER_CORE)
    }

    /// Create a store with a fixed number of shards (at least one)
    pub fn with_shards(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::default()))
            .collect();
        BucketStore {
            shards,
            hasher: RandomState::default(),
        }
    }

    fn shard(&self, key: &str) -> &Shard {
        let index = (BuildHasher::hash_one(&self.hasher, key) as usize) % self.shards.len();
        &self.shards[index]
    }

    /// Number of tracked clients across all shards
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }

    /// Whether a bucket is currently held for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.shard(key).lock().contains_key(key)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Create or update the bucket for `key` under a single lock acquisition
    ///
    /// `create` runs when the key is absent and its bucket is inserted;
    /// `update` runs against the existing bucket otherwise. The shard lock
    /// is held for the whole call.
    pub(crate) fn upsert<R>(
        &self,
        key: &str,
        create: impl FnOnce() -> (TokenBucket, R),
        update: impl FnOnce(&mut TokenBucket) -> R,
    ) -> R {
        let mut shard = self.shard(key).lock();
        if let Some(bucket) = shard.get_mut(key) {
            return update(bucket);
        }
        let (bucket, result) = create();
        shard.insert(key.to_owned(), bucket);
        result
    }

    /// Read the bucket for `key` without modifying it
    pub(crate) fn peek<R>(&self, key: &str, read: impl FnOnce(&TokenBucket) -> R) -> Option<R> {
        self.shard(key).lock().get(key).map(read)
    }

    /// Insert or replace the bucket for `key`
    #[cfg(test)]
    pub(crate) fn insert(&self, key: &str, bucket: TokenBucket) {
        self.shard(key).lock().insert(key.to_owned(), bucket);
    }

    /// Delete the bucket for `key`, returning whether one existed
    pub fn remove(&self, key: &str) -> bool {
        self.shard(key).lock().remove(key).is_some()
    }

    /// Evict buckets idle for strictly longer than `idle_timeout`
    ///
    /// Locks one shard at a time, so requests for keys on other shards are
    /// not held up. Returns the number of evicted buckets.
    pub(crate) fn sweep(&self, now: Instant, idle_timeout: Duration) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                let mut data = shard.lock();
                let before = data.len();
                data.retain(|_, bucket| {
                    now.saturating_duration_since(bucket.last_refill()) <= idle_timeout
                });
                before - data.len()
            })
            .sum()
    }
}

impl Default for BucketStore {
    fn default() -> Self {
        Self::new()
    }
}
