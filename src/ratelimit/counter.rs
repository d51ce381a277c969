//! Bucketed sliding window counter.

use std::collections::HashMap;

use super::quota::RateLimitConfig;
use super::window::WindowState;
use crate::error::Result;

/// Approximate sliding window that batches requests into fixed-width buckets.
///
/// Bucket indices are anchored to absolute epoch slots: the index of time `t`
/// is `floor(t / window) * (window / bucket_count)`. Eviction drops whole
/// buckets whose index is older than the index of `now - window`, so the
/// window actually inspected is wider than `window_secs`. That smear is the
/// price of O(bucket count) memory and eviction; use
/// [`EventLog`](super::EventLog) when exact accounting matters.
///
/// A call is recorded before the decision is taken, so rejected calls still
/// consume capacity until their bucket is evicted.
#[derive(Debug, Clone)]
pub struct BucketedCounter {
    config: RateLimitConfig,
    /// Request counts keyed by bucket index
    buckets: HashMap<u64, u64>,
    /// Sum of all bucket counts, maintained incrementally
    running_total: u64,
}

impl BucketedCounter {
    /// Create an empty counter, validating bucket alignment.
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            buckets: HashMap::new(),
            running_total: 0,
        })
    }

    /// Bucket index for a timestamp.
    pub fn bucket_index(&self, timestamp: u64) -> u64 {
        (timestamp / self.config.window_secs) * self.config.bucket_width()
    }

    /// Remove every bucket older than the oldest index still valid at `now`.
    pub fn evict(&mut self, now: u64) {
        let oldest_valid = self.bucket_index(now.saturating_sub(self.config.window_secs));
        let total = &mut self.running_total;
        self.buckets.retain(|&index, count| {
            if index < oldest_valid {
                *total -= *count;
                false
            } else {
                true
            }
        });
    }

    /// Count one request in the bucket for `now`.
    pub fn record(&mut self, now: u64) {
        let index = self.bucket_index(now);
        *self.buckets.entry(index).or_insert(0) += 1;
        self.running_total += 1;
    }

    /// Whether the running total is under the limit.
    pub fn is_allowed(&self) -> bool {
        self.running_total < self.config.request_limit
    }

    /// Requests counted across all live buckets.
    pub fn running_total(&self) -> u64 {
        self.running_total
    }

    /// Number of live buckets.
    pub fn bucket_len(&self) -> usize {
        self.buckets.len()
    }
}

impl WindowState for BucketedCounter {
    const ALGORITHM: &'static str = "sliding_window_counter";

    fn from_config(config: &RateLimitConfig) -> Result<Self> {
        Self::new(*config)
    }

    fn evict_and_decide(&mut self, now: u64) -> bool {
        self.evict(now);
        self.record(now);
        self.is_allowed()
    }

    fn usage(&self) -> u64 {
        self.running_total
    }

    fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuotaError;

    fn counter(limit: u64, window: u64, buckets: u64) -> BucketedCounter {
        BucketedCounter::new(RateLimitConfig::new(limit, window).with_bucket_count(buckets)).unwrap()
    }

    #[test]
    fn test_bucket_index_is_epoch_anchored() {
        let counter = counter(100, 60, 10);

        // Every second of the same window slot shares one index.
        assert_eq!(counter.bucket_index(0), 0);
        assert_eq!(counter.bucket_index(59), 0);
        assert_eq!(counter.bucket_index(60), 6);
        assert_eq!(counter.bucket_index(125), 12);
    }

    #[test]
    fn test_record_before_decide() {
        let mut counter = counter(3, 10, 10);

        assert!(counter.evict_and_decide(0));
        assert!(counter.evict_and_decide(0));
        // The third call brings the total to the limit and is rejected.
        assert!(!counter.evict_and_decide(0));
        assert_eq!(counter.running_total(), 3);
    }

    #[test]
    fn test_rejected_calls_still_count() {
        let mut counter = counter(2, 10, 10);

        for _ in 0..5 {
            counter.evict_and_decide(3);
        }

        assert_eq!(counter.running_total(), 5);
        assert!(!counter.is_allowed());
    }

    #[test]
    fn test_is_allowed_does_not_mutate() {
        let mut counter = counter(5, 10, 10);
        counter.record(0);

        assert!(counter.is_allowed());
        assert!(counter.is_allowed());
        assert_eq!(counter.running_total(), 1);
    }

    #[test]
    fn test_previous_slot_survives_one_window() {
        let mut counter = counter(3, 10, 10);
        counter.record(0);
        counter.record(0);
        counter.record(0);

        // Index of (11 - 10) is still slot 0, so nothing is evicted yet.
        counter.evict(11);
        assert_eq!(counter.running_total(), 3);
        assert_eq!(counter.bucket_len(), 1);

        // At t=20 the oldest valid slot moves past slot 0.
        counter.evict(20);
        assert_eq!(counter.running_total(), 0);
        assert_eq!(counter.bucket_len(), 0);
    }

    #[test]
    fn test_eviction_keeps_running_total_consistent() {
        let mut counter = counter(100, 10, 5);
        for t in [0, 1, 9, 10, 15, 19, 20, 25] {
            counter.record(t);
        }
        assert_eq!(counter.running_total(), 8);
        assert_eq!(counter.bucket_len(), 3);

        // Oldest valid index at t=25 is bucket_index(15) = 2, dropping slot 0.
        counter.evict(25);
        assert_eq!(counter.running_total(), 5);
        assert_eq!(counter.bucket_len(), 2);

        let sum: u64 = counter.buckets.values().sum();
        assert_eq!(sum, counter.running_total());
    }

    #[test]
    fn test_recovers_after_full_expiry() {
        let mut counter = counter(2, 10, 10);
        for _ in 0..4 {
            counter.evict_and_decide(5);
        }
        assert!(!counter.evict_and_decide(5));

        assert!(counter.evict_and_decide(20));
        assert_eq!(counter.running_total(), 1);
    }

    #[test]
    fn test_misaligned_buckets_rejected() {
        let result = BucketedCounter::new(RateLimitConfig::new(10, 60).with_bucket_count(7));
        assert!(matches!(result, Err(QuotaError::InvalidConfig(_))));
    }
}
