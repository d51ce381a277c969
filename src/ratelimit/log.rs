//! Sliding window log.

use std::collections::VecDeque;

use super::quota::RateLimitConfig;
use super::window::WindowState;
use crate::error::Result;

/// Exact sliding window that keeps one timestamp per admitted request.
///
/// Memory and eviction cost grow with the number of requests admitted inside
/// the window. Only admitted calls are recorded.
#[derive(Debug, Clone)]
pub struct EventLog {
    config: RateLimitConfig,
    /// Admitted request times, oldest first
    timestamps: VecDeque<u64>,
}

impl EventLog {
    /// Create an empty log. `bucket_count` is not used.
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        config.validate_window()?;
        Ok(Self {
            config,
            timestamps: VecDeque::new(),
        })
    }

    /// Pop entries strictly older than the window.
    ///
    /// An entry exactly `window_secs` old is still inside the window.
    pub fn evict(&mut self, now: u64) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_sub(oldest) > self.config.window_secs {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Append a request time.
    pub fn record(&mut self, timestamp: u64) {
        debug_assert!(
            self.timestamps.back().map_or(true, |&last| last <= timestamp),
            "timestamps must be recorded in order"
        );
        self.timestamps.push_back(timestamp);
    }

    /// Evict, then check whether another request fits.
    pub fn is_allowed(&mut self, now: u64) -> bool {
        self.evict(now);
        (self.timestamps.len() as u64) < self.config.request_limit
    }

    /// Number of timestamps currently held.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the log holds no timestamps.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

impl WindowState for EventLog {
    const ALGORITHM: &'static str = "sliding_window_log";

    fn from_config(config: &RateLimitConfig) -> Result<Self> {
        Self::new(*config)
    }

    fn evict_and_decide(&mut self, now: u64) -> bool {
        if !self.is_allowed(now) {
            return false;
        }
        self.record(now);
        true
    }

    fn usage(&self) -> u64 {
        self.timestamps.len() as u64
    }

    fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(limit: u64, window: u64) -> EventLog {
        EventLog::new(RateLimitConfig::new(limit, window)).unwrap()
    }

    #[test]
    fn test_admits_exactly_limit() {
        let mut log = log(3, 10);

        assert!(log.evict_and_decide(0));
        assert!(log.evict_and_decide(0));
        assert!(log.evict_and_decide(0));
        assert!(!log.evict_and_decide(0));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_rejected_calls_are_not_recorded() {
        let mut log = log(1, 10);

        assert!(log.evict_and_decide(0));
        for _ in 0..10 {
            assert!(!log.evict_and_decide(1));
        }
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_entry_exactly_window_old_is_kept() {
        let mut log = log(1, 10);
        log.record(0);

        log.evict(10);
        assert_eq!(log.len(), 1);

        log.evict(11);
        assert!(log.is_empty());
    }

    #[test]
    fn test_window_expiry_example() {
        let mut log = log(3, 10);
        for _ in 0..3 {
            assert!(log.evict_and_decide(0));
        }
        assert!(!log.evict_and_decide(0));
        assert!(!log.evict_and_decide(10));
        assert!(log.evict_and_decide(11));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_eviction_is_incremental() {
        let mut log = log(3, 10);
        assert!(log.evict_and_decide(0));
        assert!(log.evict_and_decide(5));
        assert!(log.evict_and_decide(8));
        assert!(!log.evict_and_decide(9));

        // Only the t=0 entry has aged out.
        assert!(log.evict_and_decide(11));
        assert!(!log.evict_and_decide(11));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_bucket_count_is_ignored() {
        let config = RateLimitConfig::new(2, 5).with_bucket_count(7);
        assert!(EventLog::new(config).is_ok());
    }
}
