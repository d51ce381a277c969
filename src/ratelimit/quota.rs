//! Per-user quota parameters.

use serde::{Deserialize, Serialize};

use crate::error::{QuotaError, Result};

/// Default number of requests allowed per window.
pub const DEFAULT_REQUEST_LIMIT: u64 = 100;
/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 60;
/// Default number of buckets a bucketed window is split into.
pub const DEFAULT_BUCKET_COUNT: u64 = 10;

/// Immutable quota for a single user.
///
/// `bucket_count` only affects the bucketed counter; the event log keeps raw
/// timestamps and ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    #[serde(default = "default_request_limit")]
    pub request_limit: u64,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Number of buckets the window is split into
    #[serde(default = "default_bucket_count")]
    pub bucket_count: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            request_limit: default_request_limit(),
            window_secs: default_window_secs(),
            bucket_count: default_bucket_count(),
        }
    }
}

fn default_request_limit() -> u64 {
    DEFAULT_REQUEST_LIMIT
}

fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

fn default_bucket_count() -> u64 {
    DEFAULT_BUCKET_COUNT
}

impl RateLimitConfig {
    /// Create a quota with the default bucket count.
    pub fn new(request_limit: u64, window_secs: u64) -> Self {
        Self {
            request_limit,
            window_secs,
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }

    /// Override the bucket count.
    pub fn with_bucket_count(mut self, bucket_count: u64) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Width of one bucket in seconds.
    pub fn bucket_width(&self) -> u64 {
        self.window_secs / self.bucket_count.max(1)
    }

    /// Check the limit and window length.
    pub fn validate_window(&self) -> Result<()> {
        if self.request_limit == 0 {
            return Err(QuotaError::InvalidConfig(
                "request_limit must be positive".to_string(),
            ));
        }
        if self.window_secs == 0 {
            return Err(QuotaError::InvalidConfig(
                "window_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Check every parameter, including bucket alignment.
    ///
    /// `bucket_count` must divide `window_secs` exactly so each bucket spans a
    /// whole number of seconds.
    pub fn validate(&self) -> Result<()> {
        self.validate_window()?;

        if self.bucket_count == 0 {
            return Err(QuotaError::InvalidConfig(
                "bucket_count must be positive".to_string(),
            ));
        }
        if self.window_secs % self.bucket_count != 0 {
            return Err(QuotaError::InvalidConfig(format!(
                "bucket_count {} does not evenly divide window_secs {}",
                self.bucket_count, self.window_secs
            )));
        }
        Ok(())
    }
}
